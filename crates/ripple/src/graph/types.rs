//! Types exchanged with the graph store.

use std::collections::BTreeMap;

use crate::types::{EdgeKind, NodeKind};

/// Result of a keyed node upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No node with this key existed
    Inserted,
    /// An existing node was updated in place
    Updated,
}

/// Result of an edge insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The edge was stored
    Created,
    /// An identical edge was already stored
    Exists,
    /// An endpoint is not (yet) in the store; nothing was written
    MissingEndpoint,
}

/// Node property usable in pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeProperty {
    /// The node's display name
    Name,
    /// The project-relative file the node belongs to
    File,
}

/// Which side of an edge a neighbor query starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// Edges whose `from` is the given key
    Outgoing,
    /// Edges whose `to` is the given key
    Incoming,
}

/// A function one CALLS hop away from a query function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallNeighbor {
    /// Neighbor function
    pub function_name: String,
    /// File of the neighbor
    pub file: String,
    /// Line of the call expression
    pub call_line: u32,
}

/// A function identified by its file and name.
pub type FunctionRef = (String, String);

/// Counts from a bulk load.
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    /// Nodes written, per kind
    pub nodes_loaded: BTreeMap<NodeKind, usize>,
    /// Edges written, per kind
    pub edges_loaded: BTreeMap<EdgeKind, usize>,
    /// Edges skipped because an endpoint was missing, per kind
    pub edges_skipped: BTreeMap<EdgeKind, usize>,
    /// Tables that failed to load: (table name, error)
    pub table_errors: Vec<(String, String)>,
}

impl LoadStats {
    /// Total nodes written.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes_loaded.values().sum()
    }

    /// Total edges written.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges_loaded.values().sum()
    }

    /// Total edges skipped.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.edges_skipped.values().sum()
    }
}
