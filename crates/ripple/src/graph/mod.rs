//! Graph store seam and the analyses built on it.
//!
//! This module provides:
//! - `GraphStore`: keyed upserts, pattern matches, edge creation, bulk load
//! - `CallGraphOps`: the call-graph reads impact analysis needs
//! - `ImpactAnalyzer`: depth-bounded BFS over CALLS
//! - `find_call_cycles`: strongly connected components over CALLS
//!
//! ## Design
//!
//! - Traits define the operations; `db::SqliteStore` implements both
//! - The analyzer only needs `CallGraphOps`, so tests drive it with fakes
//! - Edges reference nodes by natural key (ID, or path for files)

mod cycles;
mod impact;
mod types;

pub use cycles::find_call_cycles;
pub use impact::ImpactAnalyzer;
pub use types::{
    CallNeighbor, EdgeDirection, EdgeOutcome, FunctionRef, LoadStats, NodeProperty,
    UpsertOutcome,
};

use crate::builder::BulkTables;
use crate::error::Result;
use crate::types::{Edge, EdgeKind, GraphStats, Node, NodeKind, VariableUse};

/// A property-graph store.
///
/// Every mutation on a store opened read-only fails with `Error::ReadOnly`.
pub trait GraphStore: Send + Sync {
    /// Whether mutations are rejected.
    fn is_read_only(&self) -> bool;

    /// Insert a node, or update it in place if its key exists.
    fn upsert_node(&self, node: &Node) -> Result<UpsertOutcome>;

    /// Whether a node with this key exists.
    fn node_exists(&self, kind: NodeKind, key: &str) -> Result<bool>;

    /// Fetch a node by key.
    fn get_node(&self, kind: NodeKind, key: &str) -> Result<Option<Node>>;

    /// All nodes of a kind whose property equals `value`.
    fn find_nodes(&self, kind: NodeKind, property: NodeProperty, value: &str)
        -> Result<Vec<Node>>;

    /// Store an edge if both endpoints exist.
    fn create_edge(&self, edge: &Edge) -> Result<EdgeOutcome>;

    /// Edges of a kind touching `key` on the given side.
    fn neighbors(&self, kind: EdgeKind, key: &str, direction: EdgeDirection)
        -> Result<Vec<Edge>>;

    /// Delete these exact edges. Returns the number removed.
    fn delete_edges(&self, edges: &[Edge]) -> Result<usize>;

    /// Delete every node scoped to a file, the edges touching them, and the
    /// file node itself. Returns the number of nodes removed.
    fn delete_file_data(&self, path: &str) -> Result<usize>;

    /// Whether the stored file node carries this content hash.
    fn file_unchanged(&self, path: &str, content_hash: &str) -> Result<bool>;

    /// Load node tables, then edge tables, in load order.
    fn bulk_load(&self, tables: &BulkTables) -> Result<LoadStats>;

    /// Remove every node and edge.
    fn clear(&self) -> Result<()>;

    /// Counts per kind and the most-called functions.
    fn stats(&self) -> Result<GraphStats>;
}

/// Call-graph reads used by impact analysis.
pub trait CallGraphOps: Send + Sync {
    /// Functions that call `function` in `file`, one entry per call line.
    fn callers_of(&self, file: &str, function: &str) -> Result<Vec<CallNeighbor>>;

    /// Functions called by `function` in `file`, one entry per call line.
    fn callees_of(&self, file: &str, function: &str) -> Result<Vec<CallNeighbor>>;

    /// Functions that read the variable defined at `(file, name, line)`.
    fn variable_uses(&self, file: &str, name: &str, line: u32) -> Result<Vec<VariableUse>>;

    /// Every CALLS edge as (caller, callee) pairs.
    fn call_pairs(&self) -> Result<Vec<(FunctionRef, FunctionRef)>>;
}
