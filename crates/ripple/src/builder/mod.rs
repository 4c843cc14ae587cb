//! Graph construction from normalized entities.
//!
//! Two paths deliver the same graph to a store:
//!
//! - **Incremental**: [`GraphBuilder`] writes one file at a time through
//!   keyed upserts and guarded edge creation. Edges whose endpoint is not in
//!   the store yet are skipped and counted.
//! - **Bulk**: [`build_tables`] materializes every node and edge in memory as
//!   [`BulkTables`], which a store loads in one shot.
//!
//! Both call [`derive_file`] per file, resolve INHERITS through
//! [`canonical_class`], and take CALLS from the call resolver, so for the same
//! input they agree on node IDs and edges.

mod derive;
mod tables;

pub use derive::{
    ClassCandidate, DeriveCounts, DerivedFile, canonical_class, class_index, derive_file,
};
pub use tables::{BulkTables, LoadWarning, TABLES_FORMAT, TABLES_VERSION, edge_from_row, edge_to_row};

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::graph::{
    EdgeDirection, EdgeOutcome, GraphStore, LoadStats, NodeProperty, UpsertOutcome,
};
use crate::identity::IdScheme;
use crate::normalize::NormalizedFile;
use crate::resolver::{ResolutionStats, resolve_calls};
use crate::types::{Edge, EdgeKind, Node, NodeKind};

/// Counts collected while building the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Files written
    pub files: usize,
    /// Nodes inserted for the first time
    pub nodes_inserted: usize,
    /// Nodes updated in place
    pub nodes_updated: usize,
    /// Node writes that failed and were skipped
    pub nodes_failed: usize,
    /// Edges stored
    pub edges_created: usize,
    /// Edges that were already present
    pub edges_existing: usize,
    /// Edge writes that failed and were skipped
    pub edges_failed: usize,
    /// Stored INHERITS edges dropped because relinking chose another target
    pub edges_removed: usize,
    /// Edges the store refused because an endpoint was missing, per kind
    pub edges_skipped: BTreeMap<EdgeKind, usize>,
    /// Links dropped at derivation because no candidate matched, per kind
    pub unresolved: BTreeMap<EdgeKind, usize>,
    /// Lookups with more than one candidate, per kind
    pub ambiguous: BTreeMap<EdgeKind, usize>,
    /// Bulk tables that failed to load, with the cause
    pub table_errors: Vec<(String, String)>,
}

impl BuildStats {
    /// Fold derivation counts into these stats.
    pub fn record_derivation(&mut self, counts: &DeriveCounts) {
        for (kind, n) in &counts.unresolved {
            *self.unresolved.entry(*kind).or_default() += n;
        }
        for (kind, n) in &counts.ambiguous {
            *self.ambiguous.entry(*kind).or_default() += n;
        }
    }

    /// Fold a bulk load summary into these stats.
    pub fn record_load(&mut self, load: &LoadStats) {
        self.nodes_inserted += load.node_count();
        self.edges_created += load.edge_count();
        for (kind, n) in &load.edges_skipped {
            *self.edges_skipped.entry(*kind).or_default() += n;
        }
        self.table_errors.extend(load.table_errors.iter().cloned());
    }

    /// Total edges skipped for a missing endpoint.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.edges_skipped.values().sum()
    }

    /// Total links dropped at derivation.
    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        self.unresolved.values().sum()
    }

    /// Total ambiguous lookups.
    #[must_use]
    pub fn ambiguous_count(&self) -> usize {
        self.ambiguous.values().sum()
    }
}

/// Incremental writer of derived nodes and edges.
///
/// Write failures are logged and counted; only contract violations such as a
/// read-only store are returned as errors.
pub struct GraphBuilder<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    stats: BuildStats,
}

impl<'a, S: GraphStore + ?Sized> GraphBuilder<'a, S> {
    /// Create a builder writing to `store`.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            stats: BuildStats::default(),
        }
    }

    /// Create a builder that keeps counting from earlier stats.
    pub fn with_stats(store: &'a S, stats: BuildStats) -> Self {
        Self { store, stats }
    }

    /// Counts so far.
    #[must_use]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Consume the builder, returning its counts.
    #[must_use]
    pub fn into_stats(self) -> BuildStats {
        self.stats
    }

    /// Write one file's nodes, then its same-file edges.
    ///
    /// # Errors
    ///
    /// Returns an error only for contract violations.
    pub fn write_file(&mut self, file: &NormalizedFile) -> Result<()> {
        let derived = derive_file(file);
        trace!(
            file = %file.path,
            nodes = derived.nodes.len(),
            edges = derived.edges.len(),
            "Writing file"
        );

        for node in &derived.nodes {
            self.write_node(node)?;
        }
        self.write_edges(&derived.edges)?;
        self.stats.record_derivation(&derived.counts);
        self.stats.files += 1;
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> Result<()> {
        match self.store.upsert_node(node) {
            Ok(UpsertOutcome::Inserted) => self.stats.nodes_inserted += 1,
            Ok(UpsertOutcome::Updated) => self.stats.nodes_updated += 1,
            Err(e) if e.is_contract_violation() => return Err(e),
            Err(e) => {
                warn!(
                    kind = %node.kind(),
                    key = node.key(),
                    error = %e,
                    "Failed to write node"
                );
                self.stats.nodes_failed += 1;
            }
        }
        Ok(())
    }

    /// Create edges whose endpoints exist; skip and count the rest.
    ///
    /// # Errors
    ///
    /// Returns an error only for contract violations.
    pub fn write_edges(&mut self, edges: &[Edge]) -> Result<()> {
        for edge in edges {
            match self.store.create_edge(edge) {
                Ok(EdgeOutcome::Created) => self.stats.edges_created += 1,
                Ok(EdgeOutcome::Exists) => self.stats.edges_existing += 1,
                Ok(EdgeOutcome::MissingEndpoint) => {
                    trace!(kind = %edge.kind, from = %edge.from, to = %edge.to, "Endpoint missing, edge skipped");
                    *self.stats.edges_skipped.entry(edge.kind).or_default() += 1;
                }
                Err(e) if e.is_contract_violation() => return Err(e),
                Err(e) => {
                    warn!(
                        kind = %edge.kind,
                        from = %edge.from,
                        to = %edge.to,
                        error = %e,
                        "Failed to write edge"
                    );
                    self.stats.edges_failed += 1;
                }
            }
        }
        Ok(())
    }

    /// Derive INHERITS edges for every class in `files` against the classes
    /// already in the store.
    ///
    /// Stored INHERITS edges of these classes that are no longer canonical
    /// are deleted first, so a base name that gains a better candidate moves
    /// its edge instead of gaining a second one.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails or on a contract violation.
    pub fn link_inheritance(&mut self, files: &[NormalizedFile]) -> Result<()> {
        let mut edges = Vec::new();
        let mut stale = Vec::new();
        for file in files {
            for class in &file.classes {
                let mut wanted = BTreeSet::new();
                for base in &class.record.bases {
                    let candidates: Vec<ClassCandidate> = self
                        .store
                        .find_nodes(NodeKind::Class, NodeProperty::Name, base)?
                        .into_iter()
                        .map(|node| ClassCandidate {
                            file: node.file().to_string(),
                            start_line: node.line(),
                            id: node.key().to_string(),
                        })
                        .collect();

                    match canonical_class(&candidates, &class.id) {
                        Some((target, ambiguous)) => {
                            if ambiguous {
                                *self.stats.ambiguous.entry(EdgeKind::Inherits).or_default() += 1;
                            }
                            wanted.insert(target.id.clone());
                            edges.push(Edge::new(EdgeKind::Inherits, &class.id, &target.id));
                        }
                        None => {
                            *self.stats.unresolved.entry(EdgeKind::Inherits).or_default() += 1;
                        }
                    }
                }

                stale.extend(
                    self.store
                        .neighbors(EdgeKind::Inherits, &class.id, EdgeDirection::Outgoing)?
                        .into_iter()
                        .filter(|edge| !wanted.contains(&edge.to)),
                );
            }
        }

        if !stale.is_empty() {
            let removed = self.store.delete_edges(&stale)?;
            debug!(removed, "Removed stale INHERITS edges");
            self.stats.edges_removed += removed;
        }
        self.write_edges(&edges)
    }
}

/// Build the whole graph through the incremental path.
///
/// Every file is written first, then INHERITS and CALLS are linked over the
/// complete set.
///
/// # Errors
///
/// Returns an error if a store read fails or on a contract violation.
pub fn build_incremental<S: GraphStore + ?Sized>(
    store: &S,
    files: &[NormalizedFile],
    ids: &IdScheme,
) -> Result<(BuildStats, ResolutionStats)> {
    let mut builder = GraphBuilder::new(store);
    for file in files {
        builder.write_file(file)?;
    }
    builder.link_inheritance(files)?;

    let (calls, resolution) = resolve_calls(files, ids);
    builder.write_edges(&calls)?;

    let stats = builder.into_stats();
    debug!(
        files = stats.files,
        inserted = stats.nodes_inserted,
        updated = stats.nodes_updated,
        edges = stats.edges_created,
        skipped = stats.skipped_count(),
        "Incremental build complete"
    );
    Ok((stats, resolution))
}

/// Tables built in memory by the bulk path, with their counts.
#[derive(Debug, Clone, Default)]
pub struct BulkBuild {
    /// Canonical node and edge tables
    pub tables: BulkTables,
    /// Derivation counts
    pub stats: BuildStats,
    /// Call resolution counts
    pub resolution: ResolutionStats,
}

/// Materialize the complete node and edge tables for a file set.
///
/// Tables are canonicalized: sorted, with duplicate rows removed.
#[must_use]
pub fn build_tables(files: &[NormalizedFile], ids: &IdScheme) -> BulkBuild {
    let mut build = BulkBuild::default();

    for file in files {
        let derived = derive_file(file);
        build.stats.record_derivation(&derived.counts);
        build.stats.files += 1;
        derived
            .nodes
            .into_iter()
            .for_each(|node| build.tables.push_node(node));
        derived
            .edges
            .into_iter()
            .for_each(|edge| build.tables.push_edge(edge));
    }

    let classes = class_index(files);
    for file in files {
        for class in &file.classes {
            for base in &class.record.bases {
                let candidates = classes.get(base.as_str()).map_or(&[][..], Vec::as_slice);
                match canonical_class(candidates, &class.id) {
                    Some((target, ambiguous)) => {
                        if ambiguous {
                            *build.stats.ambiguous.entry(EdgeKind::Inherits).or_default() += 1;
                        }
                        build
                            .tables
                            .push_edge(Edge::new(EdgeKind::Inherits, &class.id, &target.id));
                    }
                    None => {
                        *build.stats.unresolved.entry(EdgeKind::Inherits).or_default() += 1;
                    }
                }
            }
        }
    }

    let (calls, resolution) = resolve_calls(files, ids);
    calls.into_iter().for_each(|edge| build.tables.push_edge(edge));
    build.resolution = resolution;

    build.tables.canonicalize();
    debug!(
        files = build.stats.files,
        nodes = build.tables.node_count(),
        edges = build.tables.edge_count(),
        "Built bulk tables"
    );
    build
}

/// Build the whole graph through the bulk path and load it into `store`.
///
/// # Errors
///
/// Returns an error if the load fails as a whole or on a contract violation.
/// Failures of individual tables are collected in the stats.
pub fn build_bulk<S: GraphStore + ?Sized>(
    store: &S,
    files: &[NormalizedFile],
    ids: &IdScheme,
) -> Result<(BuildStats, ResolutionStats)> {
    let BulkBuild {
        tables,
        mut stats,
        resolution,
    } = build_tables(files, ids);
    let load = store.bulk_load(&tables)?;
    stats.record_load(&load);
    Ok((stats, resolution))
}
