//! Two-phase bulk load for the Ripple graph store.
//!
//! Phase 1 loads every node table in `NodeKind::LOAD_ORDER`, phase 2 every
//! edge table in `EdgeKind::LOAD_ORDER`, all inside one transaction. Each
//! table loads under its own savepoint: a table that fails is rolled back,
//! recorded in `LoadStats::table_errors`, and the load moves on.

use rusqlite::{Connection, params};
use tracing::{debug, info, warn};

use super::SqliteStore;
use super::edges::{insert_edge, key_exists};
use crate::builder::BulkTables;
use crate::error::Result;
use crate::graph::LoadStats;
use crate::types::{Edge, EdgeKind, Node, NodeKind};

fn load_nodes(conn: &Connection, rows: &[Node]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO nodes (kind, key, file, name, line, props)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for node in rows {
        stmt.execute(params![
            node.kind().as_str(),
            node.key(),
            node.file(),
            node.name(),
            node.line(),
            node.to_row()?
        ])?;
    }
    Ok(rows.len())
}

/// Returns (written, skipped for a missing endpoint).
fn load_edges(conn: &Connection, rows: &[Edge]) -> Result<(usize, usize)> {
    let mut written = 0;
    let mut skipped = 0;
    for edge in rows {
        if !key_exists(conn, &edge.from)? || !key_exists(conn, &edge.to)? {
            skipped += 1;
            continue;
        }
        if insert_edge(conn, edge)? {
            written += 1;
        }
    }
    Ok((written, skipped))
}

impl SqliteStore {
    pub(crate) fn bulk_load_impl(&self, tables: &BulkTables) -> Result<LoadStats> {
        self.ensure_writable("bulk load")?;
        let mut conn = self.connection()?;
        let mut tx = conn.transaction()?;
        let mut stats = LoadStats::default();

        for kind in NodeKind::LOAD_ORDER {
            let Some(rows) = tables.nodes.get(&kind) else {
                continue;
            };
            let sp = tx.savepoint()?;
            match load_nodes(&sp, rows) {
                Ok(n) => {
                    sp.commit()?;
                    stats.nodes_loaded.insert(kind, n);
                }
                Err(e) => {
                    warn!(table = kind.table_name(), error = %e, "Node table failed to load");
                    drop(sp);
                    stats
                        .table_errors
                        .push((kind.table_name().to_string(), e.to_string()));
                }
            }
        }

        for kind in EdgeKind::LOAD_ORDER {
            let Some(rows) = tables.edges.get(&kind) else {
                continue;
            };
            let sp = tx.savepoint()?;
            match load_edges(&sp, rows) {
                Ok((written, skipped)) => {
                    sp.commit()?;
                    stats.edges_loaded.insert(kind, written);
                    if skipped > 0 {
                        debug!(table = kind.table_name(), skipped, "Edges skipped for missing endpoints");
                        stats.edges_skipped.insert(kind, skipped);
                    }
                }
                Err(e) => {
                    warn!(table = kind.table_name(), error = %e, "Edge table failed to load");
                    drop(sp);
                    stats
                        .table_errors
                        .push((kind.table_name().to_string(), e.to_string()));
                }
            }
        }

        tx.commit()?;
        info!(
            nodes = stats.node_count(),
            edges = stats.edge_count(),
            skipped = stats.skipped_count(),
            failed_tables = stats.table_errors.len(),
            "Bulk load complete"
        );
        Ok(stats)
    }

    pub(crate) fn clear_impl(&self) -> Result<()> {
        self.ensure_writable("clear")?;
        let conn = self.connection()?;
        conn.execute_batch("DELETE FROM edges; DELETE FROM nodes;")?;
        debug!(path = %self.path().display(), "Cleared graph");
        Ok(())
    }
}
