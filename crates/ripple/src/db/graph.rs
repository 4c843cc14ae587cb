//! `GraphStore` and `CallGraphOps` for the `SQLite` store.
//!
//! Call-graph reads join CALLS edges back to their function nodes, so callers
//! and callees are reported by (file, name) together with the call line.

// SQLite stores integers as i64. Line numbers and counts fit in u32/usize.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use rusqlite::params;
use tracing::warn;

use super::SqliteStore;
use super::helpers::{parse_edge_kind, parse_node_kind};
use crate::builder::BulkTables;
use crate::error::Result;
use crate::graph::{
    CallGraphOps, CallNeighbor, EdgeDirection, EdgeOutcome, FunctionRef, GraphStore, LoadStats,
    NodeProperty, UpsertOutcome,
};
use crate::types::{CalledFunction, Edge, EdgeKind, GraphStats, Node, NodeKind, VariableUse};

/// Number of functions listed in `GraphStats::most_called`.
pub const MOST_CALLED_LIMIT: usize = 20;

impl GraphStore for SqliteStore {
    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn upsert_node(&self, node: &Node) -> Result<UpsertOutcome> {
        self.upsert_node_impl(node)
    }

    fn node_exists(&self, kind: NodeKind, key: &str) -> Result<bool> {
        self.node_exists_impl(kind, key)
    }

    fn get_node(&self, kind: NodeKind, key: &str) -> Result<Option<Node>> {
        self.get_node_impl(kind, key)
    }

    fn find_nodes(
        &self,
        kind: NodeKind,
        property: NodeProperty,
        value: &str,
    ) -> Result<Vec<Node>> {
        self.find_nodes_impl(kind, property, value)
    }

    fn create_edge(&self, edge: &Edge) -> Result<EdgeOutcome> {
        self.create_edge_impl(edge)
    }

    fn neighbors(&self, kind: EdgeKind, key: &str, direction: EdgeDirection) -> Result<Vec<Edge>> {
        self.neighbors_impl(kind, key, direction)
    }

    fn delete_edges(&self, edges: &[Edge]) -> Result<usize> {
        self.delete_edges_impl(edges)
    }

    fn delete_file_data(&self, path: &str) -> Result<usize> {
        self.delete_file_data_impl(path)
    }

    fn file_unchanged(&self, path: &str, content_hash: &str) -> Result<bool> {
        self.file_unchanged_impl(path, content_hash)
    }

    fn bulk_load(&self, tables: &BulkTables) -> Result<LoadStats> {
        self.bulk_load_impl(tables)
    }

    fn clear(&self) -> Result<()> {
        self.clear_impl()
    }

    fn stats(&self) -> Result<GraphStats> {
        let conn = self.connection()?;
        let mut stats = GraphStats::default();

        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM nodes GROUP BY kind")?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(0)?;
            let count: usize = row.get(1)?;
            Ok((kind, count))
        })?;
        for row in rows {
            let (kind, count) = row?;
            match parse_node_kind(&kind) {
                Ok(kind) => {
                    stats.nodes_by_kind.insert(kind, count);
                }
                Err(_) => warn!(kind = %kind, count, "Unknown node kind in database, skipping from stats"),
            }
        }

        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM edges GROUP BY kind")?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(0)?;
            let count: usize = row.get(1)?;
            Ok((kind, count))
        })?;
        for row in rows {
            let (kind, count) = row?;
            match parse_edge_kind(&kind) {
                Ok(kind) => {
                    stats.edges_by_kind.insert(kind, count);
                }
                Err(_) => warn!(kind = %kind, count, "Unknown edge kind in database, skipping from stats"),
            }
        }

        let mut stmt = conn.prepare(
            "SELECT f.file, f.name, COUNT(*) AS calls
             FROM edges e JOIN nodes f ON f.kind = 'function' AND f.key = e.to_key
             WHERE e.kind = 'CALLS'
             GROUP BY e.to_key, f.file, f.name
             ORDER BY calls DESC, f.file, f.name
             LIMIT ?1",
        )?;
        stats.most_called = stmt
            .query_map([MOST_CALLED_LIMIT as i64], |row| {
                Ok(CalledFunction {
                    file: row.get(0)?,
                    name: row.get(1)?,
                    call_count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(stats)
    }
}

impl SqliteStore {
    /// One CALLS hop from the functions named `function` in `file`.
    ///
    /// `upstream` follows edges backwards (callers).
    fn call_neighbors(&self, file: &str, function: &str, upstream: bool) -> Result<Vec<CallNeighbor>> {
        let (origin, other) = if upstream {
            ("e.to_key", "e.from_key")
        } else {
            ("e.from_key", "e.to_key")
        };
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT n.file, n.name, e.line
             FROM edges e
             JOIN nodes q ON q.kind = 'function' AND q.key = {origin}
             JOIN nodes n ON n.kind = 'function' AND n.key = {other}
             WHERE e.kind = 'CALLS' AND q.file = ?1 AND q.name = ?2
             ORDER BY n.file, n.name, e.line"
        ))?;
        let neighbors = stmt
            .query_map(params![file, function], |row| {
                let line: i64 = row.get(2)?;
                Ok(CallNeighbor {
                    file: row.get(0)?,
                    function_name: row.get(1)?,
                    call_line: line as u32,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(neighbors)
    }
}

impl CallGraphOps for SqliteStore {
    fn callers_of(&self, file: &str, function: &str) -> Result<Vec<CallNeighbor>> {
        self.call_neighbors(file, function, true)
    }

    fn callees_of(&self, file: &str, function: &str) -> Result<Vec<CallNeighbor>> {
        self.call_neighbors(file, function, false)
    }

    fn variable_uses(&self, file: &str, name: &str, line: u32) -> Result<Vec<VariableUse>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(
            "SELECT f.file, f.name, e.line
             FROM edges e
             JOIN nodes v ON v.kind = 'variable' AND v.key = e.to_key
             JOIN nodes f ON f.kind = 'function' AND f.key = e.from_key
             WHERE e.kind = 'REFERENCES' AND e.context = 'use'
               AND v.file = ?1 AND v.name = ?2 AND v.line = ?3
             ORDER BY f.file, f.name, e.line",
        )?;
        let uses = stmt
            .query_map(params![file, name, line], |row| {
                let line: i64 = row.get(2)?;
                Ok(VariableUse {
                    file: row.get(0)?,
                    function: row.get(1)?,
                    line: line as u32,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(uses)
    }

    fn call_pairs(&self) -> Result<Vec<(FunctionRef, FunctionRef)>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT a.file, a.name, b.file, b.name
             FROM edges e
             JOIN nodes a ON a.kind = 'function' AND a.key = e.from_key
             JOIN nodes b ON b.kind = 'function' AND b.key = e.to_key
             WHERE e.kind = 'CALLS'
             ORDER BY a.file, a.name, b.file, b.name",
        )?;
        let pairs = stmt
            .query_map([], |row| {
                Ok(((row.get(0)?, row.get(1)?), (row.get(2)?, row.get(3)?)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pairs)
    }
}
