//! Edge operations for the Ripple graph store.
//!
//! An edge is only stored when both endpoint keys exist. Identity is
//! (kind, from, to, line, context), so re-inserting an identical edge is a
//! no-op that reports `EdgeOutcome::Exists`.

use rusqlite::{Connection, params};

use super::{EDGE_COLUMNS, SqliteStore, row_to_edge};
use crate::error::Result;
use crate::graph::{EdgeDirection, EdgeOutcome};
use crate::types::{Edge, EdgeKind};

/// Whether a node with this key exists, of any kind.
pub(crate) fn key_exists(conn: &Connection, key: &str) -> rusqlite::Result<bool> {
    conn.prepare_cached("SELECT EXISTS(SELECT 1 FROM nodes WHERE key = ?1)")?
        .query_row([key], |row| row.get(0))
}

/// Insert an edge, assuming both endpoints exist. Returns whether a row was
/// written.
pub(crate) fn insert_edge(conn: &Connection, edge: &Edge) -> rusqlite::Result<bool> {
    let written = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO edges (kind, from_key, to_key, line, context, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?
        .execute(params![
            edge.kind.as_str(),
            edge.from,
            edge.to,
            edge.line.unwrap_or(0),
            edge.context.as_deref().unwrap_or(""),
            edge.position
        ])?;
    Ok(written > 0)
}

impl SqliteStore {
    pub(crate) fn create_edge_impl(&self, edge: &Edge) -> Result<EdgeOutcome> {
        self.ensure_writable("create edge")?;
        let conn = self.connection()?;

        if !key_exists(&conn, &edge.from)? || !key_exists(&conn, &edge.to)? {
            return Ok(EdgeOutcome::MissingEndpoint);
        }
        if insert_edge(&conn, edge)? {
            Ok(EdgeOutcome::Created)
        } else {
            Ok(EdgeOutcome::Exists)
        }
    }

    pub(crate) fn delete_edges_impl(&self, edges: &[Edge]) -> Result<usize> {
        self.ensure_writable("delete edges")?;
        if edges.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "DELETE FROM edges
                 WHERE kind = ?1 AND from_key = ?2 AND to_key = ?3 AND line = ?4 AND context = ?5",
            )?;
            for edge in edges {
                deleted += stmt.execute(params![
                    edge.kind.as_str(),
                    edge.from,
                    edge.to,
                    edge.line.unwrap_or(0),
                    edge.context.as_deref().unwrap_or("")
                ])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    pub(crate) fn neighbors_impl(
        &self,
        kind: EdgeKind,
        key: &str,
        direction: EdgeDirection,
    ) -> Result<Vec<Edge>> {
        let column = match direction {
            EdgeDirection::Outgoing => "from_key",
            EdgeDirection::Incoming => "to_key",
        };
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM edges WHERE kind = ?1 AND {column} = ?2
             ORDER BY from_key, to_key, line, context"
        ))?;
        let edges = stmt
            .query_map(params![kind.as_str(), key], row_to_edge)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphStore;
    use crate::types::{FunctionNode, Node};
    use tempfile::TempDir;

    fn function(id: &str, name: &str) -> Node {
        Node::Function(FunctionNode {
            id: id.to_string(),
            name: name.to_string(),
            file: "app.py".to_string(),
            start_line: 1,
            end_line: 2,
            is_public: true,
            source_excerpt: None,
        })
    }

    fn store_with_functions() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("graph.db")).unwrap();
        store.upsert_node(&function("fn_a", "a")).unwrap();
        store.upsert_node(&function("fn_b", "b")).unwrap();
        (dir, store)
    }

    #[test]
    fn create_edge_is_idempotent() {
        let (_dir, store) = store_with_functions();
        let edge = Edge::new(EdgeKind::Calls, "fn_a", "fn_b").with_line(4);

        assert_eq!(store.create_edge(&edge).unwrap(), EdgeOutcome::Created);
        assert_eq!(store.create_edge(&edge).unwrap(), EdgeOutcome::Exists);
        assert_eq!(store.edge_set().unwrap().len(), 1);
    }

    #[test]
    fn distinct_call_lines_are_distinct_edges() {
        let (_dir, store) = store_with_functions();
        store
            .create_edge(&Edge::new(EdgeKind::Calls, "fn_a", "fn_b").with_line(4))
            .unwrap();
        store
            .create_edge(&Edge::new(EdgeKind::Calls, "fn_a", "fn_b").with_line(9))
            .unwrap();

        let out = store
            .neighbors(EdgeKind::Calls, "fn_a", EdgeDirection::Outgoing)
            .unwrap();
        let lines: Vec<Option<u32>> = out.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![Some(4), Some(9)]);
    }

    #[test]
    fn missing_endpoint_is_a_no_op() {
        let (_dir, store) = store_with_functions();

        let outcome = store
            .create_edge(&Edge::new(EdgeKind::Calls, "fn_a", "fn_missing").with_line(1))
            .unwrap();

        assert_eq!(outcome, EdgeOutcome::MissingEndpoint);
        assert!(store.edge_set().unwrap().is_empty());
    }

    #[test]
    fn delete_edges_removes_exact_matches_only() {
        let (_dir, store) = store_with_functions();
        let kept = Edge::new(EdgeKind::Calls, "fn_a", "fn_b").with_line(4);
        let dropped = Edge::new(EdgeKind::Calls, "fn_a", "fn_b").with_line(9);
        store.create_edge(&kept).unwrap();
        store.create_edge(&dropped).unwrap();

        let deleted = store
            .delete_edges(&[dropped, Edge::new(EdgeKind::Inherits, "fn_a", "fn_b")])
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.edge_set().unwrap().into_iter().collect::<Vec<_>>(), vec![kept]);
    }

    #[test]
    fn stored_edges_round_trip_properties() {
        let (_dir, store) = store_with_functions();
        let edge = Edge::new(EdgeKind::Calls, "fn_a", "fn_b").with_line(7);
        store.create_edge(&edge).unwrap();

        let incoming = store
            .neighbors(EdgeKind::Calls, "fn_b", EdgeDirection::Incoming)
            .unwrap();
        assert_eq!(incoming, vec![edge]);
    }
}
