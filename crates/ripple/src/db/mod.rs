//! `SQLite` storage layer for Ripple.
//!
//! This module stores the property graph: one `nodes` table keyed by
//! (kind, natural key) and one `edges` table keyed by
//! (kind, from, to, line, context). `SqliteStore` implements both
//! `GraphStore` and `CallGraphOps`.
//!
//! ## Module Structure
//!
//! - `schema` - Database schema (DDL)
//! - `helpers` - Row conversion and parsing utilities
//! - `nodes` - Node upsert, lookup, and file-scoped deletion
//! - `edges` - Edge creation and neighbor queries
//! - `bulk` - Two-phase bulk load and clearing
//! - `graph` - Trait implementations, call-graph reads, and statistics

mod bulk;
mod edges;
mod graph;
mod helpers;
mod nodes;
mod schema;

pub(crate) use helpers::{EDGE_COLUMNS, NODE_COLUMNS, row_to_edge, row_to_node};
pub(crate) use schema::SCHEMA;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{Edge, NodeKind};

/// How long a connection waits for another writer before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// `SQLite` property-graph store.
///
/// The connection is wrapped in a `Mutex` so the store can be shared across
/// threads. A store opened with [`SqliteStore::open_read_only`] refuses every
/// mutation with `Error::ReadOnly` before touching the database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
    read_only: bool,
}

impl SqliteStore {
    /// Open or create the graph database.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or the schema applied.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;

        debug!(path = %path.display(), "Opened graph database");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
            read_only: false,
        })
    }

    /// Open an existing graph database for queries only.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the database does not exist.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "graph database {} (run `ripple index` first)",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        debug!(path = %path.display(), "Opened graph database read-only");
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
            read_only: true,
        })
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the connection lock.
    pub(crate) fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            Error::Internal(format!(
                "database connection mutex poisoned (a thread panicked while holding the lock): {e}"
            ))
        })
    }

    /// Fail with `Error::ReadOnly` if this store rejects mutations.
    pub(crate) fn ensure_writable(&self, operation: &'static str) -> Result<()> {
        if self.read_only {
            return Err(Error::ReadOnly(operation));
        }
        Ok(())
    }

    /// Start a write batch. Writes until [`SqliteStore::commit_batch`] share
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadOnly` on a read-only store, or a database error.
    pub fn begin_batch(&self) -> Result<()> {
        self.ensure_writable("begin batch")?;
        let conn = self.connection()?;
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN IMMEDIATE")?;
        }
        Ok(())
    }

    /// Commit the current write batch, if one is open.
    ///
    /// # Errors
    ///
    /// Returns a database error if the commit fails.
    pub fn commit_batch(&self) -> Result<()> {
        let conn = self.connection()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Every stored node as (kind, key), sorted.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn node_keys(&self) -> Result<BTreeSet<(NodeKind, String)>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT kind, key FROM nodes")?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(0)?;
            let key: String = row.get(1)?;
            Ok((helpers::parse_node_kind(&kind)?, key))
        })?;
        Ok(rows.collect::<std::result::Result<BTreeSet<_>, _>>()?)
    }

    /// Every stored edge, sorted.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn edge_set(&self) -> Result<BTreeSet<Edge>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!("SELECT {EDGE_COLUMNS} FROM edges"))?;
        let rows = stmt.query_map([], row_to_edge)?;
        Ok(rows.collect::<std::result::Result<BTreeSet<_>, _>>()?)
    }

    /// Update `SQLite` query planner statistics after a large load.
    ///
    /// # Errors
    ///
    /// Returns a database error if `ANALYZE` fails.
    pub fn analyze(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch("ANALYZE")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphStore, UpsertOutcome};
    use crate::types::{FileNode, Language, Node};
    use tempfile::TempDir;

    fn temp_db() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("should create temp directory");
        let path = dir.path().join("graph.db");
        (dir, path)
    }

    fn file_node(path: &str) -> Node {
        Node::File(FileNode {
            path: path.to_string(),
            language: Language::Python,
            content_hash: "h".to_string(),
        })
    }

    #[test]
    fn open_creates_database_and_schema() {
        let (_dir, path) = temp_db();

        let store = SqliteStore::open(&path).expect("failed to open database");
        let conn = store.connection().expect("should get connection");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(tables, vec!["edges".to_string(), "nodes".to_string()]);
    }

    #[test]
    fn read_only_requires_existing_database() {
        let (_dir, path) = temp_db();
        assert!(matches!(
            SqliteStore::open_read_only(&path),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn read_only_rejects_writes_but_serves_reads() {
        let (_dir, path) = temp_db();
        {
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(
                store.upsert_node(&file_node("a.py")).unwrap(),
                UpsertOutcome::Inserted
            );
        }

        let store = SqliteStore::open_read_only(&path).unwrap();

        assert!(store.is_read_only());
        assert!(matches!(
            store.upsert_node(&file_node("b.py")),
            Err(Error::ReadOnly(_))
        ));
        assert!(matches!(store.clear(), Err(Error::ReadOnly(_))));
        assert!(matches!(store.begin_batch(), Err(Error::ReadOnly(_))));
        assert!(store.node_exists(NodeKind::File, "a.py").unwrap());
    }

    #[test]
    fn batch_commits_writes() {
        let (_dir, path) = temp_db();
        let store = SqliteStore::open(&path).unwrap();

        store.begin_batch().unwrap();
        store.upsert_node(&file_node("a.py")).unwrap();
        store.upsert_node(&file_node("b.py")).unwrap();
        store.commit_batch().unwrap();

        assert_eq!(store.node_keys().unwrap().len(), 2);
    }
}
