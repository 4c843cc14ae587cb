//! Node operations for the Ripple graph store.
//!
//! Nodes are keyed by (kind, natural key). Every node records the
//! project-relative file it belongs to, which is what file-scoped deletion
//! keys on.

// SQLite stores integers as i64. Line numbers fit in u32.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use rusqlite::{OptionalExtension, params};
use tracing::{debug, trace};

use super::{NODE_COLUMNS, SqliteStore, row_to_node};
use crate::error::Result;
use crate::graph::{FunctionRef, NodeProperty, UpsertOutcome};
use crate::types::{
    AttributeNode, AttributeWrite, ClassNode, DecoratorNode, EdgeKind, FunctionNode, ImportNode,
    ModuleNode, Node, NodeKind,
};

impl SqliteStore {
    pub(crate) fn upsert_node_impl(&self, node: &Node) -> Result<UpsertOutcome> {
        self.ensure_writable("upsert node")?;
        let props = node.to_row()?;
        let conn = self.connection()?;

        let updated = conn.execute(
            "UPDATE nodes SET file = ?3, name = ?4, line = ?5, props = ?6
             WHERE kind = ?1 AND key = ?2",
            params![
                node.kind().as_str(),
                node.key(),
                node.file(),
                node.name(),
                node.line(),
                props
            ],
        )?;
        if updated > 0 {
            return Ok(UpsertOutcome::Updated);
        }

        conn.execute(
            "INSERT INTO nodes (kind, key, file, name, line, props) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                node.kind().as_str(),
                node.key(),
                node.file(),
                node.name(),
                node.line(),
                props
            ],
        )?;
        Ok(UpsertOutcome::Inserted)
    }

    pub(crate) fn node_exists_impl(&self, kind: NodeKind, key: &str) -> Result<bool> {
        let conn = self.connection()?;
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM nodes WHERE kind = ?1 AND key = ?2)",
            params![kind.as_str(), key],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    pub(crate) fn get_node_impl(&self, kind: NodeKind, key: &str) -> Result<Option<Node>> {
        let conn = self.connection()?;
        let node = conn
            .query_row(
                &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE kind = ?1 AND key = ?2"),
                params![kind.as_str(), key],
                row_to_node,
            )
            .optional()?;
        Ok(node)
    }

    pub(crate) fn find_nodes_impl(
        &self,
        kind: NodeKind,
        property: NodeProperty,
        value: &str,
    ) -> Result<Vec<Node>> {
        let column = match property {
            NodeProperty::Name => "name",
            NodeProperty::File => "file",
        };
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE kind = ?1 AND {column} = ?2
             ORDER BY file, line, key"
        ))?;
        let nodes = stmt
            .query_map(params![kind.as_str(), value], row_to_node)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    pub(crate) fn delete_file_data_impl(&self, path: &str) -> Result<usize> {
        self.ensure_writable("delete file data")?;
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        let edges = tx.execute(
            "DELETE FROM edges
             WHERE from_key IN (SELECT key FROM nodes WHERE file = ?1)
                OR to_key IN (SELECT key FROM nodes WHERE file = ?1)",
            [path],
        )?;
        let nodes = tx.execute("DELETE FROM nodes WHERE file = ?1", [path])?;
        tx.commit()?;

        debug!(file = path, nodes, edges, "Deleted file data");
        Ok(nodes)
    }

    pub(crate) fn file_unchanged_impl(&self, path: &str, content_hash: &str) -> Result<bool> {
        match self.get_node_impl(NodeKind::File, path)? {
            Some(Node::File(file)) => {
                let unchanged = file.content_hash == content_hash;
                trace!(file = path, unchanged, "Compared content hash");
                Ok(unchanged)
            }
            _ => Ok(false),
        }
    }

    /// Project-relative paths of every stored file, sorted.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn file_paths(&self) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT key FROM nodes WHERE kind = 'file' ORDER BY key")?;
        let paths = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(paths)
    }

    /// Functions defined in a file, by start line.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn functions_in_file(&self, path: &str) -> Result<Vec<FunctionNode>> {
        Ok(self
            .find_nodes_impl(NodeKind::Function, NodeProperty::File, path)?
            .into_iter()
            .filter_map(|node| match node {
                Node::Function(f) => Some(f),
                _ => None,
            })
            .collect())
    }

    /// Imports of a file, by line.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn imports_for_file(&self, path: &str) -> Result<Vec<ImportNode>> {
        Ok(self
            .targets_of(EdgeKind::HasImport, path, "position")?
            .into_iter()
            .filter_map(|(node, _)| match node {
                Node::Import(i) => Some(i),
                _ => None,
            })
            .collect())
    }

    /// Decorators applied to a function or class, with their position.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn decorators_of(&self, target_id: &str) -> Result<Vec<(DecoratorNode, u32)>> {
        Ok(self
            .targets_of(EdgeKind::DecoratedBy, target_id, "position")?
            .into_iter()
            .filter_map(|(node, position)| match node {
                Node::Decorator(d) => Some((d, position)),
                _ => None,
            })
            .collect())
    }

    /// Attributes of a class, by definition line.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn attributes_of(&self, class_id: &str) -> Result<Vec<AttributeNode>> {
        Ok(self
            .targets_of(EdgeKind::HasAttribute, class_id, "position")?
            .into_iter()
            .filter_map(|(node, _)| match node {
                Node::Attribute(a) => Some(a),
                _ => None,
            })
            .collect())
    }

    /// The class named `name` defined in a file, if any. The first one by
    /// line wins when a file defines the name twice.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn find_class(&self, path: &str, name: &str) -> Result<Option<ClassNode>> {
        Ok(self
            .classes_in_file(path)?
            .into_iter()
            .find(|class| class.name == name))
    }

    /// Classes defined in a file, by start line.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn classes_in_file(&self, path: &str) -> Result<Vec<ClassNode>> {
        Ok(self
            .find_nodes_impl(NodeKind::Class, NodeProperty::File, path)?
            .into_iter()
            .filter_map(|node| match node {
                Node::Class(c) => Some(c),
                _ => None,
            })
            .collect())
    }

    /// Functions that raise an exception named `exception`, as distinct
    /// (file, function) pairs.
    ///
    /// Catching an exception does not count.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn functions_raising(&self, exception: &str) -> Result<Vec<FunctionRef>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(
            "SELECT DISTINCT f.file, f.name
             FROM edges e
             JOIN nodes x ON x.kind = 'exception' AND x.key = e.to_key
             JOIN nodes f ON f.kind = 'function' AND f.key = e.from_key
             WHERE e.kind = 'HANDLES_EXCEPTION' AND e.context = 'raise' AND x.name = ?1
             ORDER BY f.file, f.name",
        )?;
        let functions = stmt
            .query_map([exception], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(functions)
    }

    /// Functions that write `class_name.attribute`, one entry per write.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn attribute_modifiers(
        &self,
        class_name: &str,
        attribute: &str,
    ) -> Result<Vec<AttributeWrite>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare_cached(
            "SELECT f.file, f.name, e.line
             FROM edges e
             JOIN nodes a ON a.kind = 'attribute' AND a.key = e.to_key
             JOIN nodes f ON f.kind = 'function' AND f.key = e.from_key
             WHERE e.kind = 'ACCESSES' AND e.context = 'write'
               AND a.name = ?2 AND json_extract(a.props, '$.class_name') = ?1
             ORDER BY f.file, f.name, e.line",
        )?;
        let writes = stmt
            .query_map(params![class_name, attribute], |row| {
                let line: i64 = row.get(2)?;
                Ok(AttributeWrite {
                    file: row.get(0)?,
                    function: row.get(1)?,
                    line: line as u32,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(writes)
    }

    /// Every import of `name` across the workspace, by file and line.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn import_usages(&self, name: &str) -> Result<Vec<ImportNode>> {
        Ok(self
            .find_nodes_impl(NodeKind::Import, NodeProperty::Name, name)?
            .into_iter()
            .filter_map(|node| match node {
                Node::Import(i) => Some(i),
                _ => None,
            })
            .collect())
    }

    /// Modules declared by indexed files, by dotted name.
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails.
    pub fn module_hierarchy(&self) -> Result<Vec<ModuleNode>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT m.kind, m.props
             FROM edges e
             JOIN nodes src ON src.kind = 'file' AND src.key = e.from_key
             JOIN nodes m ON m.kind = 'module' AND m.key = e.to_key
             WHERE e.kind = 'MODULE_OF'
             ORDER BY m.name, m.file",
        )?;
        let modules = stmt
            .query_map([], row_to_node)?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|node| match node {
                Node::Module(m) => Some(m),
                _ => None,
            })
            .collect();
        Ok(modules)
    }

    /// Target nodes of outgoing edges of one kind, with the edge's
    /// `order_column` value (0 when unset), ordered by it and then by line.
    fn targets_of(
        &self,
        kind: EdgeKind,
        from_key: &str,
        order_column: &str,
    ) -> Result<Vec<(Node, u32)>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT n.kind, n.props, COALESCE(e.{order_column}, 0) AS ord
             FROM edges e JOIN nodes n ON n.key = e.to_key
             WHERE e.kind = ?1 AND e.from_key = ?2
             ORDER BY ord, n.line, n.key"
        ))?;
        let rows = stmt
            .query_map(params![kind.as_str(), from_key], |row| {
                let node = row_to_node(row)?;
                let ord: i64 = row.get(2)?;
                Ok((node, ord as u32))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphStore;
    use crate::types::{Edge, FileNode, Language};
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("graph.db")).unwrap();
        (dir, store)
    }

    fn file(path: &str, hash: &str) -> Node {
        Node::File(FileNode {
            path: path.to_string(),
            language: Language::Python,
            content_hash: hash.to_string(),
        })
    }

    fn class(id: &str, name: &str, file: &str, line: u32) -> Node {
        Node::Class(ClassNode {
            id: id.to_string(),
            name: name.to_string(),
            file: file.to_string(),
            start_line: line,
            end_line: line + 3,
            base_names: vec![],
            is_public: true,
            source_excerpt: None,
        })
    }

    #[test]
    fn upsert_inserts_then_updates() {
        let (_dir, store) = store();

        assert_eq!(store.upsert_node(&file("a.py", "1")).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(store.upsert_node(&file("a.py", "2")).unwrap(), UpsertOutcome::Updated);

        assert!(store.file_unchanged("a.py", "2").unwrap());
        assert!(!store.file_unchanged("a.py", "1").unwrap());
        assert!(!store.file_unchanged("b.py", "2").unwrap());
    }

    #[test]
    fn find_nodes_orders_by_file_then_line() {
        let (_dir, store) = store();
        store.upsert_node(&class("cls_b", "Model", "b.py", 1)).unwrap();
        store.upsert_node(&class("cls_a2", "Model", "a.py", 9)).unwrap();
        store.upsert_node(&class("cls_a1", "Model", "a.py", 2)).unwrap();
        store.upsert_node(&class("cls_x", "Other", "a.py", 5)).unwrap();

        let keys: Vec<String> = store
            .find_nodes(NodeKind::Class, NodeProperty::Name, "Model")
            .unwrap()
            .iter()
            .map(|n| n.key().to_string())
            .collect();

        assert_eq!(keys, vec!["cls_a1", "cls_a2", "cls_b"]);
        assert_eq!(
            store
                .find_nodes(NodeKind::Class, NodeProperty::File, "a.py")
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn delete_file_data_removes_only_that_file() {
        let (_dir, store) = store();
        store.upsert_node(&file("a.py", "1")).unwrap();
        store.upsert_node(&file("b.py", "1")).unwrap();
        store.upsert_node(&class("cls_a", "A", "a.py", 1)).unwrap();
        store.upsert_node(&class("cls_b", "B", "b.py", 1)).unwrap();
        store
            .create_edge(&Edge::new(EdgeKind::ContainsClass, "a.py", "cls_a"))
            .unwrap();
        store
            .create_edge(&Edge::new(EdgeKind::ContainsClass, "b.py", "cls_b"))
            .unwrap();
        store
            .create_edge(&Edge::new(EdgeKind::Inherits, "cls_b", "cls_a"))
            .unwrap();

        let removed = store.delete_file_data("a.py").unwrap();

        assert_eq!(removed, 2);
        let keys: Vec<String> = store.node_keys().unwrap().into_iter().map(|(_, k)| k).collect();
        assert_eq!(keys, vec!["b.py".to_string(), "cls_b".to_string()]);
        let edges: Vec<EdgeKind> = store.edge_set().unwrap().into_iter().map(|e| e.kind).collect();
        assert_eq!(edges, vec![EdgeKind::ContainsClass]);
    }

    #[test]
    fn file_paths_lists_stored_files() {
        let (_dir, store) = store();
        store.upsert_node(&file("z.py", "1")).unwrap();
        store.upsert_node(&file("a.py", "1")).unwrap();

        assert_eq!(store.file_paths().unwrap(), vec!["a.py", "z.py"]);
    }
}
