//! Tests for content-hash staleness and file-scoped deletion.

mod common;

use std::collections::BTreeSet;

use common::{MODELS, project, write_files};
use ripple::graph::{EdgeDirection, NodeProperty};
use ripple::{BuildMode, Direction, EdgeKind, GraphStore, NodeKind, SqliteStore};

fn dangling_edges(store: &SqliteStore) -> usize {
    let keys: BTreeSet<String> = store
        .node_keys()
        .unwrap()
        .into_iter()
        .map(|(_, key)| key)
        .collect();
    store
        .edge_set()
        .unwrap()
        .iter()
        .filter(|e| !keys.contains(&e.from) || !keys.contains(&e.to))
        .count()
}

#[test]
fn delete_file_data_removes_only_that_file() {
    let (_dir, ripple) = project();
    ripple.index(BuildMode::Incremental).unwrap();
    let store = ripple.store();
    let service_before: Vec<_> = ripple.functions_in_file("service.py").unwrap();

    let removed = store.delete_file_data("models.py").unwrap();

    assert!(removed > 0);
    assert!(ripple.functions_in_file("models.py").unwrap().is_empty());
    assert!(!store.node_exists(NodeKind::File, "models.py").unwrap());
    assert_eq!(ripple.functions_in_file("service.py").unwrap(), service_before);
    assert_eq!(dangling_edges(store), 0);
}

#[test]
fn changed_file_is_reindexed_and_cross_file_edges_restored() {
    let (dir, ripple) = project();
    ripple.index(BuildMode::Incremental).unwrap();

    let changed = format!("{MODELS}\n\ndef extra():\n    return format_name(\"x\")\n");
    write_files(dir.path(), &[("models.py", changed.as_str())]);
    let report = ripple.index(BuildMode::Incremental).unwrap();

    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.files_unchanged, 1);

    let store = ripple.store();
    let incremental = (store.node_keys().unwrap(), store.edge_set().unwrap());
    ripple.rebuild(BuildMode::Bulk).unwrap();
    let fresh = (store.node_keys().unwrap(), store.edge_set().unwrap());

    assert_eq!(incremental, fresh);
    assert_eq!(dangling_edges(store), 0);
}

#[test]
fn moved_function_gets_a_new_identity() {
    let (dir, ripple) = common::workspace_with_files(&[(
        "app.py",
        "def main():\n    helper()\n\ndef helper():\n    pass\n",
    )]);
    ripple.index(BuildMode::Incremental).unwrap();

    write_files(
        dir.path(),
        &[(
            "app.py",
            "# header\n\ndef main():\n    helper()\n\ndef helper():\n    pass\n",
        )],
    );
    ripple.index(BuildMode::Incremental).unwrap();

    let lines: Vec<(String, u32)> = ripple
        .functions_in_file("app.py")
        .unwrap()
        .into_iter()
        .map(|f| (f.name, f.start_line))
        .collect();
    assert_eq!(
        lines,
        vec![("main".to_string(), 3), ("helper".to_string(), 6)]
    );

    let entries = ripple
        .impact("app.py", "helper", Direction::Upstream, Some(1))
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].line, 4);
}

#[test]
fn removing_a_file_drops_calls_into_it() {
    let (dir, ripple) = project();
    ripple.index(BuildMode::Incremental).unwrap();

    std::fs::remove_file(dir.path().join("models.py")).unwrap();
    let report = ripple.index(BuildMode::Incremental).unwrap();

    assert_eq!(report.files_removed, 1);
    let callees = ripple
        .impact("service.py", "handle", Direction::Downstream, Some(1))
        .unwrap();
    assert!(callees.is_empty());
    assert_eq!(dangling_edges(ripple.store()), 0);
}

#[test]
fn new_canonical_base_moves_inherits_edge_of_unchanged_class() {
    let (dir, ripple) = project();
    ripple.index(BuildMode::Incremental).unwrap();

    // aaa.py sorts first, so its User becomes the canonical base for Admin
    write_files(dir.path(), &[("aaa.py", "class User:\n    pass\n")]);
    let report = ripple.index(BuildMode::Incremental).unwrap();

    assert_eq!(report.files_unchanged, 2);
    assert_eq!(report.build.edges_removed, 1);

    let store = ripple.store();
    let admin = store
        .find_nodes(NodeKind::Class, NodeProperty::Name, "Admin")
        .unwrap();
    let parents = store
        .neighbors(EdgeKind::Inherits, admin[0].key(), EdgeDirection::Outgoing)
        .unwrap();
    assert_eq!(parents.len(), 1);
    let parent = store.get_node(NodeKind::Class, &parents[0].to).unwrap().unwrap();
    assert_eq!(parent.file(), "aaa.py");

    let incremental = (store.node_keys().unwrap(), store.edge_set().unwrap());
    ripple.rebuild(BuildMode::Bulk).unwrap();
    let fresh = (store.node_keys().unwrap(), store.edge_set().unwrap());
    assert_eq!(incremental, fresh);
}

#[test]
fn file_that_stops_parsing_is_not_counted_as_removed() {
    let (dir, ripple) = project();
    ripple.index(BuildMode::Incremental).unwrap();

    write_files(dir.path(), &[("service.py", "def broken(:\n    pass\n")]);
    let report = ripple.index(BuildMode::Incremental).unwrap();

    assert_eq!(report.files_removed, 0);
    assert_eq!(report.files_invalidated, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(ripple.functions_in_file("service.py").unwrap().is_empty());
    assert_eq!(dangling_edges(ripple.store()), 0);
}
