//! Tests for the bulk interchange tables: export to a directory, load back.

mod common;

use std::fs;

use common::project;
use ripple::{BuildMode, EdgeKind, GraphStore, LoadWarning, NodeKind};

#[test]
fn exported_tables_load_into_the_same_graph() {
    let (dir, ripple) = project();
    let tables = dir.path().join("export");

    let exported = ripple.export_tables(&tables).unwrap();
    assert_eq!(exported.files, 2);
    assert!(tables.join("manifest.json").exists());
    assert!(tables.join("nodes/functions.jsonl").exists());
    assert!(tables.join("edges/calls.jsonl").exists());

    ripple.rebuild(BuildMode::Bulk).unwrap();
    let store = ripple.store();
    let indexed = (store.node_keys().unwrap(), store.edge_set().unwrap());

    store.clear().unwrap();
    let (stats, warnings) = ripple.load_tables(&tables).unwrap();

    assert!(warnings.is_empty());
    assert!(stats.table_errors.is_empty());
    assert_eq!(stats.skipped_count(), 0);
    assert_eq!((store.node_keys().unwrap(), store.edge_set().unwrap()), indexed);
}

#[test]
fn missing_table_is_a_warning_and_dependent_edges_are_skipped() {
    let (dir, ripple) = project();
    let tables = dir.path().join("export");
    ripple.export_tables(&tables).unwrap();
    fs::remove_file(tables.join("nodes/classes.jsonl")).unwrap();

    let (stats, warnings) = ripple.load_tables(&tables).unwrap();

    assert_eq!(
        warnings,
        vec![LoadWarning::MissingTable {
            table: "classes".to_string()
        }]
    );
    assert!(!ripple.stats().unwrap().nodes_by_kind.contains_key(&NodeKind::Class));
    assert!(stats.edges_skipped[&EdgeKind::ContainsClass] > 0);
    assert!(stats.edges_skipped[&EdgeKind::Inherits] > 0);
}

#[test]
fn malformed_line_is_skipped_with_its_line_number() {
    let (dir, ripple) = project();
    let tables = dir.path().join("export");
    ripple.export_tables(&tables).unwrap();

    let path = tables.join("nodes/functions.jsonl");
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("{not json\n");
    let bad_line = content.lines().count();
    fs::write(&path, content).unwrap();

    let (stats, warnings) = ripple.load_tables(&tables).unwrap();

    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0],
        LoadWarning::MalformedRow { line_number, .. } if *line_number == bad_line
    ));
    assert!(stats.table_errors.is_empty());
    assert!(ripple.stats().unwrap().nodes_by_kind[&NodeKind::Function] > 0);
}

#[test]
fn manifest_version_mismatch_is_fatal() {
    let (dir, ripple) = project();
    let tables = dir.path().join("export");
    ripple.export_tables(&tables).unwrap();

    let manifest = tables.join("manifest.json");
    let content = fs::read_to_string(&manifest)
        .unwrap()
        .replace("\"version\": 1", "\"version\": 99");
    fs::write(&manifest, content).unwrap();

    assert!(matches!(
        ripple.load_tables(&tables),
        Err(ripple::Error::Config(_))
    ));
}
