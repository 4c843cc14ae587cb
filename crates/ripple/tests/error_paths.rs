//! Tests for error paths and contract violations.
//!
//! Per-file problems are reported in the index summary; configuration and
//! contract violations propagate as `Error`s.

mod common;

use std::fs;

use common::{CHAIN, project, workspace_with_files};
use ripple::{BuildMode, Direction, Error, GraphStore, Ripple};

#[test]
fn open_read_only_before_index_is_not_found() {
    let dir = tempfile::tempdir().unwrap();

    let result = Ripple::open_read_only(dir.path());

    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn read_only_workspace_rejects_indexing() {
    let (dir, ripple) = workspace_with_files(&[("chain.py", CHAIN)]);
    ripple.index(BuildMode::Incremental).unwrap();

    let reader = Ripple::open_read_only(dir.path()).unwrap();

    assert!(matches!(
        reader.index(BuildMode::Incremental),
        Err(Error::ReadOnly(_))
    ));
    assert!(matches!(
        reader.rebuild(BuildMode::Bulk),
        Err(Error::ReadOnly(_))
    ));
    assert!(matches!(
        reader.store().delete_file_data("chain.py"),
        Err(Error::ReadOnly(_))
    ));
    // Queries still work
    assert_eq!(
        reader
            .impact("chain.py", "main", Direction::Downstream, Some(1))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn invalid_config_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".ripple")).unwrap();
    fs::write(dir.path().join(".ripple/config.yaml"), "id-hex-length: 4\n").unwrap();

    let result = Ripple::new(dir.path());

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn malformed_config_yaml_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join(".ripple")).unwrap();
    fs::write(dir.path().join(".ripple/config.yaml"), "analysis: [unclosed\n").unwrap();

    assert!(matches!(Ripple::new(dir.path()), Err(Error::Yaml(_))));
}

#[test]
fn invalid_direction_is_a_config_error() {
    let err = "sideways".parse::<Direction>().unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert!(err.is_contract_violation());
}

#[test]
fn load_without_manifest_is_a_config_error() {
    let (dir, ripple) = workspace_with_files(&[]);
    let tables = dir.path().join("tables");
    fs::create_dir_all(&tables).unwrap();

    assert!(matches!(ripple.load_tables(&tables), Err(Error::Config(_))));
}

#[test]
fn unknown_function_has_no_impact() {
    let (_dir, ripple) = project();
    ripple.index(BuildMode::Incremental).unwrap();

    let entries = ripple
        .impact("models.py", "does_not_exist", Direction::Both, Some(3))
        .unwrap();

    assert!(entries.is_empty());
}

#[test]
fn non_utf8_file_is_reported_and_skipped() {
    let (dir, ripple) = workspace_with_files(&[("ok.py", "def ok():\n    pass\n")]);
    fs::write(dir.path().join("latin.py"), [0x78, 0x20, 0x3d, 0x20, 0xe9, 0x0a]).unwrap();

    let report = ripple.index(BuildMode::Incremental).unwrap();

    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ripple::AnalysisErrorKind::EncodingError);
}
