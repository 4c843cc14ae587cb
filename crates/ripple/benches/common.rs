//! Shared utilities for Ripple benchmarks.

// Benchmark utilities - pedantic lints not critical here
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(dead_code)]
#![allow(clippy::format_push_string)]

use std::fs;
use std::path::PathBuf;

use ripple::{BuildMode, Ripple};
use tempfile::TempDir;

/// A workspace ready for benchmarking with Ripple already indexed.
pub struct IndexedWorkspace {
    /// Temp directory - must be kept alive for the duration of the benchmark.
    pub dir: TempDir,
    /// Ripple instance with indexed workspace.
    pub ripple: Ripple,
}

/// Create a temporary workspace with the given files.
/// Returns the temp directory (must be kept alive) and the workspace path.
pub fn create_workspace(files: &[(String, String)]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");

    for (path, content) in files {
        let full_path = dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("failed to write file");
    }

    let path = dir.path().to_path_buf();
    (dir, path)
}

/// Create a workspace, open Ripple, and bulk index it.
pub fn create_indexed_workspace(files: &[(String, String)]) -> IndexedWorkspace {
    let (dir, path) = create_workspace(files);
    let ripple = Ripple::new(&path).expect("failed to create Ripple");
    ripple.index(BuildMode::Bulk).expect("index failed");
    IndexedWorkspace { dir, ripple }
}

/// A chain of `depth` modules where `stepN` calls `step{N+1}`.
///
/// Every step is also called by `width` fan-in callers in its own module.
pub fn generate_call_graph(depth: usize, width: usize) -> Vec<(String, String)> {
    (0..depth)
        .map(|i| {
            let mut content = format!("def step{i}():\n    step{}()\n", i + 1);
            for w in 0..width {
                content.push_str(&format!("\n\ndef caller{i}_{w}():\n    step{i}()\n"));
            }
            (format!("chain/mod{i}.py"), content)
        })
        .collect()
}
