//! Integration tests for impact analysis over an indexed workspace.
//!
//! These tests verify the query side through the public Ripple API:
//! - Depth-bounded upstream and downstream traversal
//! - Termination on call cycles
//! - Cycle detection
//! - Concurrent read-only queries

mod common;

use std::sync::Arc;
use std::thread;

use common::{CHAIN, workspace_with_files};
use ripple::{BuildMode, Direction, ImpactType, Ripple};
use rstest::rstest;

fn summary(entries: &[ripple::ImpactEntry]) -> Vec<(&str, u32, u32)> {
    entries
        .iter()
        .map(|e| (e.function_name.as_str(), e.depth, e.line))
        .collect()
}

#[rstest]
#[case(Direction::Downstream, "handler", 1, vec![("worker", 1, 5)])]
#[case(Direction::Downstream, "handler", 2, vec![("worker", 1, 5), ("helper", 2, 8)])]
#[case(Direction::Upstream, "worker", 2, vec![("handler", 1, 5), ("main", 2, 2)])]
#[case(Direction::Upstream, "main", 5, vec![])]
#[case(Direction::Downstream, "helper", 5, vec![])]
fn chain_respects_depth_boundary(
    #[case] direction: Direction,
    #[case] function: &str,
    #[case] depth: u32,
    #[case] expected: Vec<(&str, u32, u32)>,
) {
    let (_dir, ripple) = workspace_with_files(&[("chain.py", CHAIN)]);
    ripple.index(BuildMode::Incremental).unwrap();

    let entries = ripple
        .impact("chain.py", function, direction, Some(depth))
        .unwrap();

    assert_eq!(summary(&entries), expected);
}

#[test]
fn both_directions_tag_each_entry() {
    let (_dir, ripple) = workspace_with_files(&[("chain.py", CHAIN)]);
    ripple.index(BuildMode::Incremental).unwrap();

    let entries = ripple
        .impact("chain.py", "handler", Direction::Both, Some(1))
        .unwrap();
    let tagged: Vec<(&str, ImpactType)> = entries
        .iter()
        .map(|e| (e.function_name.as_str(), e.impact_type))
        .collect();

    assert_eq!(
        tagged,
        vec![("main", ImpactType::Caller), ("worker", ImpactType::Callee)]
    );
}

const CYCLE: &str = "def a():
    b()

def b():
    c()

def c():
    a()

def standalone():
    standalone()
";

#[test]
fn traversal_terminates_on_cycles_and_skips_origin() {
    let (_dir, ripple) = workspace_with_files(&[("cycle.py", CYCLE)]);
    ripple.index(BuildMode::Incremental).unwrap();

    let entries = ripple
        .impact("cycle.py", "a", Direction::Downstream, Some(10))
        .unwrap();

    assert_eq!(summary(&entries), vec![("b", 1, 2), ("c", 2, 5)]);
}

#[test]
fn call_cycles_are_detected() {
    let (_dir, ripple) = workspace_with_files(&[("cycle.py", CYCLE), ("chain.py", CHAIN)]);
    ripple.index(BuildMode::Incremental).unwrap();

    let cycles = ripple.call_cycles().unwrap();
    let members: Vec<Vec<&str>> = cycles
        .iter()
        .map(|c| c.functions.iter().map(|(_, name)| name.as_str()).collect())
        .collect();

    assert_eq!(members.len(), 2);
    assert!(members.contains(&vec!["a", "b", "c"]));
    assert!(members.contains(&vec!["standalone"]));
}

#[test]
fn stats_rank_most_called_functions() {
    let (_dir, ripple) = workspace_with_files(&[(
        "calls.py",
        "def hub():\n    pass\n\ndef x():\n    hub()\n\ndef y():\n    hub()\n    x()\n",
    )]);
    ripple.index(BuildMode::Incremental).unwrap();

    let stats = ripple.stats().unwrap();

    assert_eq!(stats.most_called[0].name, "hub");
    assert_eq!(stats.most_called[0].call_count, 2);
    assert_eq!(stats.most_called[1].name, "x");
}

#[test]
fn read_only_queries_run_concurrently() {
    let (dir, ripple) = workspace_with_files(&[("chain.py", CHAIN)]);
    ripple.index(BuildMode::Incremental).unwrap();
    drop(ripple);

    let reader = Arc::new(Ripple::open_read_only(dir.path()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let reader = Arc::clone(&reader);
            thread::spawn(move || {
                reader
                    .impact("chain.py", "helper", Direction::Upstream, Some(3))
                    .unwrap()
                    .len()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
}
