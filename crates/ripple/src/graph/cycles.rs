//! Call-cycle detection using petgraph.

use std::collections::HashMap;

use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};

use super::types::FunctionRef;
use crate::types::CallCycle;

/// Find groups of functions that (mutually) recurse.
///
/// Each strongly connected component with more than one member, or a single
/// member calling itself, is one cycle. Members are sorted, and cycles are
/// ordered by their first member.
#[must_use]
pub fn find_call_cycles(calls: &[(FunctionRef, FunctionRef)]) -> Vec<CallCycle> {
    let mut graph: DiGraph<&FunctionRef, ()> = DiGraph::new();
    let mut node_map: HashMap<&FunctionRef, NodeIndex> = HashMap::new();

    for (caller, callee) in calls {
        let from = *node_map
            .entry(caller)
            .or_insert_with(|| graph.add_node(caller));
        let to = *node_map
            .entry(callee)
            .or_insert_with(|| graph.add_node(callee));
        graph.update_edge(from, to, ());
    }

    let mut cycles: Vec<CallCycle> = algo::tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| graph.contains_edge(node, node))
        })
        .map(|component| {
            let mut functions: Vec<FunctionRef> = component
                .into_iter()
                .map(|node| graph[node].clone())
                .collect();
            functions.sort();
            CallCycle { functions }
        })
        .collect();

    cycles.sort_by(|a, b| a.functions.cmp(&b.functions));
    cycles
}
