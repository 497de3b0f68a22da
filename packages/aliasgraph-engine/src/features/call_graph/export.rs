//! Resolved call-graph export with petgraph
//!
//! Builds a `DiGraph` view of the resolved call graph so clients can run
//! standard graph algorithms (SCC, topological order, dominators) without
//! touching engine internals. Node weights are function names.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::shared::models::FuncId;

/// Build the exported call graph. Parallel call edges between the same
/// caller/callee pair collapse into one.
pub fn build_call_graph(
    nodes: impl IntoIterator<Item = (FuncId, String)>,
    edges: impl IntoIterator<Item = (FuncId, FuncId)>,
) -> DiGraph<String, ()> {
    let mut graph = DiGraph::new();
    let mut index: FxHashMap<FuncId, NodeIndex> = FxHashMap::default();
    for (func, name) in nodes {
        let idx = graph.add_node(name);
        index.insert(func, idx);
    }
    for (caller, callee) in edges {
        if let (Some(&from), Some(&to)) = (index.get(&caller), index.get(&callee)) {
            graph.update_edge(from, to, ());
        }
    }
    graph
}

/// Mutual-recursion groups: strongly connected components with more than
/// one member, or a single self-calling function
pub fn recursion_groups(graph: &DiGraph<String, ()>) -> Vec<Vec<String>> {
    tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.find_edge(scc[0], scc[0]).is_some())
        .map(|scc| scc.into_iter().map(|idx| graph[idx].clone()).collect())
        .collect()
}
