//! Frozen query surface
//!
//! [`AliasResults`] owns everything the analysis produced: the fully
//! compressed graph, the resolved call sites, and the run statistics. No
//! method takes `&mut self` and there is no interior mutability, so a
//! results value can be shared across threads freely; `par_alias_pairs`
//! demonstrates the intended read-parallel use.

use std::collections::VecDeque;
use std::fmt;

use petgraph::graph::DiGraph;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::features::alias_graph::{AliasGraph, NodeId};
use crate::features::call_graph::{build_call_graph, recursion_groups, CallSite};
use crate::shared::models::{FuncId, Program, ValueId};

/// Answer lattice for a pairwise query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AliasRelation {
    /// Distinct classes with no location overlap on record
    NoAlias,
    /// At least one side was never seen by the analysis
    MayAlias,
    /// Same value or same equivalence class
    MustAlias,
    /// One class derives a location inside the other
    PartialAlias,
}

/// Counters for one whole run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub functions_analyzed: usize,
    pub instructions_translated: usize,
    pub nodes_created: usize,
    pub nodes_merged: usize,
    pub edges_added: usize,
    pub unify_passes: usize,
    pub rounds: usize,
    pub direct_call_sites: usize,
    pub indirect_call_sites: usize,
    /// New indirect candidates per round, oldest first (when recorded)
    pub indirect_resolved_per_round: Vec<usize>,
    /// False when the round cap cut the run short
    pub reached_fixpoint: bool,
    pub duration_ms: u64,
}

impl fmt::Display for AnalysisStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} functions, {} instructions, {} rounds, {} merges, {} call sites ({} indirect), fixpoint: {}, {} ms",
            self.functions_analyzed,
            self.instructions_translated,
            self.rounds,
            self.nodes_merged,
            self.direct_call_sites + self.indirect_call_sites,
            self.indirect_call_sites,
            self.reached_fixpoint,
            self.duration_ms
        )
    }
}

/// Serializable dump of the interesting outputs, for debugging and golden
/// tests. Classes and edges are sorted so dumps diff cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsSnapshot {
    pub equivalence_classes: Vec<Vec<ValueId>>,
    pub call_edges: Vec<(String, String)>,
    pub stats: AnalysisStats,
}

/// The analysis output, frozen
#[derive(Debug)]
pub struct AliasResults {
    graph: AliasGraph,
    sites: Vec<CallSite>,
    callees: FxHashMap<FuncId, Vec<FuncId>>,
    callers: FxHashMap<FuncId, Vec<FuncId>>,
    func_names: Vec<String>,
    stats: AnalysisStats,
}

impl AliasResults {
    pub(super) fn new(
        program: &Program,
        graph: AliasGraph,
        sites: Vec<CallSite>,
        stats: AnalysisStats,
    ) -> Self {
        let func_names = program.functions().map(|f| f.name.clone()).collect();
        let mut callee_sets: FxHashMap<FuncId, FxHashSet<FuncId>> = FxHashMap::default();
        let mut caller_sets: FxHashMap<FuncId, FxHashSet<FuncId>> = FxHashMap::default();
        for site in &sites {
            for &callee in &site.resolved {
                callee_sets.entry(site.caller).or_default().insert(callee);
                caller_sets.entry(callee).or_default().insert(site.caller);
            }
        }
        let sorted = |sets: FxHashMap<FuncId, FxHashSet<FuncId>>| {
            sets.into_iter()
                .map(|(k, v)| {
                    let mut v: Vec<FuncId> = v.into_iter().collect();
                    v.sort();
                    (k, v)
                })
                .collect()
        };
        Self {
            graph,
            sites,
            callees: sorted(callee_sets),
            callers: sorted(caller_sets),
            func_names,
            stats,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Pairwise queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Relate two values. Conservative on ignorance: a value the analysis
    /// never saw gets `MayAlias`, never `NoAlias`.
    pub fn alias(&self, a: ValueId, b: ValueId) -> AliasRelation {
        if a == b {
            return AliasRelation::MustAlias;
        }
        match (self.graph.lookup(a), self.graph.lookup(b)) {
            (Some(na), Some(nb)) => {
                if na == nb {
                    AliasRelation::MustAlias
                } else if self.offset_connected(na, nb) || self.offset_connected(nb, na) {
                    AliasRelation::PartialAlias
                } else {
                    AliasRelation::NoAlias
                }
            }
            _ => AliasRelation::MayAlias,
        }
    }

    /// Whether `to` is reachable from `from` over offset-labeled edges,
    /// meaning its class addresses storage inside `from`'s class
    fn offset_connected(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        visited.insert(from);
        queue.push_back(from);
        while let Some(n) = queue.pop_front() {
            for (label, targets) in self.graph.out_edges(n) {
                if !self.graph.labels().is_offset(label) {
                    continue;
                }
                for &t in targets {
                    if t == to {
                        return true;
                    }
                    if visited.insert(t) {
                        queue.push_back(t);
                    }
                }
            }
        }
        false
    }

    /// Bulk pairwise queries over a rayon worker pool
    pub fn par_alias_pairs(&self, pairs: &[(ValueId, ValueId)]) -> Vec<AliasRelation> {
        pairs.par_iter().map(|&(a, b)| self.alias(a, b)).collect()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Sets and reachability
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Every value in the same class, sorted; a singleton when unseen
    pub fn equivalence_set_of(&self, value: ValueId) -> Vec<ValueId> {
        match self.graph.lookup(value) {
            Some(n) => {
                let mut vs: Vec<ValueId> = self.graph.values_of(n).iter().copied().collect();
                vs.sort();
                vs
            }
            None => vec![value],
        }
    }

    /// Values in classes reachable from the seed values over any edge
    pub fn reachable_values(&self, seeds: &[ValueId]) -> FxHashSet<ValueId> {
        let nodes: Vec<NodeId> = seeds.iter().filter_map(|&v| self.graph.lookup(v)).collect();
        self.graph
            .reachable_from(&nodes)
            .into_iter()
            .flat_map(|n| self.graph.values_of(n).iter().copied())
            .collect()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Call graph
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Resolved callees of a function, sorted
    pub fn callees_of(&self, func: FuncId) -> &[FuncId] {
        self.callees.get(&func).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Functions observed calling `func`, sorted
    pub fn callers_of(&self, func: FuncId) -> &[FuncId] {
        self.callers.get(&func).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Call sites with their per-site candidate sets
    #[inline]
    pub fn call_sites(&self) -> &[CallSite] {
        &self.sites
    }

    #[inline]
    pub fn function_name(&self, func: FuncId) -> &str {
        &self.func_names[func.0 as usize]
    }

    /// The resolved call graph as a petgraph view
    pub fn call_graph(&self) -> DiGraph<String, ()> {
        let nodes = self
            .func_names
            .iter()
            .enumerate()
            .map(|(i, name)| (FuncId(i as u32), name.clone()));
        let edges = self
            .sites
            .iter()
            .flat_map(|s| s.resolved.iter().map(move |&callee| (s.caller, callee)));
        build_call_graph(nodes, edges)
    }

    /// Mutually recursive function groups in the resolved call graph
    pub fn recursion_groups(&self) -> Vec<Vec<String>> {
        recursion_groups(&self.call_graph())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Introspection
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    #[inline]
    pub fn graph(&self) -> &AliasGraph {
        &self.graph
    }

    #[inline]
    pub fn stats(&self) -> &AnalysisStats {
        &self.stats
    }

    #[inline]
    pub fn reached_fixpoint(&self) -> bool {
        self.stats.reached_fixpoint
    }

    pub fn snapshot(&self) -> ResultsSnapshot {
        let mut equivalence_classes: Vec<Vec<ValueId>> = self
            .graph
            .live_nodes()
            .map(|n| {
                let mut vs: Vec<ValueId> = self.graph.values_of(n).iter().copied().collect();
                vs.sort();
                vs
            })
            .filter(|vs| !vs.is_empty())
            .collect();
        equivalence_classes.sort();
        let mut call_edges: Vec<(String, String)> = self
            .sites
            .iter()
            .flat_map(|s| {
                s.resolved.iter().map(|&callee| {
                    (
                        self.function_name(s.caller).to_string(),
                        self.function_name(callee).to_string(),
                    )
                })
            })
            .collect();
        call_edges.sort();
        call_edges.dedup();
        ResultsSnapshot {
            equivalence_classes,
            call_edges,
            stats: self.stats.clone(),
        }
    }
}
