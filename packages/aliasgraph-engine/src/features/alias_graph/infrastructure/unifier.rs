//! Unification fixpoint
//!
//! Restores the class invariant after constraint insertion: at fixpoint a
//! node carries at most one out-edge per label. The worklist holds
//! `(node, label)` pairs observed with more than one target; popping a pair
//! re-resolves the node and merges targets two at a time. Every merge can
//! only create new violations at the surviving node (edge moves elsewhere
//! deduplicate), so only the survivor is re-enqueued, and every merge
//! strictly decreases the live class count, which bounds the loop.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::debug;

use crate::features::alias_graph::domain::edge_label::LabelId;
use crate::features::alias_graph::domain::graph::{AliasGraph, NodeId};

/// Counters for unification work, accumulated across passes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnifierStats {
    pub passes: usize,
    pub pairs_processed: usize,
    pub merges: usize,
    pub duration_ms: u64,
}

/// Worklist-driven unification engine
#[derive(Debug, Default)]
pub struct Unifier {
    worklist: VecDeque<(NodeId, LabelId)>,
    in_worklist: FxHashSet<(NodeId, LabelId)>,
    stats: UnifierStats,
}

impl Unifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn enqueue(&mut self, node: NodeId, label: LabelId) {
        let key = (node, label);
        if self.in_worklist.insert(key) {
            self.worklist.push_back(key);
        }
    }

    /// Run the graph to the one-target-per-label fixpoint. Returns true
    /// when the graph was already at fixpoint on entry, so a second call
    /// immediately after a pass always reports clean.
    pub fn run(&mut self, graph: &mut AliasGraph) -> bool {
        let start = Instant::now();
        self.stats.passes += 1;

        let live: Vec<NodeId> = graph.live_nodes().collect();
        for node in live {
            for label in graph.multi_target_labels(node) {
                self.enqueue(node, label);
            }
        }

        let mut merges_this_pass = 0usize;
        while let Some((node, label)) = self.worklist.pop_front() {
            self.in_worklist.remove(&(node, label));
            self.stats.pairs_processed += 1;
            let mut node = graph.find(node);
            loop {
                let targets = graph.targets(node, label);
                if targets.len() <= 1 {
                    break;
                }
                let survivor = graph.combine(targets[0], targets[1]);
                merges_this_pass += 1;
                // Merging two targets can absorb the source itself
                node = graph.find(node);
                for l in graph.multi_target_labels(survivor) {
                    self.enqueue(survivor, l);
                }
            }
        }

        self.stats.merges += merges_this_pass;
        self.stats.duration_ms += start.elapsed().as_millis() as u64;
        debug!(merges = merges_this_pass, "unification pass complete");
        merges_this_pass == 0
    }

    #[inline]
    pub fn stats(&self) -> &UnifierStats {
        &self.stats
    }
}
