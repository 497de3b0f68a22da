//! Alias graph with in-place unification
//!
//! # Algorithm Overview
//!
//! Nodes are equivalence classes of program values. Labeled edges record
//! points-to facts and location derivations. [`AliasGraph::combine`] merges
//! two classes in place: the lighter node's edges and values move onto the
//! survivor, neighbor references are rewritten, and the absorbed slot is
//! vacated forever. A union-find indirection table with path compression
//! keeps every historical [`NodeId`] resolving to the current survivor, so
//! callers may hold ids across merges as long as they re-resolve.
//!
//! Edge sets are set-semantic in both directions: inserting an existing
//! edge is a no-op, and the in-edge mirror makes combine's rewiring local
//! to the merged node's neighborhood.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::edge_label::{EdgeLabel, LabelId, LabelRegistry};
use crate::shared::models::ValueId;

/// Handle for a graph node. Stays valid across merges; resolve through
/// [`AliasGraph::find`] before trusting it to be a representative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// One equivalence class: member values plus labeled adjacency
#[derive(Debug, Clone, Default)]
struct GraphNode {
    values: FxHashSet<ValueId>,
    out: FxHashMap<LabelId, FxHashSet<NodeId>>,
    inn: FxHashMap<LabelId, FxHashSet<NodeId>>,
}

impl GraphNode {
    /// Cost of moving this node's state during a merge. The heavier side
    /// survives so combine touches the smaller neighborhood.
    fn merge_weight(&self) -> usize {
        let out_deg: usize = self.out.values().map(|s| s.len()).sum();
        let in_deg: usize = self.inn.values().map(|s| s.len()).sum();
        out_deg + in_deg + self.values.len()
    }
}

/// Construction counters for the graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes_created: usize,
    pub nodes_merged: usize,
    pub edges_added: usize,
}

/// The alias graph
#[derive(Debug, Clone)]
pub struct AliasGraph {
    /// Arena slot per minted id; absorbed slots are emptied and never reused
    nodes: Vec<GraphNode>,
    /// Representative indirection (self-loop = live representative)
    parent: Vec<u32>,
    /// Value membership index, lazily re-pointed at representatives
    value_node: FxHashMap<ValueId, NodeId>,
    labels: LabelRegistry,
    stats: GraphStats,
}

impl AliasGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            parent: Vec::new(),
            value_node: FxHashMap::default(),
            labels: LabelRegistry::new(),
            stats: GraphStats::default(),
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Labels
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    #[inline]
    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    /// The dereference label
    #[inline]
    pub fn deref_label(&self) -> LabelId {
        self.labels.deref()
    }

    /// Intern a field-offset label
    #[inline]
    pub fn field_label(&mut self, offset: u32) -> LabelId {
        self.labels.field(offset)
    }

    /// Intern an array-index label
    #[inline]
    pub fn index_label(&mut self, index: u64) -> LabelId {
        self.labels.index(index)
    }

    /// Intern an arbitrary label
    #[inline]
    pub fn intern_label(&mut self, label: EdgeLabel) -> LabelId {
        self.labels.intern(label)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Nodes and resolution
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GraphNode::default());
        self.parent.push(id.0);
        self.stats.nodes_created += 1;
        id
    }

    /// Retrieve the node owning `value`, creating a fresh class when the
    /// value has never been seen. Idempotent.
    pub fn node_of(&mut self, value: ValueId) -> NodeId {
        if let Some(&n) = self.value_node.get(&value) {
            let rep = self.find(n);
            if rep != n {
                self.value_node.insert(value, rep);
            }
            return rep;
        }
        let id = self.alloc();
        self.nodes[id.0 as usize].values.insert(value);
        self.value_node.insert(value, id);
        id
    }

    /// Mint a node owning no value at all. Always fresh: anonymous nodes
    /// stand for unnamed storage such as materialized pointees.
    pub fn anonymous_node(&mut self) -> NodeId {
        self.alloc()
    }

    /// Node owning `value`, if the value has been seen
    pub fn lookup(&self, value: ValueId) -> Option<NodeId> {
        self.value_node.get(&value).map(|&n| self.find_readonly(n))
    }

    /// Resolve to the current representative with path compression
    #[inline]
    pub fn find(&mut self, n: NodeId) -> NodeId {
        let idx = n.0 as usize;
        if self.parent[idx] != n.0 {
            let root = self.find(NodeId(self.parent[idx]));
            self.parent[idx] = root.0;
        }
        NodeId(self.parent[idx])
    }

    /// Resolve without path compression (for read-only access)
    #[inline]
    pub fn find_readonly(&self, n: NodeId) -> NodeId {
        let mut current = n.0;
        while self.parent[current as usize] != current {
            current = self.parent[current as usize];
        }
        NodeId(current)
    }

    /// Whether an id currently names a representative
    #[inline]
    pub fn is_representative(&self, n: NodeId) -> bool {
        self.parent[n.0 as usize] == n.0
    }

    /// All live representatives
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.parent.len() as u32)
            .filter(move |&i| self.parent[i as usize] == i)
            .map(NodeId)
    }

    /// Number of live classes
    pub fn node_count(&self) -> usize {
        self.parent
            .iter()
            .enumerate()
            .filter(|(i, &p)| *i as u32 == p)
            .count()
    }

    /// Total ids ever minted, absorbed ones included
    #[inline]
    pub fn minted_count(&self) -> usize {
        self.nodes.len()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Edges
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Insert a labeled edge between the classes of `src` and `dst`.
    /// Returns false when the edge already existed.
    pub fn add_edge(&mut self, src: NodeId, label: LabelId, dst: NodeId) -> bool {
        let s = self.find(src);
        let d = self.find(dst);
        let added = self.nodes[s.0 as usize]
            .out
            .entry(label)
            .or_default()
            .insert(d);
        if added {
            self.nodes[d.0 as usize]
                .inn
                .entry(label)
                .or_default()
                .insert(s);
            self.stats.edges_added += 1;
        }
        added
    }

    /// One target of `node` under `label`, when any exists. Which target
    /// comes back is unspecified while the class invariant is violated;
    /// after unification there is at most one.
    pub fn first_target(&self, node: NodeId, label: LabelId) -> Option<NodeId> {
        let n = self.find_readonly(node);
        self.nodes[n.0 as usize]
            .out
            .get(&label)
            .and_then(|s| s.iter().next().copied())
    }

    /// All current targets of `node` under `label`
    pub fn targets(&self, node: NodeId, label: LabelId) -> Vec<NodeId> {
        let n = self.find_readonly(node);
        match self.nodes[n.0 as usize].out.get(&label) {
            Some(s) => s.iter().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Labeled out-adjacency of a class
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = (LabelId, &FxHashSet<NodeId>)> + '_ {
        let n = self.find_readonly(node);
        self.nodes[n.0 as usize].out.iter().map(|(l, s)| (*l, s))
    }

    /// Labels under which a class currently has more than one target
    pub fn multi_target_labels(&self, node: NodeId) -> Vec<LabelId> {
        let n = self.find_readonly(node);
        self.nodes[n.0 as usize]
            .out
            .iter()
            .filter(|(_, s)| s.len() > 1)
            .map(|(l, _)| *l)
            .collect()
    }

    /// Live edge count (set semantics, self-loops included)
    pub fn edge_count(&self) -> usize {
        self.live_nodes()
            .map(|n| {
                self.nodes[n.0 as usize]
                    .out
                    .values()
                    .map(|s| s.len())
                    .sum::<usize>()
            })
            .sum()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Combine
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Merge the classes of `x` and `y`. The heavier class survives (ties
    /// keep `x`); the other slot is vacated and forwards to the survivor
    /// forever. Returns the survivor. Merging a class with itself is a
    /// no-op.
    pub fn combine(&mut self, x: NodeId, y: NodeId) -> NodeId {
        let x = self.find(x);
        let y = self.find(y);
        if x == y {
            return x;
        }
        let wx = self.nodes[x.0 as usize].merge_weight();
        let wy = self.nodes[y.0 as usize].merge_weight();
        let (survivor, absorbed) = if wy > wx { (y, x) } else { (x, y) };

        let old = std::mem::take(&mut self.nodes[absorbed.0 as usize]);
        // Forward first so re-resolution inside the rewiring sees the survivor
        self.parent[absorbed.0 as usize] = survivor.0;

        // Out-edges: absorbed -l-> t becomes survivor -l-> t
        for (label, targets) in old.out {
            for t in targets {
                let t = if t == absorbed { survivor } else { t };
                if let Some(set) = self.nodes[t.0 as usize].inn.get_mut(&label) {
                    set.remove(&absorbed);
                }
                self.nodes[survivor.0 as usize]
                    .out
                    .entry(label)
                    .or_default()
                    .insert(t);
                self.nodes[t.0 as usize]
                    .inn
                    .entry(label)
                    .or_default()
                    .insert(survivor);
            }
        }

        // In-edges: s -l-> absorbed becomes s -l-> survivor
        for (label, sources) in old.inn {
            for s in sources {
                if s == absorbed {
                    // Self-loop, already rewired through the out pass
                    continue;
                }
                if let Some(set) = self.nodes[s.0 as usize].out.get_mut(&label) {
                    set.remove(&absorbed);
                    set.insert(survivor);
                }
                self.nodes[survivor.0 as usize]
                    .inn
                    .entry(label)
                    .or_default()
                    .insert(s);
            }
        }

        self.nodes[survivor.0 as usize].values.extend(old.values);
        self.stats.nodes_merged += 1;
        survivor
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Queries
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Member values of a class
    pub fn values_of(&self, node: NodeId) -> &FxHashSet<ValueId> {
        let n = self.find_readonly(node);
        &self.nodes[n.0 as usize].values
    }

    /// Every class reachable from the seeds over out-edges of any label,
    /// seeds included
    pub fn reachable_from(&self, seeds: &[NodeId]) -> FxHashSet<NodeId> {
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for &s in seeds {
            let s = self.find_readonly(s);
            if visited.insert(s) {
                queue.push_back(s);
            }
        }
        while let Some(n) = queue.pop_front() {
            for set in self.nodes[n.0 as usize].out.values() {
                for &t in set {
                    if visited.insert(t) {
                        queue.push_back(t);
                    }
                }
            }
        }
        visited
    }

    /// Point every minted id and value entry straight at its representative.
    /// Run once after the last merge; read-only resolution is then one hop.
    pub fn compress_all(&mut self) {
        for i in 0..self.parent.len() as u32 {
            self.find(NodeId(i));
        }
        for n in self.value_node.values_mut() {
            *n = NodeId(self.parent[n.0 as usize]);
        }
    }

    #[inline]
    pub fn stats(&self) -> &GraphStats {
        &self.stats
    }
}

impl Default for AliasGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AliasGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AliasGraph: {} live classes ({} minted, {} merged), {} edges",
            self.node_count(),
            self.minted_count(),
            self.stats.nodes_merged,
            self.edge_count()
        )
    }
}
