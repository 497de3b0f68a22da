//! # Alias Graph
//!
//! Labeled multigraph over program values with on-the-fly unification.
//! Nodes are equivalence classes of values; labeled edges record points-to
//! facts (`d` for dereference) and location derivations (`f<k>` for struct
//! fields, `i<k>` for array slots). Merging two nodes with [`AliasGraph::combine`]
//! is irreversible: every historical node id keeps resolving to the survivor
//! through a union-find indirection table.
//!
//! The [`Unifier`] restores the class invariant after constraint insertion:
//! at fixpoint every node has at most one out-edge per label, so mutually
//! stored values end up in the same class.
//!
//! ## Academic References
//! - Steensgaard, B. "Points-to Analysis in Almost Linear Time" (POPL 1996)
//! - Zhang et al. "Fast Algorithms for Dyck-CFL-Reachability with
//!   Applications to Alias Analysis" (PLDI 2013)
//! - Tarjan, R. E. "Efficiency of a Good But Not Linear Set Union Algorithm" (1975)

pub mod domain;
pub mod infrastructure;

pub use domain::edge_label::{EdgeLabel, LabelId, LabelRegistry};
pub use domain::graph::{AliasGraph, GraphStats, NodeId};
pub use infrastructure::unifier::{Unifier, UnifierStats};
