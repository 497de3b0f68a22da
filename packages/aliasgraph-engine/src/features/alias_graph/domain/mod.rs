//! Domain models for the alias graph

pub mod edge_label;
pub mod graph;
