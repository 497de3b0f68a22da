//! Feature modules (vertical slices)

pub mod alias_graph;
pub mod call_graph;
pub mod constraint_gen;
pub mod interprocedural;
