//! # Call Graph
//!
//! Call-site bookkeeping and function-type compatibility grouping for
//! indirect-call resolution, plus a petgraph export of the resolved graph
//! for downstream graph algorithms.

pub mod call_site;
pub mod export;
pub mod function_info;
pub mod type_groups;

pub use call_site::CallSite;
pub use export::{build_call_graph, recursion_groups};
pub use function_info::FunctionInfo;
pub use type_groups::{FunctionTypeGroups, TypeStrictness};
