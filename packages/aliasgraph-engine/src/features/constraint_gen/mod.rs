//! # Constraint Generation
//!
//! Single-pass intraprocedural translation of function bodies and global
//! initializers into alias-graph constraints. Each instruction kind has a
//! fixed contract; call sites are recorded for the interprocedural driver
//! but never bound here. Recognized body-less library routines get
//! hand-written alias rules from the contract table.

pub mod builder;
pub mod intrinsics;

pub use builder::{ConstraintBuilder, GenOutput, GenStats};
pub use intrinsics::{contract_for, LibraryContract};
