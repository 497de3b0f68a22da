//! Interprocedural analysis: round driver, entry point, frozen results
//!
//! The driver alternates graph unification with call-edge discovery. Direct
//! calls bind once; indirect calls gain candidates as function addresses
//! flow into their callee class, and every new binding can trigger further
//! unification, so the phases repeat until a full round changes nothing.

pub mod analyzer;
pub mod driver;
pub mod results;

pub use analyzer::{AliasAnalyzer, AnalysisConfig};
pub use driver::FixpointDriver;
pub use results::{AliasRelation, AliasResults, AnalysisStats, ResultsSnapshot};
