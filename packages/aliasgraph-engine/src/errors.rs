//! Error types for aliasgraph-engine
//!
//! Provides unified error handling across the crate. Constraint generation
//! and call resolution refuse to guess: a construct the engine cannot model
//! soundly surfaces here instead of being silently dropped.

use thiserror::Error;

/// Main error type for alias analysis operations
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Indirect call through a value whose type is not pointer-to-function
    #[error("malformed call site: {0}")]
    MalformedCallSite(String),

    /// Field access outside the bounds of a known struct layout
    #[error("field index {index} out of bounds for struct with {field_count} fields")]
    FieldOutOfBounds { index: u32, field_count: usize },

    /// Dangling or ill-formed reference in the input program
    #[error("invalid program: {0}")]
    InvalidProgram(String),

    /// Internal invariant violation (a bug in the engine, not the input)
    #[error("invariant violation: {0}")]
    Invariant(String),
}

impl AnalysisError {
    /// Create a malformed-call-site error
    pub fn malformed_call_site(msg: impl Into<String>) -> Self {
        AnalysisError::MalformedCallSite(msg.into())
    }

    /// Create an invalid-program error
    pub fn invalid_program(msg: impl Into<String>) -> Self {
        AnalysisError::InvalidProgram(msg.into())
    }

    /// Create an invariant-violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        AnalysisError::Invariant(msg.into())
    }
}

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
