/*
 * Aliasgraph Engine - Unification-Based Alias Analysis
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (types, values, functions, instructions)
 * - features/    : Vertical slices (alias_graph -> constraint_gen -> call_graph -> interprocedural)
 *
 * The engine builds a labeled graph over program values, keeps it unified
 * under a one-target-per-label class invariant, and alternates unification
 * with call resolution until the whole program reaches a fixpoint. Queries
 * run against a frozen, thread-shareable results value.
 */

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models: the analyzed program representation
pub mod shared;

/// Feature modules (graph → constraints → calls → fixpoint)
pub mod features;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use errors::{AnalysisError, Result};

pub use shared::models::{
    CallTarget, Constant, FuncId, Function, Instruction, Program, ProgramBuilder, TypeId,
    TypeKind, TypeTable, Value, ValueId, ValueKind,
};

pub use features::alias_graph::{AliasGraph, EdgeLabel, LabelId, NodeId};
pub use features::call_graph::TypeStrictness;
pub use features::interprocedural::{
    AliasAnalyzer, AliasRelation, AliasResults, AnalysisConfig, AnalysisStats, ResultsSnapshot,
};
