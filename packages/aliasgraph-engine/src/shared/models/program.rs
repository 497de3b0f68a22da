//! Whole-program container
//!
//! Immutable once built; the analysis borrows it read-only for its entire
//! run. Construct through [`super::ProgramBuilder`], which validates every
//! cross-reference so the engine can index without re-checking.

use super::function::{FuncId, Function};
use super::types::TypeTable;
use super::value::{Value, ValueId};

/// A validated whole program
#[derive(Debug, Clone)]
pub struct Program {
    pub(super) types: TypeTable,
    pub(super) values: Vec<Value>,
    pub(super) functions: Vec<Function>,
    pub(super) globals: Vec<ValueId>,
}

impl Program {
    /// Type table for this program
    #[inline]
    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Value record behind an id
    #[inline]
    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.0 as usize]
    }

    /// All values in arena order
    #[inline]
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Total number of values ever minted
    #[inline]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Function record behind an id
    #[inline]
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.0 as usize]
    }

    /// All functions in arena order
    #[inline]
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Number of functions, declarations included
    #[inline]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Module-level variables in declaration order
    #[inline]
    pub fn globals(&self) -> &[ValueId] {
        &self.globals
    }
}
