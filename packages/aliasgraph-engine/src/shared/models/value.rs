//! Program values
//!
//! Every operand the analysis can see is a [`Value`] in a flat arena indexed
//! by [`ValueId`]. Identity is the id, never the content: two structurally
//! equal constants are still distinct values if minted twice.

use serde::{Deserialize, Serialize};

use super::function::FuncId;
use super::types::TypeId;

/// Arena handle for a program value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// A value in the program arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub id: ValueId,
    /// Source-level name, kept for diagnostics only
    pub name: Option<String>,
    pub ty: TypeId,
    pub kind: ValueKind,
}

/// What a value denotes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Function-scoped register: formal parameter, var-arg slot, or
    /// instruction result
    Local,
    /// Module-level variable. The value itself denotes the address; the
    /// stored content is the pointee.
    Global { initializer: Option<ValueId> },
    /// The address of a named function
    Function { func: FuncId },
    /// Literal constant
    Constant(Constant),
}

/// Literal constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Int(i64),
    /// Raw IEEE bits, so equality stays well defined
    Float(u64),
    /// Null pointer
    Null,
    /// Uninitialized or poison value
    Undef,
    /// Aggregate literal over other values (struct or array initializer)
    Aggregate(Vec<ValueId>),
}

impl Value {
    /// Constant integer payload, when this value is one
    #[inline]
    pub fn as_const_int(&self) -> Option<i64> {
        match &self.kind {
            ValueKind::Constant(Constant::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Function id when this value is a function address
    #[inline]
    pub fn as_function(&self) -> Option<FuncId> {
        match &self.kind {
            ValueKind::Function { func } => Some(*func),
            _ => None,
        }
    }

    /// Diagnostic label: the source name when present, else the arena index
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(n) => n.clone(),
            None => format!("v{}", self.id.0),
        }
    }
}
