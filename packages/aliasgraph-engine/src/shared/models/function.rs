//! Function records

use serde::{Deserialize, Serialize};

use super::instruction::Instruction;
use super::types::TypeId;
use super::value::ValueId;

/// Arena handle for a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncId(pub u32);

/// A function in the program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub id: FuncId,
    pub name: String,
    /// The `Function` signature type (not the pointer to it)
    pub ty: TypeId,
    /// The address value minted for this function
    pub value: ValueId,
    /// Formal parameters in declaration order
    pub params: Vec<ValueId>,
    /// Landing slots for surplus actuals at variadic functions, in the
    /// order the body consumes them
    pub vararg_slots: Vec<ValueId>,
    pub body: Vec<Instruction>,
    /// False for declarations whose body lives outside the program
    pub is_definition: bool,
}

impl Function {
    /// Number of declared formal parameters
    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}
