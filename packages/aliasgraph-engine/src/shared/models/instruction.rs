//! Instruction set
//!
//! The closed set of operations the engine models. A frontend must lower
//! every pointer-relevant construct onto one of these kinds; plain
//! arithmetic and control flow carry no alias information and are simply
//! not represented. Because the enum is closed and matched exhaustively,
//! "instruction the analysis does not understand" is unrepresentable.

use serde::{Deserialize, Serialize};

use super::function::FuncId;
use super::value::ValueId;

/// Callee of a call instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallTarget {
    /// Statically known callee
    Direct(FuncId),
    /// Call through a function-pointer value
    Indirect(ValueId),
}

/// One lowered instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// `result = operand`; covers copies and all casts, including
    /// pointer-to-pointer and function-pointer casts
    Assign { result: ValueId, operand: ValueId },
    /// SSA merge of the operands
    Phi {
        result: ValueId,
        operands: Vec<ValueId>,
    },
    /// `result = cond ? if_true : if_false`
    Select {
        result: ValueId,
        cond: ValueId,
        if_true: ValueId,
        if_false: ValueId,
    },
    /// `result = *addr`
    Load { result: ValueId, addr: ValueId },
    /// `*addr = value`
    Store { addr: ValueId, value: ValueId },
    /// `result = &base->field` with a compile-time field index
    FieldAddr {
        result: ValueId,
        base: ValueId,
        field: u32,
    },
    /// `result = &base[index]`; the index is an arbitrary value
    IndexAddr {
        result: ValueId,
        base: ValueId,
        index: ValueId,
    },
    /// By-value extraction out of an aggregate register
    ExtractValue { result: ValueId, aggregate: ValueId },
    /// By-value update of an aggregate register
    InsertValue {
        result: ValueId,
        aggregate: ValueId,
        element: ValueId,
    },
    /// Atomic read-modify-write: `result = *addr; *addr = op(result, operand)`
    AtomicRmw {
        result: ValueId,
        addr: ValueId,
        operand: ValueId,
    },
    /// Function call
    Call {
        result: Option<ValueId>,
        target: CallTarget,
        args: Vec<ValueId>,
    },
    /// Return from the enclosing function
    Return { value: Option<ValueId> },
}
