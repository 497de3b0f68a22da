//! Per-function interprocedural summaries

use crate::shared::models::{FuncId, ValueId};

/// What call binding needs to know about one function
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub func: FuncId,
    /// Formal parameters in declaration order
    pub formals: Vec<ValueId>,
    /// Landing slots for surplus actuals at variadic callees
    pub vararg_slots: Vec<ValueId>,
    /// Values flowing out through return statements
    pub returns: Vec<ValueId>,
    /// Indices into the driver's call-site table
    pub call_sites: Vec<usize>,
}

impl FunctionInfo {
    pub fn new(func: FuncId, formals: Vec<ValueId>, vararg_slots: Vec<ValueId>) -> Self {
        Self {
            func,
            formals,
            vararg_slots,
            returns: Vec::new(),
            call_sites: Vec::new(),
        }
    }
}
