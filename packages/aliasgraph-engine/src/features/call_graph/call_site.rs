//! Call-site records

use rustc_hash::FxHashSet;

use crate::shared::models::{CallTarget, FuncId, ValueId};

/// One call instruction, tracked across resolution rounds
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Function containing the call
    pub caller: FuncId,
    pub target: CallTarget,
    /// Actual arguments in source order
    pub args: Vec<ValueId>,
    /// Value receiving the return, when the caller uses it
    pub result: Option<ValueId>,
    /// Callees resolved so far. Grows monotonically; candidates are never
    /// withdrawn once bound.
    pub resolved: FxHashSet<FuncId>,
    /// Set once the statically known callee has been bound
    pub bound: bool,
}

impl CallSite {
    pub fn direct(caller: FuncId, callee: FuncId, args: Vec<ValueId>, result: Option<ValueId>) -> Self {
        Self {
            caller,
            target: CallTarget::Direct(callee),
            args,
            result,
            resolved: FxHashSet::default(),
            bound: false,
        }
    }

    pub fn indirect(
        caller: FuncId,
        callee: ValueId,
        args: Vec<ValueId>,
        result: Option<ValueId>,
    ) -> Self {
        Self {
            caller,
            target: CallTarget::Indirect(callee),
            args,
            result,
            resolved: FxHashSet::default(),
            bound: false,
        }
    }

    #[inline]
    pub fn is_indirect(&self) -> bool {
        matches!(self.target, CallTarget::Indirect(_))
    }

    /// The function-pointer value for an indirect site
    #[inline]
    pub fn callee_value(&self) -> Option<ValueId> {
        match self.target {
            CallTarget::Indirect(v) => Some(v),
            CallTarget::Direct(_) => None,
        }
    }
}
