//! Shared models
//!
//! The closed intermediate representation the engine consumes. A frontend
//! lowers its compiler IR into these types through [`ProgramBuilder`]; the
//! analysis itself never parses program text.

mod builder;
mod function;
mod instruction;
mod program;
mod types;
mod value;

pub use builder::ProgramBuilder;
pub use function::{FuncId, Function};
pub use instruction::{CallTarget, Instruction};
pub use program::Program;
pub use types::{TypeId, TypeKind, TypeTable};
pub use value::{Constant, Value, ValueId, ValueKind};
