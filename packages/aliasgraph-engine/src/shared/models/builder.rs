//! Program construction
//!
//! [`ProgramBuilder`] is the only way to obtain a [`Program`]. It mints ids,
//! keeps the value arena dense, and validates every cross-reference in
//! [`ProgramBuilder::build`] so downstream passes can index unchecked.

use crate::errors::{AnalysisError, Result};

use super::function::{FuncId, Function};
use super::instruction::{CallTarget, Instruction};
use super::program::Program;
use super::types::{TypeId, TypeKind, TypeTable};
use super::value::{Constant, Value, ValueId, ValueKind};

/// Incremental builder for a [`Program`]
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    types: TypeTable,
    values: Vec<Value>,
    functions: Vec<Function>,
    globals: Vec<ValueId>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Types
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub fn ty_int(&mut self, bits: u32) -> TypeId {
        self.types.intern(TypeKind::Int { bits })
    }

    pub fn ty_float(&mut self, bits: u32) -> TypeId {
        self.types.intern(TypeKind::Float { bits })
    }

    pub fn ty_ptr(&mut self, pointee: TypeId) -> TypeId {
        self.types.intern(TypeKind::Pointer { pointee })
    }

    pub fn ty_struct(&mut self, fields: Vec<TypeId>) -> TypeId {
        self.types.intern(TypeKind::Struct { fields })
    }

    pub fn ty_array(&mut self, element: TypeId, len: u64) -> TypeId {
        self.types.intern(TypeKind::Array { element, len })
    }

    pub fn ty_vector(&mut self, element: TypeId, lanes: u64) -> TypeId {
        self.types.intern(TypeKind::Vector { element, lanes })
    }

    pub fn ty_func(&mut self, params: Vec<TypeId>, ret: TypeId, varargs: bool) -> TypeId {
        self.types.intern(TypeKind::Function {
            params,
            ret,
            varargs,
        })
    }

    pub fn ty_void(&mut self) -> TypeId {
        self.types.intern(TypeKind::Void)
    }

    pub fn ty_opaque(&mut self) -> TypeId {
        self.types.intern(TypeKind::Opaque)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Values
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn mint(&mut self, name: Option<String>, ty: TypeId, kind: ValueKind) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(Value { id, name, ty, kind });
        id
    }

    /// Declare a module-level variable. `pointee_ty` is the stored type;
    /// the returned value denotes the address and is pointer-typed.
    pub fn add_global(&mut self, name: impl Into<String>, pointee_ty: TypeId) -> ValueId {
        let ty = self.ty_ptr(pointee_ty);
        let id = self.mint(
            Some(name.into()),
            ty,
            ValueKind::Global { initializer: None },
        );
        self.globals.push(id);
        id
    }

    /// Attach an initializer to a previously declared global
    pub fn set_initializer(&mut self, global: ValueId, value: ValueId) -> Result<()> {
        let slot = self
            .values
            .get_mut(global.0 as usize)
            .ok_or_else(|| AnalysisError::invalid_program("initializer on unknown value"))?;
        match &mut slot.kind {
            ValueKind::Global { initializer } => {
                *initializer = Some(value);
                Ok(())
            }
            _ => Err(AnalysisError::invalid_program(format!(
                "initializer on non-global value {}",
                slot.display_name()
            ))),
        }
    }

    pub fn const_int(&mut self, ty: TypeId, v: i64) -> ValueId {
        self.mint(None, ty, ValueKind::Constant(Constant::Int(v)))
    }

    pub fn const_float(&mut self, ty: TypeId, bits: u64) -> ValueId {
        self.mint(None, ty, ValueKind::Constant(Constant::Float(bits)))
    }

    pub fn const_null(&mut self, ty: TypeId) -> ValueId {
        self.mint(None, ty, ValueKind::Constant(Constant::Null))
    }

    pub fn const_undef(&mut self, ty: TypeId) -> ValueId {
        self.mint(None, ty, ValueKind::Constant(Constant::Undef))
    }

    /// Aggregate literal over already-minted element values
    pub fn const_aggregate(&mut self, ty: TypeId, elements: Vec<ValueId>) -> ValueId {
        self.mint(None, ty, ValueKind::Constant(Constant::Aggregate(elements)))
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Functions
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Declare a function. `ty` must be a `Function` type. Also mints the
    /// function's address value (pointer-typed).
    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        ty: TypeId,
        is_definition: bool,
    ) -> Result<FuncId> {
        let name = name.into();
        if !matches!(self.types.kind(ty), TypeKind::Function { .. }) {
            return Err(AnalysisError::invalid_program(format!(
                "function {} declared with non-function type",
                name
            )));
        }
        let id = FuncId(self.functions.len() as u32);
        let addr_ty = self.ty_ptr(ty);
        let value = self.mint(
            Some(name.clone()),
            addr_ty,
            ValueKind::Function { func: id },
        );
        self.functions.push(Function {
            id,
            name,
            ty,
            value,
            params: Vec::new(),
            vararg_slots: Vec::new(),
            body: Vec::new(),
            is_definition,
        });
        Ok(id)
    }

    /// Address value minted for a function
    pub fn function_value(&self, func: FuncId) -> Option<ValueId> {
        self.functions.get(func.0 as usize).map(|f| f.value)
    }

    fn function_mut(&mut self, func: FuncId) -> Result<&mut Function> {
        let n = self.functions.len();
        self.functions
            .get_mut(func.0 as usize)
            .ok_or_else(|| {
                AnalysisError::invalid_program(format!(
                    "function id {} out of range ({} declared)",
                    func.0, n
                ))
            })
    }

    /// Append a formal parameter to a function
    pub fn add_param(&mut self, func: FuncId, ty: TypeId) -> Result<ValueId> {
        self.function_mut(func)?;
        let id = self.mint(None, ty, ValueKind::Local);
        self.function_mut(func)?.params.push(id);
        Ok(id)
    }

    /// Append a var-arg landing slot to a variadic function
    pub fn add_vararg_slot(&mut self, func: FuncId, ty: TypeId) -> Result<ValueId> {
        self.function_mut(func)?;
        let id = self.mint(None, ty, ValueKind::Local);
        self.function_mut(func)?.vararg_slots.push(id);
        Ok(id)
    }

    /// Mint a function-scoped register
    pub fn add_local(&mut self, func: FuncId, ty: TypeId) -> Result<ValueId> {
        self.function_mut(func)?;
        Ok(self.mint(None, ty, ValueKind::Local))
    }

    /// Mint a function-scoped register with a diagnostic name
    pub fn add_named_local(
        &mut self,
        func: FuncId,
        name: impl Into<String>,
        ty: TypeId,
    ) -> Result<ValueId> {
        self.function_mut(func)?;
        Ok(self.mint(Some(name.into()), ty, ValueKind::Local))
    }

    /// Append an instruction to a function body
    pub fn push(&mut self, func: FuncId, inst: Instruction) -> Result<()> {
        self.function_mut(func)?.body.push(inst);
        Ok(())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Validation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn check_value(&self, id: ValueId, ctx: &str) -> Result<()> {
        if (id.0 as usize) < self.values.len() {
            Ok(())
        } else {
            Err(AnalysisError::invalid_program(format!(
                "dangling value id {} in {}",
                id.0, ctx
            )))
        }
    }

    fn check_func(&self, id: FuncId, ctx: &str) -> Result<()> {
        if (id.0 as usize) < self.functions.len() {
            Ok(())
        } else {
            Err(AnalysisError::invalid_program(format!(
                "dangling function id {} in {}",
                id.0, ctx
            )))
        }
    }

    fn check_instruction(&self, inst: &Instruction, ctx: &str) -> Result<()> {
        match inst {
            Instruction::Assign { result, operand } => {
                self.check_value(*result, ctx)?;
                self.check_value(*operand, ctx)
            }
            Instruction::Phi { result, operands } => {
                self.check_value(*result, ctx)?;
                for op in operands {
                    self.check_value(*op, ctx)?;
                }
                Ok(())
            }
            Instruction::Select {
                result,
                cond,
                if_true,
                if_false,
            } => {
                self.check_value(*result, ctx)?;
                self.check_value(*cond, ctx)?;
                self.check_value(*if_true, ctx)?;
                self.check_value(*if_false, ctx)
            }
            Instruction::Load { result, addr } => {
                self.check_value(*result, ctx)?;
                self.check_value(*addr, ctx)
            }
            Instruction::Store { addr, value } => {
                self.check_value(*addr, ctx)?;
                self.check_value(*value, ctx)
            }
            Instruction::FieldAddr { result, base, .. } => {
                self.check_value(*result, ctx)?;
                self.check_value(*base, ctx)
            }
            Instruction::IndexAddr {
                result,
                base,
                index,
            } => {
                self.check_value(*result, ctx)?;
                self.check_value(*base, ctx)?;
                self.check_value(*index, ctx)
            }
            Instruction::ExtractValue { result, aggregate } => {
                self.check_value(*result, ctx)?;
                self.check_value(*aggregate, ctx)
            }
            Instruction::InsertValue {
                result,
                aggregate,
                element,
            } => {
                self.check_value(*result, ctx)?;
                self.check_value(*aggregate, ctx)?;
                self.check_value(*element, ctx)
            }
            Instruction::AtomicRmw {
                result,
                addr,
                operand,
            } => {
                self.check_value(*result, ctx)?;
                self.check_value(*addr, ctx)?;
                self.check_value(*operand, ctx)
            }
            Instruction::Call {
                result,
                target,
                args,
            } => {
                if let Some(r) = result {
                    self.check_value(*r, ctx)?;
                }
                match target {
                    CallTarget::Direct(f) => self.check_func(*f, ctx)?,
                    CallTarget::Indirect(v) => self.check_value(*v, ctx)?,
                }
                for a in args {
                    self.check_value(*a, ctx)?;
                }
                Ok(())
            }
            Instruction::Return { value } => {
                if let Some(v) = value {
                    self.check_value(*v, ctx)?;
                }
                Ok(())
            }
        }
    }

    /// Validate all cross-references and freeze the program
    pub fn build(self) -> Result<Program> {
        for f in &self.functions {
            let ctx = format!("function {}", f.name);
            let (param_tys, varargs) = match self.types.kind(f.ty) {
                TypeKind::Function {
                    params, varargs, ..
                } => (params.clone(), *varargs),
                _ => {
                    return Err(AnalysisError::invariant(format!(
                        "{} lost its function type",
                        ctx
                    )))
                }
            };
            if f.params.len() != param_tys.len() {
                return Err(AnalysisError::invalid_program(format!(
                    "{} declares {} parameters but its type has {}",
                    ctx,
                    f.params.len(),
                    param_tys.len()
                )));
            }
            for (p, want) in f.params.iter().zip(&param_tys) {
                self.check_value(*p, &ctx)?;
                let got = self.values[p.0 as usize].ty;
                if got != *want {
                    return Err(AnalysisError::invalid_program(format!(
                        "{}: parameter type does not match signature",
                        ctx
                    )));
                }
            }
            if !varargs && !f.vararg_slots.is_empty() {
                return Err(AnalysisError::invalid_program(format!(
                    "{} has var-arg slots but is not variadic",
                    ctx
                )));
            }
            for s in &f.vararg_slots {
                self.check_value(*s, &ctx)?;
            }
            if !f.is_definition && !f.body.is_empty() {
                return Err(AnalysisError::invalid_program(format!(
                    "{} is a declaration but has a body",
                    ctx
                )));
            }
            for inst in &f.body {
                self.check_instruction(inst, &ctx)?;
            }
        }
        for v in &self.values {
            match &v.kind {
                ValueKind::Global { initializer } => {
                    if let Some(init) = initializer {
                        self.check_value(*init, "global initializer")?;
                    }
                }
                ValueKind::Constant(Constant::Aggregate(elems)) => {
                    for e in elems {
                        self.check_value(*e, "aggregate constant")?;
                    }
                }
                _ => {}
            }
        }
        Ok(Program {
            types: self.types,
            values: self.values,
            functions: self.functions,
            globals: self.globals,
        })
    }
}
