//! Intraprocedural constraint builder
//!
//! Walks every function body once, in any order; forward references resolve
//! through value-node retrieval. Loads and stores keep a local form of the
//! class invariant: when the address already has a pointee class, the moved
//! value joins it instead of becoming a second dereference target, which
//! keeps the later unification worklist short.
//!
//! The builder refuses to guess. An indirect call through a value that is
//! not function-pointer typed, or a field index outside a known struct
//! layout, aborts the analysis instead of silently dropping a constraint.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{AnalysisError, Result};
use crate::features::alias_graph::{AliasGraph, NodeId};
use crate::features::call_graph::{CallSite, FunctionInfo};
use crate::shared::models::{
    CallTarget, Constant, FuncId, Instruction, Program, TypeId, TypeKind, ValueId, ValueKind,
};

use super::intrinsics::{contract_for, LibraryContract};

/// Counters for one generation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenStats {
    pub functions_processed: usize,
    pub instructions_translated: usize,
    pub direct_call_sites: usize,
    pub indirect_call_sites: usize,
    pub contracts_applied: usize,
    pub globals_initialized: usize,
}

/// Everything the interprocedural driver needs from generation
#[derive(Debug)]
pub struct GenOutput {
    pub graph: AliasGraph,
    pub sites: Vec<CallSite>,
    pub infos: Vec<FunctionInfo>,
    /// Functions whose address escapes into data flow
    pub address_taken: FxHashSet<FuncId>,
    /// Observed function-pointer casts, as (source, destination) signature
    /// types, for compatibility-group coarsening
    pub fn_ptr_casts: Vec<(TypeId, TypeId)>,
    pub stats: GenStats,
}

/// Single-pass translator from the instruction set to graph constraints
pub struct ConstraintBuilder<'p> {
    program: &'p Program,
    graph: AliasGraph,
    sites: Vec<CallSite>,
    infos: Vec<FunctionInfo>,
    address_taken: FxHashSet<FuncId>,
    fn_ptr_casts: Vec<(TypeId, TypeId)>,
    stats: GenStats,
}

impl<'p> ConstraintBuilder<'p> {
    pub fn new(program: &'p Program) -> Self {
        let infos = program
            .functions()
            .map(|f| FunctionInfo::new(f.id, f.params.clone(), f.vararg_slots.clone()))
            .collect();
        Self {
            program,
            graph: AliasGraph::new(),
            sites: Vec::new(),
            infos,
            address_taken: FxHashSet::default(),
            fn_ptr_casts: Vec::new(),
            stats: GenStats::default(),
        }
    }

    /// Translate the whole program
    pub fn run(mut self) -> Result<GenOutput> {
        for &g in self.program.globals() {
            self.init_global(g);
        }
        let func_ids: Vec<FuncId> = self.program.functions().map(|f| f.id).collect();
        for f in func_ids {
            if !self.program.function(f).is_definition {
                continue;
            }
            self.stats.functions_processed += 1;
            // The body is cloned so instruction translation can borrow the
            // builder mutably; bodies are flat and cheap relative to the pass.
            let body = self.program.function(f).body.clone();
            for inst in &body {
                self.translate(f, inst)?;
            }
        }
        debug!(
            functions = self.stats.functions_processed,
            instructions = self.stats.instructions_translated,
            direct = self.stats.direct_call_sites,
            indirect = self.stats.indirect_call_sites,
            "constraint generation complete"
        );
        Ok(GenOutput {
            graph: self.graph,
            sites: self.sites,
            infos: self.infos,
            address_taken: self.address_taken,
            fn_ptr_casts: self.fn_ptr_casts,
            stats: self.stats,
        })
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Graph helpers
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Fetch the node of a value, noting escaped function addresses
    fn touch(&mut self, v: ValueId) -> NodeId {
        if let Some(f) = self.program.value(v).as_function() {
            self.address_taken.insert(f);
        }
        self.graph.node_of(v)
    }

    fn combine_values(&mut self, a: ValueId, b: ValueId) {
        let na = self.touch(a);
        let nb = self.touch(b);
        self.graph.combine(na, nb);
    }

    /// Make `val` the pointee class of `addr`: join an existing dereference
    /// target when there is one, otherwise add the edge
    fn attach_deref(&mut self, addr: NodeId, val: NodeId) {
        let d = self.graph.deref_label();
        match self.graph.first_target(addr, d) {
            Some(t) => {
                self.graph.combine(t, val);
            }
            None => {
                self.graph.add_edge(addr, d, val);
            }
        }
    }

    /// Pointee class of `addr`, materialized as an anonymous node when the
    /// address has never been dereferenced
    fn ensure_deref_target(&mut self, addr: NodeId) -> NodeId {
        let d = self.graph.deref_label();
        match self.graph.first_target(addr, d) {
            Some(t) => t,
            None => {
                let anon = self.graph.anonymous_node();
                self.graph.add_edge(addr, d, anon);
                anon
            }
        }
    }

    /// Field-address class under `base`, reusing an existing target
    fn field_target_anon(&mut self, base: NodeId, field: u32) -> NodeId {
        let label = self.graph.field_label(field);
        match self.graph.first_target(base, label) {
            Some(t) => t,
            None => {
                let anon = self.graph.anonymous_node();
                self.graph.add_edge(base, label, anon);
                anon
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Instruction translation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn translate(&mut self, caller: FuncId, inst: &Instruction) -> Result<()> {
        self.stats.instructions_translated += 1;
        match inst {
            Instruction::Assign { result, operand } => {
                self.combine_values(*result, *operand);
                self.observe_cast(*result, *operand);
                Ok(())
            }
            Instruction::Phi { result, operands } => {
                for op in operands {
                    self.combine_values(*result, *op);
                }
                Ok(())
            }
            Instruction::Select {
                result,
                if_true,
                if_false,
                ..
            } => {
                self.combine_values(*result, *if_true);
                self.combine_values(*result, *if_false);
                Ok(())
            }
            Instruction::Load { result, addr } => {
                let a = self.touch(*addr);
                let r = self.touch(*result);
                self.attach_deref(a, r);
                Ok(())
            }
            Instruction::Store { addr, value } => {
                let a = self.touch(*addr);
                let v = self.touch(*value);
                self.attach_deref(a, v);
                Ok(())
            }
            Instruction::FieldAddr {
                result,
                base,
                field,
            } => self.field_addr(*result, *base, *field),
            Instruction::IndexAddr {
                result,
                base,
                index,
            } => {
                match self.program.value(*index).as_const_int() {
                    Some(k) if k >= 0 => self.index_addr(*result, *base, k as u64),
                    // Unknown or negative offset: the element address may be
                    // anywhere inside the base, so they share a class
                    _ => {
                        self.combine_values(*result, *base);
                        Ok(())
                    }
                }
            }
            Instruction::ExtractValue { result, aggregate } => {
                self.combine_values(*result, *aggregate);
                Ok(())
            }
            Instruction::InsertValue {
                result,
                aggregate,
                element,
            } => {
                self.combine_values(*result, *aggregate);
                self.combine_values(*result, *element);
                Ok(())
            }
            Instruction::AtomicRmw {
                result,
                addr,
                operand,
            } => {
                let a = self.touch(*addr);
                let r = self.touch(*result);
                self.attach_deref(a, r);
                let o = self.touch(*operand);
                let a = self.graph.find(a);
                self.attach_deref(a, o);
                Ok(())
            }
            Instruction::Call {
                result,
                target,
                args,
            } => self.visit_call(caller, *result, target, args),
            Instruction::Return { value } => {
                if let Some(v) = value {
                    self.touch(*v);
                    self.infos[caller.0 as usize].returns.push(*v);
                }
                Ok(())
            }
        }
    }

    /// Record a cast between two function-pointer types for group merging
    fn observe_cast(&mut self, result: ValueId, operand: ValueId) {
        let rt = self.program.value(result).ty;
        let ot = self.program.value(operand).ty;
        if rt == ot {
            return;
        }
        let types = self.program.types();
        if types.is_function_pointer(rt) && types.is_function_pointer(ot) {
            if let (Some(to_sig), Some(from_sig)) = (types.pointee_of(rt), types.pointee_of(ot)) {
                self.fn_ptr_casts.push((from_sig, to_sig));
            }
        }
    }

    fn field_addr(&mut self, result: ValueId, base: ValueId, field: u32) -> Result<()> {
        let types = self.program.types();
        if let Some(pointee) = types.pointee_of(self.program.value(base).ty) {
            if let TypeKind::Struct { fields } = types.kind(pointee) {
                if field as usize >= fields.len() {
                    return Err(AnalysisError::FieldOutOfBounds {
                        index: field,
                        field_count: fields.len(),
                    });
                }
            }
        }
        let b = self.touch(base);
        let r = self.touch(result);
        let label = self.graph.field_label(field);
        let field_node = match self.graph.first_target(b, label) {
            Some(t) => self.graph.combine(t, r),
            None => {
                self.graph.add_edge(b, label, r);
                r
            }
        };
        // Field pointers get their pointee up front so loads and stores
        // through sibling copies of the same field land in one class
        self.ensure_deref_target(field_node);
        Ok(())
    }

    fn index_addr(&mut self, result: ValueId, base: ValueId, index: u64) -> Result<()> {
        let b = self.touch(base);
        let r = self.touch(result);
        let label = self.graph.index_label(index);
        let slot_node = match self.graph.first_target(b, label) {
            Some(t) => self.graph.combine(t, r),
            None => {
                self.graph.add_edge(b, label, r);
                r
            }
        };
        self.ensure_deref_target(slot_node);
        Ok(())
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Calls
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn visit_call(
        &mut self,
        caller: FuncId,
        result: Option<ValueId>,
        target: &CallTarget,
        args: &[ValueId],
    ) -> Result<()> {
        for &a in args {
            self.touch(a);
        }
        if let Some(r) = result {
            self.touch(r);
        }
        let site = match *target {
            CallTarget::Direct(f) => {
                self.stats.direct_call_sites += 1;
                let callee = self.program.function(f);
                if !callee.is_definition {
                    if let Some(contract) = contract_for(&callee.name) {
                        if args.len() >= contract.min_args() {
                            self.apply_contract(contract, result, args);
                            self.stats.contracts_applied += 1;
                        } else {
                            debug!(
                                callee = %callee.name,
                                args = args.len(),
                                "library contract skipped: too few arguments"
                            );
                        }
                    }
                }
                CallSite::direct(caller, f, args.to_vec(), result)
            }
            CallTarget::Indirect(v) => {
                let ty = self.program.value(v).ty;
                if !self.program.types().is_function_pointer(ty) {
                    return Err(AnalysisError::malformed_call_site(format!(
                        "indirect callee {} is not function-pointer typed",
                        self.program.value(v).display_name()
                    )));
                }
                // The callee value needs a node even when no other
                // instruction mentions it, or resolution never finds
                // its class.
                self.touch(v);
                self.stats.indirect_call_sites += 1;
                CallSite::indirect(caller, v, args.to_vec(), result)
            }
        };
        let idx = self.sites.len();
        self.sites.push(site);
        self.infos[caller.0 as usize].call_sites.push(idx);
        Ok(())
    }

    fn apply_contract(
        &mut self,
        contract: LibraryContract,
        result: Option<ValueId>,
        args: &[ValueId],
    ) {
        match contract {
            LibraryContract::CopiesPointees => {
                let dst = self.touch(args[0]);
                let src = self.touch(args[1]);
                let dp = self.ensure_deref_target(dst);
                let sp = self.ensure_deref_target(src);
                self.graph.combine(dp, sp);
                if let Some(r) = result {
                    self.combine_values(r, args[0]);
                }
            }
            LibraryContract::ReturnsFirstArg => {
                if let Some(r) = result {
                    self.combine_values(r, args[0]);
                }
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Global initializers
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn init_global(&mut self, g: ValueId) {
        let init = match &self.program.value(g).kind {
            ValueKind::Global {
                initializer: Some(i),
            } => *i,
            _ => return,
        };
        let gn = self.touch(g);
        self.stats.globals_initialized += 1;
        self.init_into(gn, init);
    }

    /// Store-like constraint of `value` into the storage behind `addr`,
    /// recursing element-wise through aggregate literals
    fn init_into(&mut self, addr: NodeId, value: ValueId) {
        match &self.program.value(value).kind {
            ValueKind::Constant(Constant::Aggregate(elems)) => {
                let elems = elems.clone();
                for (k, e) in elems.into_iter().enumerate() {
                    // A self-referential initializer can absorb `addr` while
                    // an earlier element is processed, so re-canonicalize
                    let base = self.graph.find(addr);
                    let fa = self.field_target_anon(base, k as u32);
                    self.ensure_deref_target(fa);
                    self.init_into(fa, e);
                }
            }
            // Null and undef store no pointer relationship
            ValueKind::Constant(Constant::Null) | ValueKind::Constant(Constant::Undef) => {}
            _ => {
                let vn = self.touch(value);
                self.attach_deref(addr, vn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ProgramBuilder;
    use pretty_assertions::assert_eq;

    fn run_on(b: ProgramBuilder) -> GenOutput {
        let program = b.build().unwrap();
        ConstraintBuilder::new(&program).run().unwrap()
    }

    #[test]
    fn store_then_load_share_a_class() {
        let mut b = ProgramBuilder::new();
        let i64t = b.ty_int(64);
        let p64 = b.ty_ptr(i64t);
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let p = b.add_local(f, p64).unwrap();
        let x = b.add_local(f, i64t).unwrap();
        let y = b.add_local(f, i64t).unwrap();
        b.push(f, Instruction::Store { addr: p, value: x }).unwrap();
        b.push(f, Instruction::Load { result: y, addr: p }).unwrap();

        let out = run_on(b);
        assert_eq!(out.graph.lookup(x), out.graph.lookup(y));
        assert_ne!(out.graph.lookup(p), out.graph.lookup(x));
    }

    #[test]
    fn distinct_fields_stay_apart() {
        let mut b = ProgramBuilder::new();
        let i64t = b.ty_int(64);
        let st = b.ty_struct(vec![i64t, i64t]);
        let pst = b.ty_ptr(st);
        let p64 = b.ty_ptr(i64t);
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let base = b.add_local(f, pst).unwrap();
        let a0 = b.add_local(f, p64).unwrap();
        let a1 = b.add_local(f, p64).unwrap();
        b.push(
            f,
            Instruction::FieldAddr {
                result: a0,
                base,
                field: 0,
            },
        )
        .unwrap();
        b.push(
            f,
            Instruction::FieldAddr {
                result: a1,
                base,
                field: 1,
            },
        )
        .unwrap();

        let mut out = run_on(b);
        assert_ne!(out.graph.lookup(a0), out.graph.lookup(a1));
        // Both field pointers already carry a pointee class
        let d = out.graph.deref_label();
        let n0 = out.graph.lookup(a0).unwrap();
        let n1 = out.graph.lookup(a1).unwrap();
        assert!(out.graph.first_target(n0, d).is_some());
        assert!(out.graph.first_target(n1, d).is_some());
        let f0 = out.graph.field_label(0);
        let bn = out.graph.lookup(base).unwrap();
        assert_eq!(out.graph.first_target(bn, f0), out.graph.lookup(a0));
    }

    #[test]
    fn select_joins_both_arms_not_the_condition() {
        let mut b = ProgramBuilder::new();
        let i1 = b.ty_int(1);
        let i64t = b.ty_int(64);
        let p64 = b.ty_ptr(i64t);
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let cond = b.add_local(f, i1).unwrap();
        let t = b.add_local(f, p64).unwrap();
        let e = b.add_local(f, p64).unwrap();
        let r = b.add_local(f, p64).unwrap();
        b.push(
            f,
            Instruction::Select {
                result: r,
                cond,
                if_true: t,
                if_false: e,
            },
        )
        .unwrap();

        let out = run_on(b);
        let rn = out.graph.lookup(r).unwrap();
        assert_eq!(out.graph.lookup(t), Some(rn));
        assert_eq!(out.graph.lookup(e), Some(rn));
        // The condition carries no data and never enters the graph
        assert!(out.graph.lookup(cond).is_none());
    }

    #[test]
    fn constant_index_is_precise_and_unknown_index_collapses() {
        let mut b = ProgramBuilder::new();
        let i64t = b.ty_int(64);
        let arr = b.ty_array(i64t, 8);
        let parr = b.ty_ptr(arr);
        let p64 = b.ty_ptr(i64t);
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let base = b.add_local(f, parr).unwrap();
        let e0 = b.add_local(f, p64).unwrap();
        let e3 = b.add_local(f, p64).unwrap();
        let any = b.add_local(f, p64).unwrap();
        let k0 = b.const_int(i64t, 0);
        let k3 = b.const_int(i64t, 3);
        let runtime = b.add_local(f, i64t).unwrap();
        b.push(
            f,
            Instruction::IndexAddr {
                result: e0,
                base,
                index: k0,
            },
        )
        .unwrap();
        b.push(
            f,
            Instruction::IndexAddr {
                result: e3,
                base,
                index: k3,
            },
        )
        .unwrap();
        b.push(
            f,
            Instruction::IndexAddr {
                result: any,
                base,
                index: runtime,
            },
        )
        .unwrap();

        let out = run_on(b);
        assert_ne!(out.graph.lookup(e0), out.graph.lookup(e3));
        // A runtime index folds the element address into the base class
        assert_eq!(out.graph.lookup(any), out.graph.lookup(base));
    }

    #[test]
    fn atomic_rmw_routes_old_and_new_through_the_cell() {
        let mut b = ProgramBuilder::new();
        let i64t = b.ty_int(64);
        let p64 = b.ty_ptr(i64t);
        let pp64 = b.ty_ptr(p64);
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let cell = b.add_local(f, pp64).unwrap();
        let old = b.add_local(f, p64).unwrap();
        let stored = b.add_local(f, p64).unwrap();
        b.push(
            f,
            Instruction::AtomicRmw {
                result: old,
                addr: cell,
                operand: stored,
            },
        )
        .unwrap();

        let out = run_on(b);
        let on = out.graph.lookup(old).unwrap();
        assert_eq!(out.graph.lookup(stored), Some(on));
        let d = out.graph.deref_label();
        let cn = out.graph.lookup(cell).unwrap();
        assert_eq!(out.graph.first_target(cn, d), Some(on));
    }

    #[test]
    fn aggregate_extract_and_insert_flow_values() {
        let mut b = ProgramBuilder::new();
        let i64t = b.ty_int(64);
        let p64 = b.ty_ptr(i64t);
        let st = b.ty_struct(vec![p64, p64]);
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let agg = b.add_local(f, st).unwrap();
        let elem = b.add_local(f, p64).unwrap();
        let widened = b.add_local(f, st).unwrap();
        let got = b.add_local(f, p64).unwrap();
        b.push(
            f,
            Instruction::InsertValue {
                result: widened,
                aggregate: agg,
                element: elem,
            },
        )
        .unwrap();
        b.push(
            f,
            Instruction::ExtractValue {
                result: got,
                aggregate: widened,
            },
        )
        .unwrap();

        let out = run_on(b);
        assert_eq!(out.graph.lookup(got), out.graph.lookup(elem));
    }

    #[test]
    fn field_index_outside_struct_is_rejected() {
        let mut b = ProgramBuilder::new();
        let i64t = b.ty_int(64);
        let st = b.ty_struct(vec![i64t, i64t]);
        let pst = b.ty_ptr(st);
        let p64 = b.ty_ptr(i64t);
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let base = b.add_local(f, pst).unwrap();
        let out = b.add_local(f, p64).unwrap();
        b.push(
            f,
            Instruction::FieldAddr {
                result: out,
                base,
                field: 5,
            },
        )
        .unwrap();

        let program = b.build().unwrap();
        let err = ConstraintBuilder::new(&program).run().unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::FieldOutOfBounds {
                index: 5,
                field_count: 2
            }
        ));
    }

    #[test]
    fn indirect_call_through_non_function_pointer_is_rejected() {
        let mut b = ProgramBuilder::new();
        let i64t = b.ty_int(64);
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let bogus = b.add_named_local(f, "not_a_callee", i64t).unwrap();
        b.push(
            f,
            Instruction::Call {
                result: None,
                target: CallTarget::Indirect(bogus),
                args: vec![],
            },
        )
        .unwrap();

        let program = b.build().unwrap();
        let err = ConstraintBuilder::new(&program).run().unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedCallSite(_)));
        assert!(err.to_string().contains("not_a_callee"));
    }

    #[test]
    fn bare_function_address_callee_enters_the_graph() {
        let mut b = ProgramBuilder::new();
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let handler = b.add_function("handler", fty, true).unwrap();
        let fval = b.function_value(handler).unwrap();
        let main_ty = b.ty_func(vec![], void, false);
        let main = b.add_function("main", main_ty, true).unwrap();
        b.push(
            main,
            Instruction::Call {
                result: None,
                target: CallTarget::Indirect(fval),
                args: vec![],
            },
        )
        .unwrap();

        let out = run_on(b);
        // The callee value appears nowhere else, yet it must be in the
        // graph and the callee registered as address-taken
        assert!(out.graph.lookup(fval).is_some());
        assert!(out.address_taken.contains(&handler));
        assert_eq!(out.stats.indirect_call_sites, 1);
    }

    #[test]
    fn global_initializer_reaches_function_address() {
        let mut b = ProgramBuilder::new();
        let void = b.ty_void();
        let fty = b.ty_func(vec![], void, false);
        let pfty = b.ty_ptr(fty);
        let st = b.ty_struct(vec![pfty]);
        let f = b.add_function("handler", fty, true).unwrap();
        let fval = b.function_value(f).unwrap();
        let table = b.add_global("table", st);
        let init = b.const_aggregate(st, vec![fval]);
        b.set_initializer(table, init).unwrap();

        let mut out = run_on(b);
        assert!(out.address_taken.contains(&f));
        assert_eq!(out.stats.globals_initialized, 1);

        let d = out.graph.deref_label();
        let f0 = out.graph.field_label(0);
        let tn = out.graph.lookup(table).unwrap();
        let slot_addr = out.graph.first_target(tn, f0).unwrap();
        let slot = out.graph.first_target(slot_addr, d).unwrap();
        assert!(out.graph.values_of(slot).contains(&fval));
    }

    #[test]
    fn null_and_undef_initializers_relate_nothing() {
        let mut b = ProgramBuilder::new();
        let i64t = b.ty_int(64);
        let p64 = b.ty_ptr(i64t);
        let g = b.add_global("g", p64);
        let h = b.add_global("h", p64);
        let null_g = b.const_null(p64);
        let undef_h = b.const_undef(p64);
        b.set_initializer(g, null_g).unwrap();
        b.set_initializer(h, undef_h).unwrap();

        let out = run_on(b);
        assert_eq!(out.stats.globals_initialized, 2);
        // Neither global gains a dereference target, and the null constant
        // itself never enters the graph
        let d = out.graph.deref_label();
        let gn = out.graph.lookup(g).unwrap();
        let hn = out.graph.lookup(h).unwrap();
        assert_ne!(gn, hn);
        assert!(out.graph.first_target(gn, d).is_none());
        assert!(out.graph.first_target(hn, d).is_none());
        assert!(out.graph.lookup(null_g).is_none());
    }

    #[test]
    fn function_pointer_casts_are_collected() {
        let mut b = ProgramBuilder::new();
        let i32t = b.ty_int(32);
        let i64t = b.ty_int(64);
        let void = b.ty_void();
        let narrow = b.ty_func(vec![i32t], void, false);
        let wide = b.ty_func(vec![i64t], void, false);
        let p_narrow = b.ty_ptr(narrow);
        let p_wide = b.ty_ptr(wide);
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let from = b.add_local(f, p_narrow).unwrap();
        let to = b.add_local(f, p_wide).unwrap();
        b.push(
            f,
            Instruction::Assign {
                result: to,
                operand: from,
            },
        )
        .unwrap();

        let out = run_on(b);
        assert_eq!(out.fn_ptr_casts, vec![(narrow, wide)]);
        // The cast is also a value flow
        assert_eq!(out.graph.lookup(from), out.graph.lookup(to));
    }

    #[test]
    fn memcpy_contract_unifies_pointees() {
        let mut b = ProgramBuilder::new();
        let i8t = b.ty_int(8);
        let p8 = b.ty_ptr(i8t);
        let i64t = b.ty_int(64);
        let void = b.ty_void();
        let memcpy_ty = b.ty_func(vec![p8, p8, i64t], p8, false);
        let memcpy = b.add_function("memcpy", memcpy_ty, false).unwrap();
        let fty = b.ty_func(vec![], void, false);
        let f = b.add_function("main", fty, true).unwrap();
        let dst = b.add_local(f, p8).unwrap();
        let src = b.add_local(f, p8).unwrap();
        let n = b.const_int(i64t, 16);
        b.push(
            f,
            Instruction::Call {
                result: None,
                target: CallTarget::Direct(memcpy),
                args: vec![dst, src, n],
            },
        )
        .unwrap();

        let out = run_on(b);
        assert_eq!(out.stats.contracts_applied, 1);
        let d = out.graph.deref_label();
        let dn = out.graph.lookup(dst).unwrap();
        let sn = out.graph.lookup(src).unwrap();
        assert_eq!(out.graph.first_target(dn, d), out.graph.first_target(sn, d));
        assert_ne!(out.graph.lookup(dst), out.graph.lookup(src));
    }

    #[test]
    fn call_sites_and_returns_are_recorded() {
        let mut b = ProgramBuilder::new();
        let i64t = b.ty_int(64);
        let p64 = b.ty_ptr(i64t);
        let callee_ty = b.ty_func(vec![p64], p64, false);
        let void = b.ty_void();
        let main_ty = b.ty_func(vec![], void, false);
        let main = b.add_function("main", main_ty, true).unwrap();
        let callee = b.add_function("id", callee_ty, true).unwrap();
        let p = b.add_param(callee, p64).unwrap();
        b.push(callee, Instruction::Return { value: Some(p) }).unwrap();
        let arg = b.add_local(main, p64).unwrap();
        let ret = b.add_local(main, p64).unwrap();
        b.push(
            main,
            Instruction::Call {
                result: Some(ret),
                target: CallTarget::Direct(callee),
                args: vec![arg],
            },
        )
        .unwrap();

        let out = run_on(b);
        assert_eq!(out.stats.direct_call_sites, 1);
        assert_eq!(out.stats.indirect_call_sites, 0);
        assert_eq!(out.sites.len(), 1);
        assert_eq!(out.sites[0].caller, main);
        assert_eq!(out.sites[0].args, vec![arg]);
        assert_eq!(out.sites[0].result, Some(ret));
        assert_eq!(out.infos[callee.0 as usize].returns, vec![p]);
        assert_eq!(out.infos[main.0 as usize].call_sites, vec![0]);
    }
}

