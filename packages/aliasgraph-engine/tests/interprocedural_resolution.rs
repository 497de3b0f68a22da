//! End-to-end interprocedural resolution tests
//!
//! Exercises the full pipeline on small whole programs:
//! - Indirect calls resolve to exactly the type-compatible candidates
//! - Candidate discovery chains across rounds and only ever grows
//! - Body-less callees join the call graph without argument binding
//! - The round cap produces an explicitly flagged partial result

use aliasgraph_engine::{
    AliasAnalyzer, AliasRelation, AnalysisConfig, CallTarget, FuncId, Instruction, Program,
    ProgramBuilder, ValueId,
};
use rustc_hash::FxHashSet;

// ============================================================================
// Two-branch indirect call (the textbook case)
// ============================================================================

/// main picks between &f and &g (and also sees &h of a different signature),
/// then calls through the pointer
fn two_branch_program() -> (Program, TwoBranch) {
    let mut b = ProgramBuilder::new();
    let i64t = b.ty_int(64);
    let p64 = b.ty_ptr(i64t);
    let void = b.ty_void();
    let handler_ty = b.ty_func(vec![p64], void, false);
    let p_handler = b.ty_ptr(handler_ty);
    let other_ty = b.ty_func(vec![i64t, i64t], void, false);

    let f = b.add_function("f", handler_ty, true).unwrap();
    let fp_param = b.add_param(f, p64).unwrap();
    b.push(f, Instruction::Return { value: None }).unwrap();

    let g = b.add_function("g", handler_ty, true).unwrap();
    let gp_param = b.add_param(g, p64).unwrap();
    b.push(g, Instruction::Return { value: None }).unwrap();

    let h = b.add_function("h", other_ty, true).unwrap();
    b.add_param(h, i64t).unwrap();
    b.add_param(h, i64t).unwrap();
    b.push(h, Instruction::Return { value: None }).unwrap();

    let main_ty = b.ty_func(vec![], void, false);
    let main = b.add_function("main", main_ty, true).unwrap();
    let fv = b.function_value(f).unwrap();
    let gv = b.function_value(g).unwrap();
    let hv = b.function_value(h).unwrap();
    let fp = b.add_local(main, p_handler).unwrap();
    // All three addresses land in fp's class; only two are type-compatible
    b.push(
        main,
        Instruction::Phi {
            result: fp,
            operands: vec![fv, gv, hv],
        },
    )
    .unwrap();
    let arg = b.add_local(main, p64).unwrap();
    b.push(
        main,
        Instruction::Call {
            result: None,
            target: CallTarget::Indirect(fp),
            args: vec![arg],
        },
    )
    .unwrap();

    let ids = TwoBranch {
        f,
        g,
        h,
        main,
        arg,
        fp_param,
        gp_param,
    };
    (b.build().unwrap(), ids)
}

struct TwoBranch {
    f: FuncId,
    g: FuncId,
    h: FuncId,
    main: FuncId,
    arg: ValueId,
    fp_param: ValueId,
    gp_param: ValueId,
}

#[test]
fn indirect_call_resolves_to_exactly_the_compatible_candidates() {
    let (program, ids) = two_branch_program();
    let results = AliasAnalyzer::default().analyze(&program).unwrap();

    assert!(results.reached_fixpoint());
    assert_eq!(results.stats().indirect_call_sites, 1);

    let callees: FxHashSet<_> = results.callees_of(ids.main).iter().copied().collect();
    let expected: FxHashSet<_> = [ids.f, ids.g].into_iter().collect();
    assert_eq!(callees, expected);
    assert!(!callees.contains(&ids.h));

    assert_eq!(results.callers_of(ids.f), &[ids.main]);
    assert_eq!(results.callers_of(ids.g), &[ids.main]);
    assert!(results.callers_of(ids.h).is_empty());

    // The one actual was bound to both formals, so the formals must-alias
    assert_eq!(results.alias(ids.arg, ids.fp_param), AliasRelation::MustAlias);
    assert_eq!(
        results.alias(ids.fp_param, ids.gp_param),
        AliasRelation::MustAlias
    );
}

#[test]
fn candidate_sets_survive_in_per_site_records() {
    let (program, ids) = two_branch_program();
    let results = AliasAnalyzer::default().analyze(&program).unwrap();

    let indirect: Vec<_> = results
        .call_sites()
        .iter()
        .filter(|s| s.is_indirect())
        .collect();
    assert_eq!(indirect.len(), 1);
    assert_eq!(indirect[0].caller, ids.main);
    assert_eq!(indirect[0].resolved.len(), 2);
    assert!(indirect[0].resolved.contains(&ids.f));
    assert!(indirect[0].resolved.contains(&ids.g));
}

// ============================================================================
// Singleton callee class
// ============================================================================

#[test]
fn callee_mentioned_only_at_the_call_site_still_resolves() {
    let mut b = ProgramBuilder::new();
    let i64t = b.ty_int(64);
    let p64 = b.ty_ptr(i64t);
    let void = b.ty_void();
    let sink_ty = b.ty_func(vec![p64], void, false);
    let sink = b.add_function("sink", sink_ty, true).unwrap();
    let p = b.add_param(sink, p64).unwrap();
    b.push(sink, Instruction::Return { value: None }).unwrap();

    let main_ty = b.ty_func(vec![], void, false);
    let main = b.add_function("main", main_ty, true).unwrap();
    let sv = b.function_value(sink).unwrap();
    let x = b.add_local(main, p64).unwrap();
    // The function address flows through nothing; the call is its only use
    b.push(
        main,
        Instruction::Call {
            result: None,
            target: CallTarget::Indirect(sv),
            args: vec![x],
        },
    )
    .unwrap();

    let program = b.build().unwrap();
    let results = AliasAnalyzer::default().analyze(&program).unwrap();

    assert!(results.reached_fixpoint());
    assert_eq!(results.callees_of(main), &[sink]);
    assert_eq!(results.callers_of(sink), &[main]);
    assert_eq!(results.alias(x, p), AliasRelation::MustAlias);
}

// ============================================================================
// Cross-round chaining
// ============================================================================

/// dispatch calls through its parameter; main reaches dispatch itself through
/// a function pointer. The inner site cannot resolve until the outer one has
/// bound, which takes a second round.
fn chained_program() -> (Program, FuncId, FuncId, FuncId) {
    let mut b = ProgramBuilder::new();
    let void = b.ty_void();
    let leaf_ty = b.ty_func(vec![], void, false);
    let p_leaf = b.ty_ptr(leaf_ty);
    let dispatch_ty = b.ty_func(vec![p_leaf], void, false);
    let p_dispatch = b.ty_ptr(dispatch_ty);

    // dispatch first so its indirect site precedes main's in site order
    let dispatch = b.add_function("dispatch", dispatch_ty, true).unwrap();
    let h = b.add_param(dispatch, p_leaf).unwrap();
    b.push(
        dispatch,
        Instruction::Call {
            result: None,
            target: CallTarget::Indirect(h),
            args: vec![],
        },
    )
    .unwrap();

    let leaf = b.add_function("leaf", leaf_ty, true).unwrap();
    b.push(leaf, Instruction::Return { value: None }).unwrap();

    let main_ty = b.ty_func(vec![], void, false);
    let main = b.add_function("main", main_ty, true).unwrap();
    let dv = b.function_value(dispatch).unwrap();
    let lv = b.function_value(leaf).unwrap();
    let fp = b.add_local(main, p_dispatch).unwrap();
    b.push(
        main,
        Instruction::Assign {
            result: fp,
            operand: dv,
        },
    )
    .unwrap();
    b.push(
        main,
        Instruction::Call {
            result: None,
            target: CallTarget::Indirect(fp),
            args: vec![lv],
        },
    )
    .unwrap();

    (b.build().unwrap(), dispatch, leaf, main)
}

#[test]
fn resolution_chains_across_rounds_and_grows_monotonically() {
    let (program, dispatch, leaf, main) = chained_program();
    let results = AliasAnalyzer::default().analyze(&program).unwrap();

    assert!(results.reached_fixpoint());
    assert_eq!(results.callees_of(main), &[dispatch]);
    assert_eq!(results.callees_of(dispatch), &[leaf]);
    assert_eq!(results.callers_of(leaf), &[dispatch]);

    // One candidate per round, then a quiet round to confirm the fixpoint
    let per_round = &results.stats().indirect_resolved_per_round;
    assert_eq!(per_round, &[1, 1, 0]);
    assert_eq!(results.stats().rounds, 3);

    // Cumulative counts never shrink
    let total: usize = per_round.iter().sum();
    let site_total: usize = results
        .call_sites()
        .iter()
        .map(|s| s.resolved.len())
        .sum();
    assert_eq!(total, site_total);
}

#[test]
fn round_cap_yields_flagged_partial_result() {
    let (program, dispatch, _leaf, main) = chained_program();
    let config = AnalysisConfig {
        max_rounds: 1,
        ..AnalysisConfig::default()
    };
    let results = AliasAnalyzer::new(config).analyze(&program).unwrap();

    assert!(!results.reached_fixpoint());
    assert!(!results.stats().reached_fixpoint);
    // The outer call resolved inside round one; the inner one never got its
    // second round
    assert_eq!(results.callees_of(main), &[dispatch]);
    assert!(results.callees_of(dispatch).is_empty());
}

// ============================================================================
// Body-less callees
// ============================================================================

#[test]
fn bodiless_callee_joins_call_graph_without_binding() {
    let mut b = ProgramBuilder::new();
    let i64t = b.ty_int(64);
    let p64 = b.ty_ptr(i64t);
    let void = b.ty_void();
    let ext_ty = b.ty_func(vec![p64], p64, false);
    let ext = b.add_function("opaque_ext", ext_ty, false).unwrap();
    let main_ty = b.ty_func(vec![], void, false);
    let main = b.add_function("main", main_ty, true).unwrap();
    let x = b.add_local(main, p64).unwrap();
    let y = b.add_local(main, p64).unwrap();
    b.push(
        main,
        Instruction::Call {
            result: Some(y),
            target: CallTarget::Direct(ext),
            args: vec![x],
        },
    )
    .unwrap();

    let program = b.build().unwrap();
    let results = AliasAnalyzer::default().analyze(&program).unwrap();

    assert_eq!(results.callees_of(main), &[ext]);
    // No binding happened: the argument and result stay independent
    assert_eq!(results.alias(x, y), AliasRelation::NoAlias);
}

// ============================================================================
// Resolved-graph algorithms
// ============================================================================

#[test]
fn recursion_groups_report_cycles_in_the_resolved_graph() {
    let mut b = ProgramBuilder::new();
    let void = b.ty_void();
    let fty = b.ty_func(vec![], void, false);
    let ping = b.add_function("ping", fty, true).unwrap();
    let pong = b.add_function("pong", fty, true).unwrap();
    let solo = b.add_function("solo", fty, true).unwrap();
    let lone = b.add_function("lone", fty, true).unwrap();
    b.push(
        ping,
        Instruction::Call {
            result: None,
            target: CallTarget::Direct(pong),
            args: vec![],
        },
    )
    .unwrap();
    b.push(
        pong,
        Instruction::Call {
            result: None,
            target: CallTarget::Direct(ping),
            args: vec![],
        },
    )
    .unwrap();
    b.push(
        solo,
        Instruction::Call {
            result: None,
            target: CallTarget::Direct(solo),
            args: vec![],
        },
    )
    .unwrap();
    b.push(
        lone,
        Instruction::Call {
            result: None,
            target: CallTarget::Direct(solo),
            args: vec![],
        },
    )
    .unwrap();

    let program = b.build().unwrap();
    let results = AliasAnalyzer::default().analyze(&program).unwrap();

    let mut groups: Vec<Vec<String>> = results
        .recursion_groups()
        .into_iter()
        .map(|mut g| {
            g.sort();
            g
        })
        .collect();
    groups.sort();
    assert_eq!(
        groups,
        vec![
            vec!["ping".to_string(), "pong".to_string()],
            vec!["solo".to_string()]
        ]
    );
}
