//! Round-based fixpoint driver
//!
//! A round is three phases. Phase A runs the unification worklist. Phase B
//! binds every direct call site to its statically known callee; the `bound`
//! memo makes it a no-op from the second round on. Phase C inspects each
//! indirect site: any function whose address sits in the callee value's
//! class and whose type group is compatible becomes a new candidate and is
//! bound like a direct callee. Binding merges classes, which can move more
//! function addresses into callee classes, so the rounds repeat until one
//! passes with no merge and no new candidate.
//!
//! Termination does not need the cap: classes only ever shrink in number
//! and candidate sets only ever grow, both bounded by the program. The cap
//! exists for callers that prefer a fast partial answer on huge inputs.

use tracing::{debug, warn};

use rustc_hash::FxHashSet;

use crate::features::alias_graph::{AliasGraph, Unifier, UnifierStats};
use crate::features::call_graph::{CallSite, FunctionInfo, FunctionTypeGroups};
use crate::shared::models::{CallTarget, FuncId, Program};

use super::analyzer::AnalysisConfig;

pub struct FixpointDriver<'p> {
    program: &'p Program,
    groups: FunctionTypeGroups,
    sites: Vec<CallSite>,
    infos: Vec<FunctionInfo>,
    unifier: Unifier,
    max_rounds: usize,
    record_round_stats: bool,
    rounds: usize,
    resolved_per_round: Vec<usize>,
    reached_fixpoint: bool,
}

impl<'p> FixpointDriver<'p> {
    pub fn new(
        program: &'p Program,
        groups: FunctionTypeGroups,
        sites: Vec<CallSite>,
        infos: Vec<FunctionInfo>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            program,
            groups,
            sites,
            infos,
            unifier: Unifier::new(),
            max_rounds: config.max_rounds,
            record_round_stats: config.record_round_stats,
            rounds: 0,
            resolved_per_round: Vec::new(),
            reached_fixpoint: true,
        }
    }

    /// Drive to fixpoint (or to the round cap)
    pub fn run(&mut self, graph: &mut AliasGraph) {
        loop {
            self.rounds += 1;
            let clean = self.unifier.run(graph);
            let new_direct = if self.rounds == 1 {
                self.bind_direct_calls(graph)
            } else {
                0
            };
            let new_indirect = self.resolve_indirect_calls(graph);
            if self.record_round_stats {
                self.resolved_per_round.push(new_indirect);
            }
            debug!(
                round = self.rounds,
                clean, new_direct, new_indirect, "interprocedural round complete"
            );
            if clean && new_direct == 0 && new_indirect == 0 {
                break;
            }
            if self.max_rounds > 0 && self.rounds >= self.max_rounds {
                warn!(
                    rounds = self.rounds,
                    "round cap reached before fixpoint; results are best-effort"
                );
                self.reached_fixpoint = false;
                break;
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Phase B
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn bind_direct_calls(&mut self, graph: &mut AliasGraph) -> usize {
        let mut newly_bound = 0;
        for idx in 0..self.sites.len() {
            let callee = match self.sites[idx].target {
                CallTarget::Direct(f) => f,
                CallTarget::Indirect(_) => continue,
            };
            if self.sites[idx].bound {
                continue;
            }
            self.sites[idx].bound = true;
            self.sites[idx].resolved.insert(callee);
            newly_bound += 1;
            if self.program.function(callee).is_definition {
                self.bind_call(graph, idx, callee);
            }
        }
        newly_bound
    }

    /// Unify a site's actuals, result, and var-arg surplus with one callee
    fn bind_call(&self, graph: &mut AliasGraph, site_idx: usize, callee: FuncId) {
        let program = self.program;
        let types = program.types();
        let site = &self.sites[site_idx];
        let info = &self.infos[callee.0 as usize];

        for (position, (&actual, &formal)) in
            site.args.iter().zip(info.formals.iter()).enumerate()
        {
            let actual_size = types.size_of(program.value(actual).ty);
            let formal_size = types.size_of(program.value(formal).ty);
            if let (Some(a), Some(f)) = (actual_size, formal_size) {
                if a != f {
                    debug!(
                        site = site_idx,
                        callee = %program.function(callee).name,
                        position,
                        "argument binding stopped at size mismatch"
                    );
                    break;
                }
            }
            let an = graph.node_of(actual);
            let fo = graph.node_of(formal);
            graph.combine(an, fo);
        }

        if site.args.len() > info.formals.len() {
            let surplus = &site.args[info.formals.len()..];
            if info.vararg_slots.is_empty() {
                debug!(
                    site = site_idx,
                    callee = %program.function(callee).name,
                    surplus = surplus.len(),
                    "surplus arguments at fixed-arity callee ignored"
                );
            } else {
                for (k, &actual) in surplus.iter().enumerate() {
                    match info.vararg_slots.get(k) {
                        Some(&slot) => {
                            let an = graph.node_of(actual);
                            let sn = graph.node_of(slot);
                            graph.combine(an, sn);
                        }
                        None => {
                            debug!(
                                site = site_idx,
                                callee = %program.function(callee).name,
                                from_position = info.formals.len() + k,
                                "surplus arguments past the last var-arg slot ignored"
                            );
                            break;
                        }
                    }
                }
            }
        }

        if let Some(result) = site.result {
            let result_size = types.size_of(program.value(result).ty);
            for &ret in &info.returns {
                let ret_size = types.size_of(program.value(ret).ty);
                let fits = match (ret_size, result_size) {
                    (Some(r), Some(s)) => r <= s,
                    _ => true,
                };
                if fits {
                    let rn = graph.node_of(result);
                    let re = graph.node_of(ret);
                    graph.combine(rn, re);
                }
            }
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Phase C
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn resolve_indirect_calls(&mut self, graph: &mut AliasGraph) -> usize {
        let program = self.program;
        let types = program.types();
        let mut discovered = 0;
        for idx in 0..self.sites.len() {
            let callee_value = match self.sites[idx].callee_value() {
                Some(v) => v,
                None => continue,
            };
            let class_funcs: FxHashSet<FuncId> = match graph.lookup(callee_value) {
                Some(node) => graph
                    .values_of(node)
                    .iter()
                    .filter_map(|&v| program.value(v).as_function())
                    .collect(),
                None => continue,
            };
            if class_funcs.is_empty() {
                continue;
            }
            let sig = match types.pointee_of(program.value(callee_value).ty) {
                Some(sig) => sig,
                None => continue,
            };
            let candidates: Vec<FuncId> = self
                .groups
                .compatible_functions(sig, types)
                .into_iter()
                .filter(|f| class_funcs.contains(f))
                .filter(|f| !self.sites[idx].resolved.contains(f))
                .collect();
            for f in candidates {
                self.sites[idx].resolved.insert(f);
                discovered += 1;
                debug!(
                    site = idx,
                    callee = %program.function(f).name,
                    "indirect call candidate resolved"
                );
                if program.function(f).is_definition {
                    self.bind_call(graph, idx, f);
                }
            }
        }
        discovered
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Outcome accessors
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    #[inline]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    #[inline]
    pub fn reached_fixpoint(&self) -> bool {
        self.reached_fixpoint
    }

    #[inline]
    pub fn resolved_per_round(&self) -> &[usize] {
        &self.resolved_per_round
    }

    #[inline]
    pub fn unifier_stats(&self) -> &UnifierStats {
        self.unifier.stats()
    }

    #[inline]
    pub fn sites(&self) -> &[CallSite] {
        &self.sites
    }

    pub fn into_sites(self) -> Vec<CallSite> {
        self.sites
    }
}
