//! Analysis entry point and configuration

use std::time::Instant;

use tracing::info;

use crate::errors::Result;
use crate::features::call_graph::{FunctionTypeGroups, TypeStrictness};
use crate::features::constraint_gen::ConstraintBuilder;
use crate::shared::models::Program;

use super::driver::FixpointDriver;
use super::results::{AliasResults, AnalysisStats};

/// Per-run knobs. Construct one per analysis; nothing here is process-wide.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// How coarsely function types are grouped for indirect-call candidates
    pub type_strictness: TypeStrictness,
    /// Round cap; 0 runs to fixpoint
    pub max_rounds: usize,
    /// Track per-round candidate counts in the final stats
    pub record_round_stats: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            type_strictness: TypeStrictness::ParamSizes,
            max_rounds: 0,
            record_round_stats: true,
        }
    }
}

/// Whole-program alias analysis, configured once and run per program
#[derive(Debug, Default)]
pub struct AliasAnalyzer {
    config: AnalysisConfig,
}

impl AliasAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    #[inline]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run generation, the interprocedural fixpoint, and freeze the results
    pub fn analyze(&self, program: &Program) -> Result<AliasResults> {
        let started = Instant::now();
        let gen = ConstraintBuilder::new(program).run()?;
        let mut graph = gen.graph;

        let types = program.types();
        let mut groups = FunctionTypeGroups::new(self.config.type_strictness);
        for &f in &gen.address_taken {
            groups.register_function(f, program.function(f).ty, types);
        }
        for &(from, to) in &gen.fn_ptr_casts {
            groups.merge_for_cast(from, to, types);
        }

        let mut driver =
            FixpointDriver::new(program, groups, gen.sites, gen.infos, &self.config);
        driver.run(&mut graph);
        graph.compress_all();

        let stats = AnalysisStats {
            functions_analyzed: gen.stats.functions_processed,
            instructions_translated: gen.stats.instructions_translated,
            nodes_created: graph.stats().nodes_created,
            nodes_merged: graph.stats().nodes_merged,
            edges_added: graph.stats().edges_added,
            unify_passes: driver.unifier_stats().passes,
            rounds: driver.rounds(),
            direct_call_sites: gen.stats.direct_call_sites,
            indirect_call_sites: gen.stats.indirect_call_sites,
            indirect_resolved_per_round: driver.resolved_per_round().to_vec(),
            reached_fixpoint: driver.reached_fixpoint(),
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            functions = stats.functions_analyzed,
            rounds = stats.rounds,
            classes = graph.node_count(),
            fixpoint = stats.reached_fixpoint,
            "alias analysis complete"
        );
        Ok(AliasResults::new(program, graph, driver.into_sites(), stats))
    }
}
