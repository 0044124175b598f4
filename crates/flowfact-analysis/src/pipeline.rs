//! Pipeline orchestration (spec §4, §5): index, lower, cheap-pass and
//! summarize every function (consulting the summary cache per function),
//! map the external call graph onto internal ids, run the interprocedural
//! fixpoint, and hand back the canonical fact set.
//!
//! There is no thread pool here even though `flowfact-cache` and the
//! `parallel` feature exist for one: per-function lowering/cheap-pass/cache
//! round-trips are independent and embarrassingly parallel (spec §5), but
//! wiring that up is the CLI's job once it decides how many workers to run
//! with — this module stays sequential and safe to call from a single
//! thread or fan out over with `rayon` from the outside.

use std::collections::HashMap;

use flowfact_cache::{CacheError, FuncSummaryCache};
use flowfact_core::callgraph::CallGraphDoc;
use flowfact_core::config::AnalysisConfig;
use flowfact_core::errors::{FlowfactError, FlowfactResult};
use flowfact_core::facts::FlowFact;
use flowfact_core::frontend::{RawProgram, RawSpan};
use flowfact_core::ident::{CallsiteId, FuncId};

use crate::cheap_pass::run_cheap_pass;
use crate::diag::Diagnostics;
use crate::fixpoint::{run_fixpoint, FuncContext};
use crate::index::FunctionIndex;
use crate::ir_builder::{build_function_ir, FunctionLowering};
use crate::json_codec::{ir_to_json, summary_from_json, summary_to_json};
use crate::mapper::{CallGraphMapper, MappedCallEdge};
use crate::summary_normalize::normalize_summary;

/// Everything a single pipeline run produces: the canonical fact set, the
/// mapped call edges (witnesses are derived from these), any lenient-mode
/// diagnostics accumulated along the way, and every function's context
/// (explain bundles are derived from these; nothing here needs recomputing).
pub struct PipelineOutput {
    pub facts: Vec<FlowFact>,
    pub mapped_edges: Vec<MappedCallEdge>,
    pub diagnostics: Diagnostics,
    pub contexts: HashMap<FuncId, FuncContext>,
}

fn cache_err(e: CacheError) -> FlowfactError {
    FlowfactError::io(e.to_string())
}

type CallSpanTable = HashMap<FuncId, Vec<(RawSpan, CallsiteId)>>;

/// Lower, cheap-pass, and normalize every indexed function. When `cache` is
/// given, a function's summary is fetched by content key before falling
/// back to recomputing and storing it (spec §4.7); `cache: None` always
/// recomputes, which is what a `--no-cache` run or a unit test wants.
fn build_contexts(
    index: &FunctionIndex,
    config: &AnalysisConfig,
    cache: Option<&FuncSummaryCache>,
) -> FlowfactResult<(HashMap<FuncId, FuncContext>, CallSpanTable)> {
    let mut contexts = HashMap::new();
    let mut call_spans: CallSpanTable = HashMap::new();

    for entry in index.all() {
        let FunctionLowering { ir, call_spans: spans } = build_function_ir(entry.func_id.clone(), &entry.raw)?;
        call_spans.insert(entry.func_id.clone(), spans);

        let cheap = run_cheap_pass(&ir, &config.anchor_bases);

        let summary = match cache {
            Some(cache) => {
                let ir_json = ir_to_json(&ir)?;
                let key = FuncSummaryCache::key_for(config.config_version, &ir_json).map_err(cache_err)?;
                match cache.get(&key).map_err(cache_err)? {
                    Some(cached) => summary_from_json(&cached)?,
                    None => {
                        let summary = normalize_summary(&ir, &cheap.edges, cheap.edges.clone(), &config.limits)?;
                        cache.put(&key, &summary_to_json(&summary)?).map_err(cache_err)?;
                        summary
                    }
                }
            }
            None => normalize_summary(&ir, &cheap.edges, cheap.edges.clone(), &config.limits)?,
        };

        contexts.insert(entry.func_id.clone(), FuncContext { ir, summary, anchors: cheap.anchors });
    }

    Ok((contexts, call_spans))
}

/// Run the full pipeline end to end (spec §4's stage list). `cache: None`
/// disables on-disk caching entirely rather than pointing at an empty
/// directory, so callers never pay for a cache round-trip they didn't ask
/// for.
pub fn run_pipeline(
    program: &RawProgram,
    call_graph: &CallGraphDoc,
    config: &AnalysisConfig,
    cache: Option<&FuncSummaryCache>,
) -> FlowfactResult<PipelineOutput> {
    config.validate()?;

    let index = FunctionIndex::build(program)?;
    let (contexts, call_spans) = build_contexts(&index, config, cache)?;

    let mapper = CallGraphMapper::new(&index, &call_spans, config.call_graph_mode);
    // In strict mode, `map` itself has already turned any accumulated edge
    // failures into one consolidated `Err` (spec §4.8, §7); what reaches
    // here always has `diagnostics.has_errors() == false` for a strict run.
    let (mapped_edges, diagnostics) = mapper.map(call_graph)?;

    let fact_set = run_fixpoint(&contexts, &mapped_edges, &config.anchor_bases, config.max_fixpoint_steps)?;

    Ok(PipelineOutput { facts: fact_set.into_iter().collect(), mapped_edges, diagnostics, contexts })
}
