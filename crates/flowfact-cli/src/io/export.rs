use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use flowfact_analysis::json_codec::{ir_to_json, summary_to_json};
use flowfact_analysis::mapper::MappedCallEdge;
use flowfact_cache::FuncSummaryCache;
use flowfact_core::config::AnalysisConfig;
use flowfact_core::ident::FuncId;
use flowfact_analysis::fixpoint::FuncContext;

/// One witness record per mapped call edge, in the canonical order the
/// mapper already produced (spec.md §6).
pub fn write_witnesses<P: AsRef<Path>>(path: P, edges: &[MappedCallEdge]) -> Result<()> {
    let mut buf = Vec::new();
    for edge in edges {
        let record = serde_json::json!({
            "schemaVersion": 1,
            "kind": "call_chain",
            "steps": [{
                "callerFuncId": edge.caller_func_id.to_canonical_string(),
                "callsiteId": edge.callsite_id.to_canonical_string(),
                "calleeFuncId": edge.callee_func_id.to_canonical_string(),
            }],
        });
        serde_json::to_writer(&mut buf, &record)?;
        buf.push(b'\n');
    }
    let tmp = path.as_ref().with_extension("jsonl.tmp");
    fs::write(&tmp, &buf)?;
    fs::rename(&tmp, path.as_ref())?;
    Ok(())
}

/// Write `explain/manifest.json` + `explain/functions/<hash>.json` per
/// function (spec.md §6). The explain emitter owns and clears only its own
/// `functions/` subtree, never the rest of `dir` (spec.md §5).
pub fn write_explain_bundle<P: AsRef<Path>>(
    dir: P,
    contexts: &std::collections::HashMap<FuncId, FuncContext>,
    config: &AnalysisConfig,
) -> Result<()> {
    let dir = dir.as_ref();
    let functions_dir = dir.join("functions");
    if functions_dir.exists() {
        fs::remove_dir_all(&functions_dir)?;
    }
    fs::create_dir_all(&functions_dir)?;

    let mut func_ids: Vec<&FuncId> = contexts.keys().collect();
    func_ids.sort();

    let mut manifest_functions = Vec::new();
    for func_id in func_ids {
        let ctx = contexts.get(func_id).expect("iterating contexts' own keys");
        let ir_json = ir_to_json(&ctx.ir).map_err(|e| anyhow!("building explain IR for {func_id}: {e}"))?;
        let summary_json =
            summary_to_json(&ctx.summary).map_err(|e| anyhow!("building explain summary for {func_id}: {e}"))?;
        let hash = FuncSummaryCache::key_for(config.config_version, &ir_json)
            .map_err(|e| anyhow!("deriving explain hash for {func_id}: {e}"))?;

        let bundle = serde_json::json!({
            "funcId": func_id.to_canonical_string(),
            "configVersion": config.config_version,
            "irSchemaVersion": ctx.ir.schema_version,
            "summarySchemaVersion": ctx.summary.schema_version,
            "bounds": {
                "maxEdges": config.limits.max_edges,
                "maxFanoutPerSource": config.limits.max_fanout_per_source,
            },
            // Unconditional: the summary normalizer already fails the whole
            // run on missing baseline coverage, so this field is derived,
            // not independently checked here (spec.md §9).
            "baselineCoverage": "ok",
            "ir": ir_json,
            "summary": summary_json,
        });

        fs::write(functions_dir.join(format!("{hash}.json")), serde_json::to_vec_pretty(&bundle)?)?;
        manifest_functions.push(serde_json::json!({"funcId": func_id.to_canonical_string(), "hash": hash}));
    }

    let manifest = serde_json::json!({
        "schemaVersion": 1,
        "configVersion": config.config_version,
        "functions": manifest_functions,
    });
    fs::write(dir.join("manifest.json"), serde_json::to_vec_pretty(&manifest)?)?;
    Ok(())
}
