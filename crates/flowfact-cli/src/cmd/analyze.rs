use anyhow::{Context, Result};
use flowfact_analysis::emit::write_flow_facts;
use flowfact_analysis::pipeline::run_pipeline;
use flowfact_cache::FuncSummaryCache;
use flowfact_core::config::{AnalysisConfig, CallGraphMode};
use serde::Serialize;

use crate::args::Cli;
use crate::io::{export, input};
use crate::output;

#[derive(Debug, Serialize)]
struct AnalyzeSummary {
    functions_indexed: usize,
    facts_written: usize,
    mapped_call_edges: usize,
    warnings: usize,
    out: String,
}

pub fn run(cli: &Cli) -> Result<()> {
    cli.validate()?;

    tracing::info!(ast = %cli.ast, callgraph = %cli.callgraph, "starting analysis");

    let program = input::read_raw_program(&cli.ast).context("loading frontend AST")?;
    let call_graph = input::read_call_graph(&cli.callgraph).context("loading call graph")?;

    let mut config = AnalysisConfig::default();
    config.call_graph_mode = if cli.lenient { CallGraphMode::Lenient } else { CallGraphMode::Strict };
    config.validate().context("invalid analysis configuration")?;

    let cache = cli.cache.as_ref().map(|root| FuncSummaryCache::open(root));

    let result = run_pipeline(&program, &call_graph, &config, cache.as_ref())
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("analysis pipeline failed")?;

    for diag in result.diagnostics.canonical() {
        let file_path = diag.file_path.as_str();
        let message = diag.message.as_str();
        match diag.level {
            flowfact_analysis::diag::DiagnosticLevel::Info => tracing::info!(file_path, message, "diagnostic"),
            flowfact_analysis::diag::DiagnosticLevel::Warning => tracing::warn!(file_path, message, "diagnostic"),
            flowfact_analysis::diag::DiagnosticLevel::Error => tracing::error!(file_path, message, "diagnostic"),
        }
    }

    write_flow_facts(std::path::Path::new(&cli.out), result.facts.iter().cloned())
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("writing flow facts")?;

    if let Some(witness_path) = &cli.witness {
        export::write_witnesses(witness_path, &result.mapped_edges).context("writing witnesses")?;
    }

    if let Some(explain_dir) = &cli.explain {
        export::write_explain_bundle(explain_dir, &result.contexts, &config).context("writing explain bundle")?;
    }

    let summary = AnalyzeSummary {
        functions_indexed: result.contexts.len(),
        facts_written: result.facts.len(),
        mapped_call_edges: result.mapped_edges.len(),
        warnings: result.diagnostics.canonical().len(),
        out: cli.out.clone(),
    };

    if output::is_json() {
        output::print(&summary)?;
    } else {
        output::eprintln_line(&format!(
            "indexed {} function(s), wrote {} fact(s) to {} ({} mapped call edge(s), {} diagnostic(s))",
            summary.functions_indexed, summary.facts_written, summary.out, summary.mapped_call_edges, summary.warnings
        ));
    }

    Ok(())
}
