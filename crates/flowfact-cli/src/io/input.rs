use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use flowfact_core::callgraph::CallGraphDoc;
use flowfact_core::frontend::RawProgram;

/// Load the frontend AST contract document (spec.md §3) from disk. Parsing
/// source text is out of scope for this crate, the same way it's out of
/// scope for `flowfact-core` — an external frontend already produced this.
pub fn read_raw_program<P: AsRef<Path>>(path: P) -> Result<RawProgram> {
    let raw = fs::read_to_string(path.as_ref())
        .map_err(|e| anyhow!("reading AST file {}: {e}", path.as_ref().display()))?;
    serde_json::from_str(&raw).map_err(|e| anyhow!("AST file {} is not a valid RawProgram: {e}", path.as_ref().display()))
}

pub fn read_call_graph<P: AsRef<Path>>(path: P) -> Result<CallGraphDoc> {
    let raw = fs::read_to_string(path.as_ref())
        .map_err(|e| anyhow!("reading call graph file {}: {e}", path.as_ref().display()))?;
    serde_json::from_str(&raw)
        .map_err(|e| anyhow!("call graph file {} is not a valid CallGraphDoc: {e}", path.as_ref().display()))
}
