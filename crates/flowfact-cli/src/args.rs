use clap::Parser;

/// Run the deterministic dataflow analysis and emit flow facts (spec.md §6).
#[derive(Parser, Debug, Clone)]
#[command(name = "flowfact", version, about = "Deterministic dataflow fact generator for JavaScript/TypeScript")]
pub struct Cli {
    /// Emit machine-readable JSON on stdout instead of pretty text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Project root directory, used to resolve call-graph paths in lenient
    /// mode and to anchor diagnostic messages. Required unless `--tsconfig`
    /// is given; either or both may be passed.
    #[arg(long)]
    pub repo: Option<String>,

    /// tsconfig.json path identifying the project's source set.
    #[arg(long)]
    pub tsconfig: Option<String>,

    /// Frontend AST JSON (a `RawProgram` document, spec.md §3's frontend
    /// contract). The core never parses source text itself.
    #[arg(long)]
    pub ast: String,

    /// External call graph JSON (spec.md §6).
    #[arg(long)]
    pub callgraph: String,

    /// Output path for the canonical flow-facts JSONL.
    #[arg(long)]
    pub out: String,

    /// Optional output path for function-level call-chain witnesses JSONL.
    #[arg(long)]
    pub witness: Option<String>,

    /// Optional output directory for per-function explain bundles.
    #[arg(long)]
    pub explain: Option<String>,

    /// Function-summary cache root. Omit to disable caching entirely.
    #[arg(long)]
    pub cache: Option<String>,

    /// Resolve call-graph node/callsite paths leniently (normalize, then
    /// case-insensitive, then basename/segment-suffix matching) instead of
    /// requiring an exact indexed path (spec.md §4.8).
    #[arg(long)]
    pub lenient: bool,
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.repo.is_none() && self.tsconfig.is_none() {
            anyhow::bail!("one of --repo or --tsconfig is required");
        }
        Ok(())
    }
}
