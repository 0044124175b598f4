//! flowfact-core
//!
//! Core primitives for the flowfact dataflow-fact pipeline:
//! - Canonical identifier algebra (`FuncId`, `StmtId`/`CallsiteId`, `VarId`, `HeapId`)
//! - Determinism kernel: canonical JSON, stable sorting, content hashing
//! - The frontend AST contract consumed by the analysis crate
//! - Normalized per-function IR, function summaries, flow facts
//! - The external call-graph input schema
//! - Analysis configuration and the error taxonomy

pub mod callgraph;
pub mod config;
pub mod determinism;
pub mod errors;
pub mod facts;
pub mod frontend;
pub mod ident;
pub mod ir;
pub mod summary;

pub use crate::errors::{FlowfactError, FlowfactResult};

/// Convenience re-exports for downstream crates.
pub mod prelude {
    pub use crate::callgraph::{CallGraphDoc, CgEdge, CgEdgeKind, CgNode, CgSpan};
    pub use crate::config::{AnalysisConfig, AnchorBases, CallGraphMode, SummaryLimits};
    pub use crate::determinism::canonical_json::canonical_json_bytes;
    pub use crate::determinism::hashing::{hash_bytes_hex, hash_cache_key};
    pub use crate::facts::{FlowFact, FlowFactNode};
    pub use crate::frontend::{RawExpr, RawFile, RawFunction, RawNode, RawProgram};
    pub use crate::ident::{CallsiteId, FuncId, HeapId, Span, StmtId, VarId};
    pub use crate::ir::{FuncIr, IrStmt, LogicalOp, PropertyKey, RValue};
    pub use crate::summary::{FuncSummary, SummaryEdge, SummaryNode};
    pub use crate::{FlowfactError, FlowfactResult};
}
