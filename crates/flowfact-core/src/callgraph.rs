//! External call-graph input schema (spec §6, "Call graph input").
//!
//! These types mirror the producer's JSON exactly; resolving them to
//! internal identifiers is the call-graph mapper's job (`flowfact-analysis`).

use serde::{Deserialize, Serialize};

pub const CALL_GRAPH_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CgNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub file_path: String,
    pub start_offset: u64,
    pub end_offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CgEdgeKind {
    Call,
    Construct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CgSpan {
    pub file_path: String,
    pub start_offset: u64,
    pub end_offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CgEdge {
    pub caller_id: String,
    pub callee_id: String,
    pub callsite: CgSpan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CgEdgeKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallGraphDoc {
    pub schema_version: u32,
    pub nodes: Vec<CgNode>,
    pub edges: Vec<CgEdge>,
}
