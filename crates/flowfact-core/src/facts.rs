//! Flow facts: the pipeline's final output (spec §3, §6, §4.10).

use std::cmp::Ordering;

use serde_json::{json, Value};

use crate::ident::{CallsiteId, FuncId, HeapId, VarId};

pub const FACT_SCHEMA_VERSION: u32 = 1;

/// `var(FuncId,VarId) | call_arg(CallsiteId,index) | heap_read(HeapId) |
/// heap_write(HeapId) | return(FuncId)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlowFactNode {
    Var(FuncId, VarId),
    CallArg(CallsiteId, usize),
    HeapRead(HeapId),
    HeapWrite(HeapId),
    Return(FuncId),
}

impl FlowFactNode {
    fn rank(&self) -> u8 {
        match self {
            FlowFactNode::Var(_, _) => 0,
            FlowFactNode::CallArg(_, _) => 1,
            FlowFactNode::HeapRead(_) => 2,
            FlowFactNode::HeapWrite(_) => 3,
            FlowFactNode::Return(_) => 4,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FlowFactNode::Var(f, v) => json!({
                "kind": "var",
                "funcId": f.to_canonical_string(),
                "id": v.to_canonical_string(),
            }),
            FlowFactNode::CallArg(c, i) => json!({
                "kind": "call_arg",
                "callsiteId": c.to_canonical_string(),
                "index": i,
            }),
            FlowFactNode::HeapRead(h) => json!({
                "kind": "heap_read",
                "heapId": h.to_canonical_string(),
            }),
            FlowFactNode::HeapWrite(h) => json!({
                "kind": "heap_write",
                "heapId": h.to_canonical_string(),
            }),
            FlowFactNode::Return(f) => json!({
                "kind": "return",
                "funcId": f.to_canonical_string(),
            }),
        }
    }

    /// A string usable as a stable sort/dedup key component.
    fn sort_key(&self) -> String {
        match self {
            FlowFactNode::Var(f, v) => format!("{f}|{v}"),
            FlowFactNode::CallArg(c, i) => format!("{c}|{i}"),
            FlowFactNode::HeapRead(h) => h.to_canonical_string(),
            FlowFactNode::HeapWrite(h) => h.to_canonical_string(),
            FlowFactNode::Return(f) => f.to_canonical_string(),
        }
    }
}

impl PartialOrd for FlowFactNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FlowFactNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.sort_key().cmp(&other.sort_key()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowFact {
    pub schema_version: u32,
    pub from: FlowFactNode,
    pub to: FlowFactNode,
}

impl FlowFact {
    pub fn new(from: FlowFactNode, to: FlowFactNode) -> Self {
        Self {
            schema_version: FACT_SCHEMA_VERSION,
            from,
            to,
        }
    }

    /// Composite `from→to` key used for de-duplication (spec §4.10).
    pub fn dedup_key(&self) -> String {
        format!("{}→{}", self.from.sort_key(), self.to.sort_key())
    }

    pub fn to_json(&self) -> Value {
        json!({
            "schemaVersion": self.schema_version,
            "from": self.from.to_json(),
            "to": self.to.to_json(),
        })
    }
}
