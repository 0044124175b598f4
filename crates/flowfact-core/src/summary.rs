//! Function summary schema (spec §3, §4.6).
//!
//! Type definitions only: schema-aware validation that needs the owning
//! function's IR and baseline edge set lives in `flowfact-analysis` (it is
//! the piece of the normalizer that needs more context than a bare model
//! type should carry).

use std::cmp::Ordering;

use crate::errors::{FlowfactError, FlowfactResult};
use crate::ident::{CallsiteId, FuncId, HeapId, VarId};

pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// `var(VarId) | call_arg(CallsiteId,index) | heap_read(HeapId) | heap_write(HeapId) | return`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SummaryNode {
    Var(VarId),
    CallArg(CallsiteId, usize),
    HeapRead(HeapId),
    HeapWrite(HeapId),
    Return,
}

impl SummaryNode {
    /// A small integer rank giving a total, constant-time ordering table
    /// across variants, per spec §9's "dispatch on node kind" design note.
    fn rank(&self) -> u8 {
        match self {
            SummaryNode::Var(_) => 0,
            SummaryNode::CallArg(_, _) => 1,
            SummaryNode::HeapRead(_) => 2,
            SummaryNode::HeapWrite(_) => 3,
            SummaryNode::Return => 4,
        }
    }

    pub fn is_valid_source(&self) -> bool {
        matches!(self, SummaryNode::Var(_) | SummaryNode::HeapRead(_))
    }

    pub fn is_valid_target(&self) -> bool {
        matches!(
            self,
            SummaryNode::Var(_) | SummaryNode::CallArg(_, _) | SummaryNode::HeapWrite(_) | SummaryNode::Return
        )
    }
}

impl PartialOrd for SummaryNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SummaryNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| match (self, other) {
            (SummaryNode::Var(a), SummaryNode::Var(b)) => a.cmp(b),
            (SummaryNode::CallArg(a, ai), SummaryNode::CallArg(b, bi)) => a.cmp(b).then(ai.cmp(bi)),
            (SummaryNode::HeapRead(a), SummaryNode::HeapRead(b)) => a.cmp(b),
            (SummaryNode::HeapWrite(a), SummaryNode::HeapWrite(b)) => a.cmp(b),
            (SummaryNode::Return, SummaryNode::Return) => Ordering::Equal,
            _ => Ordering::Equal,
        })
    }
}

/// `(from, to)` with the positional rules from spec §3: `from` must be a
/// `var`/`heap_read`; `to` must be a `var`/`call_arg`/`heap_write`/`return`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SummaryEdge {
    pub from: SummaryNode,
    pub to: SummaryNode,
}

impl SummaryEdge {
    pub fn new(from: SummaryNode, to: SummaryNode) -> FlowfactResult<Self> {
        if !from.is_valid_source() {
            return Err(FlowfactError::schema_violation(format!(
                "edge source in wrong position: {from:?}"
            )));
        }
        if !to.is_valid_target() {
            return Err(FlowfactError::schema_violation(format!(
                "edge target in wrong position: {to:?}"
            )));
        }
        Ok(Self { from, to })
    }
}

#[derive(Debug, Clone)]
pub struct FuncSummary {
    pub schema_version: u32,
    pub func_id: FuncId,
    pub edges: Vec<SummaryEdge>,
}

impl FuncSummary {
    pub fn new(func_id: FuncId, edges: Vec<SummaryEdge>) -> Self {
        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            func_id,
            edges,
        }
    }

    /// De-duplicate and stable-sort edges into canonical order.
    pub fn canonicalize(mut self) -> Self {
        self.edges.sort();
        self.edges.dedup();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::Span;

    fn fid() -> FuncId {
        FuncId::new("a.ts", Span::new(0, 10).unwrap()).unwrap()
    }

    #[test]
    fn rejects_return_as_source() {
        let e = SummaryEdge::new(SummaryNode::Return, SummaryNode::Var(VarId::Param(0)));
        assert!(e.is_err());
    }

    #[test]
    fn rejects_heap_read_as_target() {
        let anchor = crate::ident::StmtId::new(fid(), 0);
        let heap = HeapId::new(anchor, "x");
        let e = SummaryEdge::new(SummaryNode::Var(VarId::Param(0)), SummaryNode::HeapRead(heap));
        assert!(e.is_err());
    }

    #[test]
    fn canonicalize_dedups_and_sorts() {
        let e1 = SummaryEdge::new(SummaryNode::Var(VarId::Param(1)), SummaryNode::Return).unwrap();
        let e2 = SummaryEdge::new(SummaryNode::Var(VarId::Param(0)), SummaryNode::Return).unwrap();
        let summary = FuncSummary::new(fid(), vec![e1.clone(), e2.clone(), e2.clone()]).canonicalize();
        assert_eq!(summary.edges.len(), 2);
        assert_eq!(summary.edges[0], e2);
        assert_eq!(summary.edges[1], e1);
    }
}
