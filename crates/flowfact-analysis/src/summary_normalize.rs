//! Function summary normalizer (spec §4.6).
//!
//! Validates a candidate edge set against its owning `FuncIr` and the cheap
//! pass's baseline `HeapId`s, then de-duplicates, sorts, and bounds-checks
//! it into a canonical `FuncSummary`. There is no LLM extractor in this
//! crate, so in practice the only caller passes the cheap pass's own edges
//! straight through — but the validation exists independently of that,
//! since spec §4.6 defines it as a contract a hybrid extractor's output
//! must also satisfy.

use std::collections::{BTreeSet, HashMap};

use flowfact_core::config::SummaryLimits;
use flowfact_core::errors::{FlowfactError, FlowfactResult};
use flowfact_core::ident::{HeapId, VarId};
use flowfact_core::ir::{FuncIr, IrStmt};
use flowfact_core::summary::{FuncSummary, SummaryEdge, SummaryNode};

use crate::cheap_pass::heap_ids_in;

fn declared_vars(ir: &FuncIr) -> BTreeSet<VarId> {
    ir.params.iter().chain(ir.locals.iter()).copied().collect()
}

fn callsite_arg_counts(ir: &FuncIr) -> HashMap<flowfact_core::ident::CallsiteId, usize> {
    let mut out = HashMap::new();
    for stmt in &ir.stmts {
        if let IrStmt::Call { anchor, args, .. } = stmt {
            out.insert(anchor.clone(), args.len());
        }
    }
    out
}

fn check_var(declared: &BTreeSet<VarId>, v: VarId) -> FlowfactResult<()> {
    if declared.contains(&v) {
        Ok(())
    } else {
        Err(FlowfactError::invariant_violation(format!("undeclared variable in summary edge: {v}")))
    }
}

fn check_heap(
    ir: &FuncIr,
    baseline_heap: &BTreeSet<HeapId>,
    h: &HeapId,
) -> FlowfactResult<()> {
    if !h.anchor.belongs_to(&ir.func_id) {
        return Err(FlowfactError::invariant_violation(format!(
            "heap id {h} lies outside function {}",
            ir.func_id
        )));
    }
    if !baseline_heap.contains(h) {
        return Err(FlowfactError::invariant_violation(format!(
            "heap id {h} not reachable by the cheap pass (baseline coverage)"
        )));
    }
    Ok(())
}

fn check_node(
    ir: &FuncIr,
    declared: &BTreeSet<VarId>,
    baseline_heap: &BTreeSet<HeapId>,
    arg_counts: &HashMap<flowfact_core::ident::CallsiteId, usize>,
    node: &SummaryNode,
) -> FlowfactResult<()> {
    match node {
        SummaryNode::Var(v) => check_var(declared, *v),
        SummaryNode::CallArg(callsite, index) => {
            let count = arg_counts.get(callsite).ok_or_else(|| {
                FlowfactError::resolution(format!("call_arg refers to a non-call statement: {callsite}"))
            })?;
            if *index >= *count {
                return Err(FlowfactError::invariant_violation(format!(
                    "call_arg index {index} out of range (callsite has {count} args)"
                )));
            }
            Ok(())
        }
        SummaryNode::HeapRead(h) | SummaryNode::HeapWrite(h) => check_heap(ir, baseline_heap, h),
        SummaryNode::Return => Ok(()),
    }
}

/// Validate, de-duplicate, sort, and bounds-check a candidate edge set into
/// a `FuncSummary`. `baseline_edges` must be a subset of `candidate_edges`
/// (the baseline-coverage invariant); passing the cheap pass's own output
/// for both parameters always satisfies it trivially.
pub fn normalize_summary(
    ir: &FuncIr,
    baseline_edges: &[SummaryEdge],
    candidate_edges: Vec<SummaryEdge>,
    limits: &SummaryLimits,
) -> FlowfactResult<FuncSummary> {
    let declared = declared_vars(ir);
    let arg_counts = callsite_arg_counts(ir);
    let baseline_heap: BTreeSet<HeapId> = heap_ids_in(baseline_edges).into_iter().collect();

    for edge in &candidate_edges {
        check_node(ir, &declared, &baseline_heap, &arg_counts, &edge.from)?;
        check_node(ir, &declared, &baseline_heap, &arg_counts, &edge.to)?;
    }

    let summary = FuncSummary::new(ir.func_id.clone(), candidate_edges).canonicalize();

    if summary.edges.len() > limits.max_edges {
        return Err(FlowfactError::bounds_exceeded(format!(
            "summary for {} has {} edges, exceeding max_edges={}",
            ir.func_id,
            summary.edges.len(),
            limits.max_edges
        )));
    }

    let mut fanout: HashMap<&SummaryNode, usize> = HashMap::new();
    for edge in &summary.edges {
        let count = fanout.entry(&edge.from).or_insert(0);
        *count += 1;
        if *count > limits.max_fanout_per_source {
            return Err(FlowfactError::bounds_exceeded(format!(
                "source {:?} in {} exceeds max_fanout_per_source={}",
                edge.from, ir.func_id, limits.max_fanout_per_source
            )));
        }
    }

    let present: BTreeSet<&SummaryEdge> = summary.edges.iter().collect();
    for baseline in baseline_edges {
        if !present.contains(baseline) {
            return Err(FlowfactError::baseline_coverage_missing(format!(
                "baseline edge dropped from summary for {}: {:?} -> {:?}",
                ir.func_id, baseline.from, baseline.to
            )));
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfact_core::ident::{FuncId, Span, StmtId};
    use flowfact_core::ir::RValue;

    fn fid() -> FuncId {
        FuncId::new("a.ts", Span::new(0, 20).unwrap()).unwrap()
    }

    fn identity_ir() -> FuncIr {
        let f = fid();
        let anchor = StmtId::new(f.clone(), 0);
        FuncIr::new(
            f,
            vec![VarId::Param(0)],
            vec![],
            vec![IrStmt::Return { anchor, value: Some(RValue::Var(VarId::Param(0))) }],
        )
        .normalize()
        .unwrap()
    }

    #[test]
    fn accepts_baseline_only_summary() {
        let ir = identity_ir();
        let edge = SummaryEdge::new(SummaryNode::Var(VarId::Param(0)), SummaryNode::Return).unwrap();
        let summary = normalize_summary(&ir, &[edge.clone()], vec![edge], &SummaryLimits::default()).unwrap();
        assert_eq!(summary.edges.len(), 1);
    }

    #[test]
    fn rejects_undeclared_var_node() {
        let ir = identity_ir();
        let edge = SummaryEdge::new(SummaryNode::Var(VarId::Local(9)), SummaryNode::Return).unwrap();
        let res = normalize_summary(&ir, &[], vec![edge], &SummaryLimits::default());
        assert!(res.is_err());
    }

    #[test]
    fn rejects_dropped_baseline_edge() {
        let ir = identity_ir();
        let baseline = SummaryEdge::new(SummaryNode::Var(VarId::Param(0)), SummaryNode::Return).unwrap();
        let res = normalize_summary(&ir, &[baseline], vec![], &SummaryLimits::default());
        assert!(res.is_err());
    }

    #[test]
    fn rejects_exceeding_max_edges() {
        let ir = identity_ir();
        let edge = SummaryEdge::new(SummaryNode::Var(VarId::Param(0)), SummaryNode::Return).unwrap();
        let limits = SummaryLimits { max_edges: 0, max_fanout_per_source: 0 };
        let res = normalize_summary(&ir, &[], vec![edge], &limits);
        assert!(res.is_err());
    }
}
