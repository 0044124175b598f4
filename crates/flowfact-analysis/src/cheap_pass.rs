//! Cheap static pass: baseline dependency edges plus a coarse per-variable
//! heap anchor model (spec §4.5). No alias/points-to precision — anchors
//! are a deterministic, purely syntactic approximation of "which allocation
//! site does this value's heap identity belong to."

use std::collections::HashMap;

use flowfact_core::config::AnchorBases;
use flowfact_core::ident::{HeapId, StmtId, VarId};
use flowfact_core::ir::{FuncIr, IrStmt, PropertyKey, RValue};
use flowfact_core::summary::{SummaryEdge, SummaryNode};

/// `anchor(v)` for every declared variable, after a single forward pass over
/// `ir.stmts` (already sorted by anchor). Synthetic anchors for params/locals
/// are StmtIds drawn from the reserved `AnchorBases` ranges so they never
/// collide with a real statement index (spec §4.5, §9).
pub struct AnchorMap {
    anchors: HashMap<VarId, StmtId>,
}

impl AnchorMap {
    pub fn get(&self, v: VarId) -> &StmtId {
        self.anchors.get(&v).expect("every declared var has an anchor")
    }
}

fn synthetic_anchor(ir: &FuncIr, bases: &AnchorBases, v: VarId) -> StmtId {
    let index = match v {
        VarId::Param(i) => bases.param_base + i,
        VarId::Local(i) => bases.local_base + i,
    };
    StmtId::new(ir.func_id.clone(), index)
}

/// Inverse of the parameter half of `synthetic_anchor`: if `anchor` is
/// exactly `synth(func_id, i)` for some parameter index `i`, return `i`.
/// Used by the fixpoint to recognize "this heap bucket is rooted at one of
/// `G`'s own parameters" when deriving `G`'s effects (spec §4.9, §9).
pub fn param_index_of_anchor(func_id: &flowfact_core::ident::FuncId, bases: &AnchorBases, anchor: &StmtId) -> Option<u64> {
    if anchor.func_id != *func_id {
        return None;
    }
    let index = anchor.stmt_index;
    if index >= bases.param_base && index < bases.local_base {
        Some(index - bases.param_base)
    } else {
        None
    }
}

/// The result of the cheap pass: baseline summary edges plus the anchor map
/// used to derive `HeapId`s, so downstream stages (the normalizer, the
/// fixpoint's lifting rules) don't need to recompute anchors.
pub struct CheapPassResult {
    pub edges: Vec<SummaryEdge>,
    pub anchors: AnchorMap,
}

pub fn run_cheap_pass(ir: &FuncIr, bases: &AnchorBases) -> CheapPassResult {
    let mut anchors: HashMap<VarId, StmtId> = HashMap::new();
    for p in &ir.params {
        anchors.insert(*p, synthetic_anchor(ir, bases, *p));
    }
    for l in &ir.locals {
        anchors.insert(*l, synthetic_anchor(ir, bases, *l));
    }

    let mut edges = Vec::new();

    for stmt in &ir.stmts {
        match stmt {
            IrStmt::Assign { anchor, dst, src } => {
                match src {
                    RValue::Var(v) => {
                        edges.push(edge_var_to_var(*v, *dst));
                        let a = anchors.get(v).cloned().unwrap_or_else(|| anchor.clone());
                        anchors.insert(*dst, a);
                    }
                    _ => {
                        anchors.insert(*dst, anchor.clone());
                    }
                }
            }
            IrStmt::Return { value, .. } => {
                if let Some(RValue::Var(v)) = value {
                    edges.push(SummaryEdge::new(SummaryNode::Var(*v), SummaryNode::Return).expect("var->return is valid"));
                }
            }
            IrStmt::Call { anchor, dst, args, .. } => {
                for (i, a) in args.iter().enumerate() {
                    if let RValue::Var(v) = a {
                        edges.push(
                            SummaryEdge::new(SummaryNode::Var(*v), SummaryNode::CallArg(anchor.clone(), i))
                                .expect("var->call_arg is valid"),
                        );
                    }
                }
                if let Some(d) = dst {
                    anchors.insert(*d, anchor.clone());
                }
            }
            IrStmt::Await { anchor, dst, .. } => {
                anchors.insert(*dst, anchor.clone());
            }
            IrStmt::Alloc { anchor, dst, .. } => {
                anchors.insert(*dst, anchor.clone());
            }
            IrStmt::MemberRead { anchor, dst, object, property, .. } => {
                let obj_anchor = anchors.get(object).cloned().unwrap_or_else(|| anchor.clone());
                let heap = HeapId::new(obj_anchor, property.as_heap_name().to_string());
                edges.push(
                    SummaryEdge::new(SummaryNode::HeapRead(heap), SummaryNode::Var(*dst)).expect("heap_read->var is valid"),
                );
                anchors.insert(*dst, anchor.clone());
            }
            IrStmt::MemberWrite { object, property, value, .. } => {
                if let RValue::Var(v) = value {
                    if let Some(obj_anchor) = anchors.get(object).cloned() {
                        let heap = HeapId::new(obj_anchor, property.as_heap_name().to_string());
                        edges.push(
                            SummaryEdge::new(SummaryNode::Var(*v), SummaryNode::HeapWrite(heap))
                                .expect("var->heap_write is valid"),
                        );
                    }
                }
            }
            IrStmt::Select { anchor, dst, .. } | IrStmt::ShortCircuit { anchor, dst, .. } => {
                anchors.insert(*dst, anchor.clone());
            }
        }
    }

    edges.sort();
    edges.dedup();

    CheapPassResult { edges, anchors: AnchorMap { anchors } }
}

fn edge_var_to_var(src: VarId, dst: VarId) -> SummaryEdge {
    SummaryEdge::new(SummaryNode::Var(src), SummaryNode::Var(dst)).expect("var->var is valid")
}

/// Every `HeapId` reachable by the cheap pass, used by the normalizer's
/// baseline-coverage and HeapId-membership checks (spec §4.6).
pub fn heap_ids_in(edges: &[SummaryEdge]) -> Vec<HeapId> {
    let mut out = Vec::new();
    for e in edges {
        if let SummaryNode::HeapRead(h) = &e.from {
            out.push(h.clone());
        }
        if let SummaryNode::HeapWrite(h) = &e.to {
            out.push(h.clone());
        }
    }
    out.sort();
    out.dedup();
    out
}
