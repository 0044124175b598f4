//! Interprocedural propagation: the fixpoint (spec §4.9).
//!
//! Each function owns a local dependency graph seeded from its summary
//! edges. Calling into another function adds synthetic "lifted" edges
//! derived from the callee's currently-known effects; local reachability
//! from every parameter and heap-read source then yields that function's
//! FlowFacts. A FIFO worklist, seeded in canonical `FuncId` order, drives
//! functions to a fixpoint: popping a function whose fact set changed
//! re-enqueues its callers.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use flowfact_core::config::AnchorBases;
use flowfact_core::errors::{FlowfactError, FlowfactResult};
use flowfact_core::facts::{FlowFact, FlowFactNode};
use flowfact_core::ident::{CallsiteId, FuncId, HeapId, VarId};
use flowfact_core::ir::{FuncIr, IrStmt};
use flowfact_core::summary::{FuncSummary, SummaryNode};

use crate::cheap_pass::{param_index_of_anchor, AnchorMap};
use crate::mapper::MappedCallEdge;

/// Everything the fixpoint needs for one function: its IR (for parameter
/// count and callsite arg counts), its normalized summary (the local
/// graph's static seed), and the cheap pass's per-variable anchor map (to
/// resolve `anchor_F(a_k)` when lifting a callee's effects into this
/// function).
pub struct FuncContext {
    pub ir: FuncIr,
    pub summary: FuncSummary,
    pub anchors: AnchorMap,
}

struct Effects {
    /// param index `i` such that `p_i -> return`.
    param_to_return: BTreeSet<u64>,
    /// `(sourceParam, heapAnchorParam, property)` for `p_j -> heap_write(synth(k), prop)`.
    param_to_heap_write: BTreeSet<(u64, u64, String)>,
    /// `(heapAnchorParam, property)` for `heap_read(synth(k), prop) -> return`.
    heap_read_to_return: BTreeSet<(u64, String)>,
    /// `(srcAnchorParam, srcProp, dstAnchorParam, dstProp)` for a heap_read->heap_write chain.
    heap_read_to_heap_write: BTreeSet<(u64, String, u64, String)>,
}

fn compute_effects(g: &FuncId, bases: &AnchorBases, state: &BTreeSet<FlowFact>) -> Effects {
    let mut param_to_return = BTreeSet::new();
    let mut param_to_heap_write = BTreeSet::new();
    let mut heap_read_to_return = BTreeSet::new();
    let mut heap_read_to_heap_write = BTreeSet::new();

    for fact in state {
        match (&fact.from, &fact.to) {
            (FlowFactNode::Var(ff, VarId::Param(i)), FlowFactNode::Return(fr)) if ff == g && fr == g => {
                param_to_return.insert(*i);
            }
            (FlowFactNode::Var(ff, VarId::Param(j)), FlowFactNode::HeapWrite(h)) if ff == g => {
                if let Some(k) = param_index_of_anchor(g, bases, &h.anchor) {
                    param_to_heap_write.insert((*j, k, h.property.clone()));
                }
            }
            (FlowFactNode::HeapRead(h), FlowFactNode::Return(fr)) if fr == g => {
                if let Some(k) = param_index_of_anchor(g, bases, &h.anchor) {
                    heap_read_to_return.insert((k, h.property.clone()));
                }
            }
            (FlowFactNode::HeapRead(h1), FlowFactNode::HeapWrite(h2)) => {
                if let (Some(i), Some(j)) =
                    (param_index_of_anchor(g, bases, &h1.anchor), param_index_of_anchor(g, bases, &h2.anchor))
                {
                    heap_read_to_heap_write.insert((i, h1.property.clone(), j, h2.property.clone()));
                }
            }
            _ => {}
        }
    }

    Effects { param_to_return, param_to_heap_write, heap_read_to_return, heap_read_to_heap_write }
}

fn call_arg_var(ir: &FuncIr, callsite: &CallsiteId, index: usize) -> Option<VarId> {
    ir.stmts.iter().find_map(|s| match s {
        IrStmt::Call { anchor, args, .. } if anchor == callsite => args.get(index).and_then(|a| a.as_var()),
        _ => None,
    })
}

fn call_dst(ir: &FuncIr, callsite: &CallsiteId) -> Option<VarId> {
    ir.stmts.iter().find_map(|s| match s {
        IrStmt::Call { anchor, dst, .. } if anchor == callsite => *dst,
        _ => None,
    })
}

fn node_to_fact_node(func_id: &FuncId, node: &SummaryNode) -> FlowFactNode {
    match node {
        SummaryNode::Var(v) => FlowFactNode::Var(func_id.clone(), *v),
        SummaryNode::CallArg(c, i) => FlowFactNode::CallArg(c.clone(), *i),
        SummaryNode::HeapRead(h) => FlowFactNode::HeapRead(h.clone()),
        SummaryNode::HeapWrite(h) => FlowFactNode::HeapWrite(h.clone()),
        SummaryNode::Return => FlowFactNode::Return(func_id.clone()),
    }
}

/// Build the local graph for `func_id`: the summary's static edges plus
/// every lifted edge contributed by its mapped callsites, using each
/// callee's effects as computed from `states` (the fixpoint's current,
/// possibly-partial knowledge).
fn build_local_graph(
    ctx: &FuncContext,
    callees: &[(CallsiteId, FuncId)],
    states: &HashMap<FuncId, BTreeSet<FlowFact>>,
    bases: &AnchorBases,
) -> HashMap<SummaryNode, Vec<SummaryNode>> {
    let mut adjacency: HashMap<SummaryNode, Vec<SummaryNode>> = HashMap::new();
    for edge in &ctx.summary.edges {
        adjacency.entry(edge.from.clone()).or_default().push(edge.to.clone());
    }

    for (callsite, callee) in callees {
        let empty = BTreeSet::new();
        let callee_state = states.get(callee).unwrap_or(&empty);
        let effects = compute_effects(callee, bases, callee_state);

        for i in &effects.param_to_return {
            if let Some(dst) = call_dst(&ctx.ir, callsite) {
                adjacency.entry(SummaryNode::CallArg(callsite.clone(), *i as usize)).or_default().push(SummaryNode::Var(dst));
            }
        }

        for (j, k, prop) in &effects.param_to_heap_write {
            if let Some(a_k) = call_arg_var(&ctx.ir, callsite, *k as usize) {
                let anchor_fk = ctx.anchors.get(a_k).clone();
                let target = SummaryNode::HeapWrite(HeapId::new(anchor_fk, prop.clone()));
                adjacency
                    .entry(SummaryNode::CallArg(callsite.clone(), *j as usize))
                    .or_default()
                    .push(target);
            }
        }

        for (k, prop) in &effects.heap_read_to_return {
            if let (Some(a_k), Some(dst)) = (call_arg_var(&ctx.ir, callsite, *k as usize), call_dst(&ctx.ir, callsite)) {
                let anchor_fk = ctx.anchors.get(a_k).clone();
                let source = SummaryNode::HeapRead(HeapId::new(anchor_fk, prop.clone()));
                adjacency.entry(source).or_default().push(SummaryNode::Var(dst));
            }
        }

        for (i, p, j, q) in &effects.heap_read_to_heap_write {
            if let (Some(a_i), Some(a_j)) =
                (call_arg_var(&ctx.ir, callsite, *i as usize), call_arg_var(&ctx.ir, callsite, *j as usize))
            {
                let anchor_fi = ctx.anchors.get(a_i).clone();
                let anchor_fj = ctx.anchors.get(a_j).clone();
                let source = SummaryNode::HeapRead(HeapId::new(anchor_fi, p.clone()));
                let target = SummaryNode::HeapWrite(HeapId::new(anchor_fj, q.clone()));
                adjacency.entry(source).or_default().push(target);
            }
        }
    }

    adjacency
}

fn bfs_facts(func_id: &FuncId, adjacency: &HashMap<SummaryNode, Vec<SummaryNode>>, params: &[VarId]) -> BTreeSet<FlowFact> {
    let mut sources: Vec<SummaryNode> = params.iter().map(|p| SummaryNode::Var(*p)).collect();
    for node in adjacency.keys() {
        if matches!(node, SummaryNode::HeapRead(_)) {
            sources.push(node.clone());
        }
    }
    sources.sort();
    sources.dedup();

    let mut facts = BTreeSet::new();
    for source in &sources {
        let mut visited: HashSet<SummaryNode> = HashSet::new();
        let mut queue: VecDeque<SummaryNode> = VecDeque::new();
        visited.insert(source.clone());
        queue.push_back(source.clone());
        while let Some(node) = queue.pop_front() {
            if let Some(next) = adjacency.get(&node) {
                for n in next {
                    if visited.insert(n.clone()) {
                        if matches!(n, SummaryNode::Return | SummaryNode::CallArg(_, _) | SummaryNode::HeapWrite(_)) {
                            facts.insert(FlowFact::new(node_to_fact_node(func_id, source), node_to_fact_node(func_id, n)));
                        }
                        queue.push_back(n.clone());
                    }
                }
            }
        }
    }
    facts
}

/// Run the fixpoint to completion and return the union of every function's
/// final fact set. `max_steps` bounds the number of worklist pops; exceeding
/// it is a `FixpointOverflow`.
pub fn run_fixpoint(
    contexts: &HashMap<FuncId, FuncContext>,
    call_edges: &[MappedCallEdge],
    bases: &AnchorBases,
    max_steps: u64,
) -> FlowfactResult<BTreeSet<FlowFact>> {
    let mut callees_by_caller: HashMap<FuncId, Vec<(CallsiteId, FuncId)>> = HashMap::new();
    let mut callers_by_callee: HashMap<FuncId, Vec<FuncId>> = HashMap::new();

    for edge in call_edges {
        if !contexts.contains_key(&edge.caller_func_id) || !contexts.contains_key(&edge.callee_func_id) {
            return Err(FlowfactError::resolution(format!(
                "mapped call edge references a function with no IR/summary: {} -> {}",
                edge.caller_func_id, edge.callee_func_id
            )));
        }
        callees_by_caller
            .entry(edge.caller_func_id.clone())
            .or_default()
            .push((edge.callsite_id.clone(), edge.callee_func_id.clone()));
        callers_by_callee.entry(edge.callee_func_id.clone()).or_default().push(edge.caller_func_id.clone());
    }
    for callers in callers_by_callee.values_mut() {
        callers.sort();
        callers.dedup();
    }
    for callees in callees_by_caller.values_mut() {
        callees.sort();
    }

    let mut func_ids: Vec<FuncId> = contexts.keys().cloned().collect();
    func_ids.sort();

    let mut states: HashMap<FuncId, BTreeSet<FlowFact>> = func_ids.iter().map(|f| (f.clone(), BTreeSet::new())).collect();

    let mut queue: VecDeque<FuncId> = func_ids.iter().cloned().collect();
    let mut queued: HashSet<FuncId> = func_ids.iter().cloned().collect();

    let mut steps: u64 = 0;
    let no_callees = Vec::new();
    while let Some(func_id) = queue.pop_front() {
        queued.remove(&func_id);
        steps += 1;
        if steps > max_steps {
            return Err(FlowfactError::fixpoint_overflow(format!(
                "interprocedural fixpoint exceeded max_steps={max_steps}"
            )));
        }

        let ctx = contexts.get(&func_id).expect("queue only contains indexed functions");
        let callees = callees_by_caller.get(&func_id).unwrap_or(&no_callees);
        let adjacency = build_local_graph(ctx, callees, &states, bases);
        let new_facts = bfs_facts(&func_id, &adjacency, &ctx.ir.params);

        let changed = states.get(&func_id).map(|old| old != &new_facts).unwrap_or(true);
        states.insert(func_id.clone(), new_facts);

        if changed {
            if let Some(callers) = callers_by_callee.get(&func_id) {
                for caller in callers {
                    if queued.insert(caller.clone()) {
                        queue.push_back(caller.clone());
                    }
                }
            }
        }
    }

    let mut all = BTreeSet::new();
    for state in states.into_values() {
        all.extend(state);
    }
    Ok(all)
}
