//! Call-graph mapper (spec §4.8): resolves the external call graph's opaque
//! node ids and callsite spans into internal `FuncId`/`CallsiteId`s.
//!
//! Node and callsite resolution both go through the same path-resolution
//! ladder: strict mode demands an exact indexed source path; lenient mode
//! falls through normalization, case-insensitive match, and finally a
//! basename/segment-suffix match, warning on every fallback it takes.

use std::collections::HashMap;

use flowfact_core::callgraph::{CallGraphDoc, CgEdgeKind, CgNode};
use flowfact_core::config::CallGraphMode;
use flowfact_core::errors::{FlowfactError, FlowfactResult};
use flowfact_core::frontend::RawSpan;
use flowfact_core::ident::{CallsiteId, FuncId};

use crate::diag::Diagnostics;
use crate::index::FunctionIndex;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MappedCallEdge {
    pub caller_func_id: FuncId,
    pub callee_func_id: FuncId,
    pub callsite_id: CallsiteId,
}

fn normalize_path(p: &str) -> String {
    let mut s = p.replace('\\', "/");
    while s.contains("//") {
        s = s.replace("//", "/");
    }
    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    while let Some(rest) = s.strip_prefix('/') {
        s = rest.to_string();
    }
    s
}

/// Levenshtein distance over bytes, used only to rank candidates in a
/// strict-mode resolution failure message; not a correctness-relevant value.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<u8> = a.bytes().collect();
    let b: Vec<u8> = b.bytes().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        cur[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            cur[j] = (prev[j] + 1).min(cur[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

fn nearest_candidates(target: &str, indexed_paths: &[String], n: usize) -> Vec<String> {
    let mut scored: Vec<(usize, &String)> = indexed_paths.iter().map(|p| (edit_distance(target, p), p)).collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().take(n).map(|(_, p)| p.clone()).collect()
}

fn resolution_error(what: &str, target: &str, indexed_paths: &[String]) -> FlowfactError {
    let candidates = nearest_candidates(target, indexed_paths, 3);
    FlowfactError::resolution(format!(
        "{what} {target:?}: no match (nearest candidates: {})",
        candidates.join(", ")
    ))
}

/// Resolve `external` to one of `indexed_paths`, honoring `mode`. Every
/// fallback taken in lenient mode is recorded as a warning diagnostic keyed
/// to `subject`.
fn resolve_path(
    mode: CallGraphMode,
    external: &str,
    indexed_paths: &[String],
    diagnostics: &mut Diagnostics,
    subject: &str,
) -> FlowfactResult<String> {
    if mode == CallGraphMode::Strict {
        return indexed_paths
            .iter()
            .find(|p| p.as_str() == external)
            .cloned()
            .ok_or_else(|| resolution_error("unresolvable source path", external, indexed_paths));
    }

    let normalized_external = normalize_path(external);

    let exact: Vec<&String> = indexed_paths.iter().filter(|p| normalize_path(p) == normalized_external).collect();
    if exact.len() == 1 {
        return Ok(exact[0].clone());
    }
    if exact.len() > 1 {
        return Err(FlowfactError::resolution(format!("path {external:?} is ambiguous after normalization")));
    }

    let ci: Vec<&String> = indexed_paths
        .iter()
        .filter(|p| normalize_path(p).to_lowercase() == normalized_external.to_lowercase())
        .collect();
    if ci.len() == 1 {
        diagnostics.warning(
            ci[0].clone(),
            0,
            0,
            subject.to_string(),
            format!("resolved {external:?} to {:?} via case-insensitive match", ci[0]),
        );
        return Ok(ci[0].clone());
    }
    if ci.len() > 1 {
        return Err(FlowfactError::resolution(format!("path {external:?} is ambiguous under case-insensitive match")));
    }

    let ext_segments: Vec<&str> = normalized_external.split('/').filter(|s| !s.is_empty()).collect();
    for suffix_len in (1..=ext_segments.len()).rev() {
        let ext_suffix = &ext_segments[ext_segments.len() - suffix_len..];
        let matches: Vec<&String> = indexed_paths
            .iter()
            .filter(|p| {
                let norm = normalize_path(p);
                let segs: Vec<&str> = norm.split('/').filter(|s| !s.is_empty()).collect();
                segs.len() >= suffix_len && &segs[segs.len() - suffix_len..] == ext_suffix
            })
            .collect();
        if matches.len() == 1 {
            diagnostics.warning(
                matches[0].clone(),
                0,
                0,
                subject.to_string(),
                format!("resolved {external:?} to {:?} via {suffix_len}-segment suffix match", matches[0]),
            );
            return Ok(matches[0].clone());
        }
        if matches.len() > 1 {
            // A longer suffix might still disambiguate; only error once no
            // suffix length at all produced a unique match.
            continue;
        }
    }

    Err(resolution_error("unresolvable source path", external, indexed_paths))
}

/// Maps an external call graph onto the function index and per-function
/// call-span tables built during IR lowering.
pub struct CallGraphMapper<'a> {
    index: &'a FunctionIndex,
    call_spans: &'a HashMap<FuncId, Vec<(RawSpan, CallsiteId)>>,
    mode: CallGraphMode,
}

impl<'a> CallGraphMapper<'a> {
    pub fn new(
        index: &'a FunctionIndex,
        call_spans: &'a HashMap<FuncId, Vec<(RawSpan, CallsiteId)>>,
        mode: CallGraphMode,
    ) -> Self {
        Self { index, call_spans, mode }
    }

    fn indexed_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.index.all().iter().map(|e| e.file_path.clone()).collect();
        paths.sort();
        paths.dedup();
        paths
    }

    fn resolve_node(&self, node: &CgNode, indexed_paths: &[String], diagnostics: &mut Diagnostics) -> FlowfactResult<FuncId> {
        let path = resolve_path(self.mode, &node.file_path, indexed_paths, diagnostics, &node.id)?;
        self.index
            .by_span(&path, node.start_offset, node.end_offset)
            .map(|e| e.func_id.clone())
            .ok_or_else(|| {
                FlowfactError::resolution(format!(
                    "node {:?} has no indexed function at {path}:{}:{}",
                    node.id, node.start_offset, node.end_offset
                ))
            })
    }

    fn resolve_callsite(
        &self,
        caller: &FuncId,
        callsite_path: &str,
        start: u64,
        end: u64,
        indexed_paths: &[String],
        diagnostics: &mut Diagnostics,
    ) -> FlowfactResult<CallsiteId> {
        let path = resolve_path(self.mode, callsite_path, indexed_paths, diagnostics, caller.file_path.as_str())?;
        if path != caller.file_path {
            return Err(FlowfactError::resolution(format!(
                "callsite path {path:?} does not match caller {}'s file {:?}",
                caller, caller.file_path
            )));
        }
        let spans = self.call_spans.get(caller).map(|v| v.as_slice()).unwrap_or(&[]);
        let found = spans.iter().find(|(span, _)| span.start == start && span.end == end);
        let (_, callsite_id) = found.ok_or_else(|| {
            FlowfactError::resolution(format!("no callsite in {caller} matches span {start}:{end}"))
        })?;
        if !callsite_id.belongs_to(caller) {
            return Err(FlowfactError::invariant_violation(format!(
                "resolved callsite {callsite_id} does not belong to caller {caller}"
            )));
        }
        Ok(callsite_id.clone())
    }

    /// Map every `call`-kind edge in `doc`. Every edge is attempted
    /// regardless of mode; a failing edge is dropped and recorded as an
    /// error diagnostic (spec §4.8's nearest-candidate message, when the
    /// failure is a path resolution miss) and mapping continues to the next
    /// edge. In strict mode, once every edge has been examined, any
    /// collected failures are elevated to a single fatal error carrying a
    /// summary of all of them (spec §4.8, §7) rather than aborting on the
    /// first one; in lenient mode they are returned as diagnostics for the
    /// caller to surface.
    pub fn map(&self, doc: &CallGraphDoc) -> FlowfactResult<(Vec<MappedCallEdge>, Diagnostics)> {
        let indexed_paths = self.indexed_paths();
        let mut diagnostics = Diagnostics::new();
        let mut nodes: HashMap<&str, &CgNode> = HashMap::new();
        for n in &doc.nodes {
            nodes.insert(n.id.as_str(), n);
        }

        let mut node_func_ids: HashMap<&str, FuncId> = HashMap::new();
        let mut mapped = Vec::new();

        for edge in &doc.edges {
            if matches!(edge.kind, Some(CgEdgeKind::Construct)) {
                continue;
            }

            let result = (|| -> FlowfactResult<MappedCallEdge> {
                let caller_node = nodes.get(edge.caller_id.as_str()).ok_or_else(|| {
                    FlowfactError::resolution(format!("edge refers to unknown caller node {:?}", edge.caller_id))
                })?;
                let callee_node = nodes.get(edge.callee_id.as_str()).ok_or_else(|| {
                    FlowfactError::resolution(format!("edge refers to unknown callee node {:?}", edge.callee_id))
                })?;

                let caller_func_id = match node_func_ids.get(edge.caller_id.as_str()) {
                    Some(f) => f.clone(),
                    None => {
                        let f = self.resolve_node(caller_node, &indexed_paths, &mut diagnostics)?;
                        node_func_ids.insert(edge.caller_id.as_str(), f.clone());
                        f
                    }
                };
                let callee_func_id = match node_func_ids.get(edge.callee_id.as_str()) {
                    Some(f) => f.clone(),
                    None => {
                        let f = self.resolve_node(callee_node, &indexed_paths, &mut diagnostics)?;
                        node_func_ids.insert(edge.callee_id.as_str(), f.clone());
                        f
                    }
                };

                let callsite_id = self.resolve_callsite(
                    &caller_func_id,
                    &edge.callsite.file_path,
                    edge.callsite.start_offset,
                    edge.callsite.end_offset,
                    &indexed_paths,
                    &mut diagnostics,
                )?;

                Ok(MappedCallEdge { caller_func_id, callee_func_id, callsite_id })
            })();

            match result {
                Ok(m) => mapped.push(m),
                Err(e) => {
                    diagnostics.error(
                        edge.callsite.file_path.clone(),
                        edge.callsite.start_offset,
                        edge.callsite.end_offset,
                        edge.caller_id.clone(),
                        e.to_string(),
                    );
                }
            }
        }

        mapped.sort();

        if self.mode == CallGraphMode::Strict && diagnostics.has_errors() {
            let failures = diagnostics.canonical();
            let summary = failures
                .iter()
                .map(|d| format!("{} ({}:{}-{}): {}", d.subject_id, d.file_path, d.start, d.end, d.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FlowfactError::resolution(format!(
                "call graph mapping failed in strict mode ({} failure(s)): {summary}",
                failures.len()
            )));
        }

        Ok((mapped, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfact_core::callgraph::{CgEdge, CgSpan};
    use flowfact_core::frontend::{RawFile, RawFunction, RawNode, RawProgram};
    use flowfact_core::ident::Span;

    fn simple_program() -> (RawProgram, FuncId, FuncId) {
        let callee = RawFunction {
            start: 0,
            end: 10,
            params: vec![],
            is_expr_body: false,
            body: vec![RawNode::Return { span: RawSpan { start: 1, end: 9 }, value: None }],
        };
        let caller = RawFunction {
            start: 20,
            end: 40,
            params: vec![],
            is_expr_body: false,
            body: vec![RawNode::ExprStmt {
                span: RawSpan { start: 21, end: 30 },
                expr: flowfact_core::frontend::RawExpr::Call {
                    span: RawSpan { start: 21, end: 30 },
                    callee: Box::new(flowfact_core::frontend::RawExpr::Var {
                        span: RawSpan { start: 21, end: 22 },
                        name: "callee".to_string(),
                    }),
                    args: vec![],
                },
            }],
        };
        let prog = RawProgram {
            frontend_schema_version: 1,
            files: vec![RawFile { path: "src/a.ts".to_string(), functions: vec![callee.clone(), caller.clone()] }],
        };
        let callee_id = FuncId::new("src/a.ts", Span::new(0, 10).unwrap()).unwrap();
        let caller_id = FuncId::new("src/a.ts", Span::new(20, 40).unwrap()).unwrap();
        (prog, caller_id, callee_id)
    }

    #[test]
    fn strict_mode_maps_exact_node_and_callsite() {
        let (prog, caller_id, callee_id) = simple_program();
        let index = FunctionIndex::build(&prog).unwrap();

        let mut spans = HashMap::new();
        spans.insert(caller_id.clone(), vec![(RawSpan { start: 21, end: 30 }, CallsiteId::new(caller_id.clone(), 0))]);

        let doc = CallGraphDoc {
            schema_version: 1,
            nodes: vec![
                CgNode { id: "caller".to_string(), name: None, file_path: "src/a.ts".to_string(), start_offset: 20, end_offset: 40 },
                CgNode { id: "callee".to_string(), name: None, file_path: "src/a.ts".to_string(), start_offset: 0, end_offset: 10 },
            ],
            edges: vec![CgEdge {
                caller_id: "caller".to_string(),
                callee_id: "callee".to_string(),
                callsite: CgSpan { file_path: "src/a.ts".to_string(), start_offset: 21, end_offset: 30 },
                kind: Some(CgEdgeKind::Call),
            }],
        };

        let mapper = CallGraphMapper::new(&index, &spans, CallGraphMode::Strict);
        let (mapped, diags) = mapper.map(&doc).unwrap();
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].caller_func_id, caller_id);
        assert_eq!(mapped[0].callee_func_id, callee_id);
        assert!(diags.is_empty());
    }

    #[test]
    fn lenient_mode_resolves_case_insensitive_path_with_warning() {
        let (prog, caller_id, _callee_id) = simple_program();
        let index = FunctionIndex::build(&prog).unwrap();
        let mut spans = HashMap::new();
        spans.insert(caller_id.clone(), vec![(RawSpan { start: 21, end: 30 }, CallsiteId::new(caller_id.clone(), 0))]);

        let doc = CallGraphDoc {
            schema_version: 1,
            nodes: vec![
                CgNode { id: "caller".to_string(), name: None, file_path: "SRC/A.TS".to_string(), start_offset: 20, end_offset: 40 },
                CgNode { id: "callee".to_string(), name: None, file_path: "src/a.ts".to_string(), start_offset: 0, end_offset: 10 },
            ],
            edges: vec![CgEdge {
                caller_id: "caller".to_string(),
                callee_id: "callee".to_string(),
                callsite: CgSpan { file_path: "SRC/A.TS".to_string(), start_offset: 21, end_offset: 30 },
                kind: Some(CgEdgeKind::Call),
            }],
        };

        let mapper = CallGraphMapper::new(&index, &spans, CallGraphMode::Lenient);
        let (mapped, diags) = mapper.map(&doc).unwrap();
        assert_eq!(mapped.len(), 1);
        assert!(!diags.is_empty());
    }

    #[test]
    fn strict_mode_consolidates_every_edges_failure_instead_of_failing_fast() {
        let (prog, caller_id, _callee_id) = simple_program();
        let index = FunctionIndex::build(&prog).unwrap();
        let mut spans = HashMap::new();
        spans.insert(caller_id.clone(), vec![(RawSpan { start: 21, end: 30 }, CallsiteId::new(caller_id.clone(), 0))]);

        // Two edges, both referencing callee nodes that don't exist at all —
        // neither is a path-resolution-ladder case, so each fails at
        // `resolve_node`'s "no indexed function" check. Both must show up in
        // the single consolidated error.
        let doc = CallGraphDoc {
            schema_version: 1,
            nodes: vec![CgNode {
                id: "caller".to_string(),
                name: None,
                file_path: "src/a.ts".to_string(),
                start_offset: 20,
                end_offset: 40,
            }],
            edges: vec![
                CgEdge {
                    caller_id: "caller".to_string(),
                    callee_id: "ghost-one".to_string(),
                    callsite: CgSpan { file_path: "src/a.ts".to_string(), start_offset: 21, end_offset: 30 },
                    kind: Some(CgEdgeKind::Call),
                },
                CgEdge {
                    caller_id: "caller".to_string(),
                    callee_id: "ghost-two".to_string(),
                    callsite: CgSpan { file_path: "src/a.ts".to_string(), start_offset: 21, end_offset: 30 },
                    kind: Some(CgEdgeKind::Call),
                },
            ],
        };

        let mapper = CallGraphMapper::new(&index, &spans, CallGraphMode::Strict);
        let err = mapper.map(&doc).unwrap_err().to_string();
        assert!(err.contains("2 failure"), "expected both failures counted, got: {err}");
        assert!(err.contains("ghost-one"), "expected first failure's node id in summary, got: {err}");
        assert!(err.contains("ghost-two"), "expected second failure's node id in summary, got: {err}");
    }

    #[test]
    fn construct_edges_are_skipped() {
        let (prog, caller_id, _callee_id) = simple_program();
        let index = FunctionIndex::build(&prog).unwrap();
        let spans = HashMap::new();

        let doc = CallGraphDoc {
            schema_version: 1,
            nodes: vec![CgNode { id: "caller".to_string(), name: None, file_path: "src/a.ts".to_string(), start_offset: 20, end_offset: 40 }],
            edges: vec![CgEdge {
                caller_id: "caller".to_string(),
                callee_id: "caller".to_string(),
                callsite: CgSpan { file_path: "src/a.ts".to_string(), start_offset: 21, end_offset: 30 },
                kind: Some(CgEdgeKind::Construct),
            }],
        };
        let mapper = CallGraphMapper::new(&index, &spans, CallGraphMode::Strict);
        let (mapped, _diags) = mapper.map(&doc).unwrap();
        assert!(mapped.is_empty());
        let _ = caller_id;
    }
}
