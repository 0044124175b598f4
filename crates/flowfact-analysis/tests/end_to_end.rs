//! End-to-end scenarios with literal values, mirroring the six worked
//! examples in the pipeline's design notes: build a `RawProgram`, run the
//! full pipeline, and assert on the exact facts produced.

use std::collections::HashMap;

use flowfact_analysis::emit::{canonicalize_facts, write_flow_facts};
use flowfact_analysis::index::FunctionIndex;
use flowfact_analysis::pipeline::run_pipeline;
use flowfact_core::callgraph::{CallGraphDoc, CgEdge, CgEdgeKind, CgNode, CgSpan};
use flowfact_core::config::AnalysisConfig;
use flowfact_core::facts::{FlowFact, FlowFactNode};
use flowfact_core::frontend::{
    RawAssignTarget, RawExpr, RawFile, RawFunction, RawLogicalOp, RawNode, RawProgram, RawPropKey, RawSpan,
};
use flowfact_core::ident::{HeapId, StmtId, VarId};

fn span(s: u64, e: u64) -> RawSpan {
    RawSpan { start: s, end: e }
}

fn empty_call_graph() -> CallGraphDoc {
    CallGraphDoc { schema_version: 1, nodes: vec![], edges: vec![] }
}

#[test]
fn scenario_1_identity_pipeline() {
    let func = RawFunction {
        start: 0,
        end: 30,
        params: vec!["x".to_string()],
        is_expr_body: false,
        body: vec![RawNode::Return {
            span: span(1, 20),
            value: Some(RawExpr::Var { span: span(17, 18), name: "x".to_string() }),
        }],
    };
    let prog = RawProgram {
        frontend_schema_version: 1,
        files: vec![RawFile { path: "src/id.ts".to_string(), functions: vec![func] }],
    };

    let index = FunctionIndex::build(&prog).unwrap();
    let f_id = index.by_span("src/id.ts", 0, 30).unwrap().func_id.clone();

    let config = AnalysisConfig::default();
    let output = run_pipeline(&prog, &empty_call_graph(), &config, None).unwrap();

    let expected = FlowFact::new(FlowFactNode::Var(f_id.clone(), VarId::Param(0)), FlowFactNode::Return(f_id));
    assert_eq!(output.facts.len(), 1);
    assert_eq!(output.facts[0], expected);
}

#[test]
fn scenario_3_dynamic_key_heap_write() {
    // function f(o, k, v) { o[k] = v; }
    let func = RawFunction {
        start: 0,
        end: 40,
        params: vec!["o".to_string(), "k".to_string(), "v".to_string()],
        is_expr_body: false,
        body: vec![RawNode::Assign {
            span: span(1, 10),
            target: RawAssignTarget::Member {
                object: Box::new(RawExpr::Var { span: span(1, 2), name: "o".to_string() }),
                property: RawPropKey::Computed(Box::new(RawExpr::Var { span: span(3, 4), name: "k".to_string() })),
                optional: false,
            },
            value: RawExpr::Var { span: span(6, 7), name: "v".to_string() },
        }],
    };
    let prog = RawProgram {
        frontend_schema_version: 1,
        files: vec![RawFile { path: "src/f.ts".to_string(), functions: vec![func] }],
    };

    let index = FunctionIndex::build(&prog).unwrap();
    let f_id = index.by_span("src/f.ts", 0, 40).unwrap().func_id.clone();

    let config = AnalysisConfig::default();
    let output = run_pipeline(&prog, &empty_call_graph(), &config, None).unwrap();

    let anchor_o = StmtId::new(f_id.clone(), config.anchor_bases.param_base);
    let expected = FlowFact::new(
        FlowFactNode::Var(f_id, VarId::Param(2)),
        FlowFactNode::HeapWrite(HeapId::new(anchor_o, "*")),
    );
    assert_eq!(output.facts.len(), 1);
    assert_eq!(output.facts[0], expected);
}

#[test]
fn scenario_4_optional_chain_nullish_read() {
    // function g(obj) { const v = obj?.value ?? "d"; return v; }
    let func = RawFunction {
        start: 0,
        end: 50,
        params: vec!["obj".to_string()],
        is_expr_body: false,
        body: vec![
            RawNode::VarDecl {
                span: span(1, 30),
                name: "v".to_string(),
                init: Some(RawExpr::Logical {
                    span: span(10, 30),
                    op: RawLogicalOp::Nullish,
                    left: Box::new(RawExpr::Member {
                        span: span(10, 20),
                        object: Box::new(RawExpr::Var { span: span(10, 13), name: "obj".to_string() }),
                        property: RawPropKey::Named("value".to_string()),
                        optional: true,
                    }),
                    right: Box::new(RawExpr::StrLit { span: span(24, 27), value: "d".to_string() }),
                }),
            },
            RawNode::Return { span: span(31, 45), value: Some(RawExpr::Var { span: span(38, 39), name: "v".to_string() }) },
        ],
    };
    let prog = RawProgram {
        frontend_schema_version: 1,
        files: vec![RawFile { path: "src/g.ts".to_string(), functions: vec![func] }],
    };

    let index = FunctionIndex::build(&prog).unwrap();
    let g_id = index.by_span("src/g.ts", 0, 50).unwrap().func_id.clone();

    let config = AnalysisConfig::default();
    let output = run_pipeline(&prog, &empty_call_graph(), &config, None).unwrap();

    let anchor_obj = StmtId::new(g_id.clone(), config.anchor_bases.param_base);
    let expected = FlowFact::new(
        FlowFactNode::HeapRead(HeapId::new(anchor_obj, "value")),
        FlowFactNode::Return(g_id),
    );
    assert!(output.facts.contains(&expected));
}

#[test]
fn scenario_5_heap_lifting_across_a_callsite() {
    // function setX(obj, val) { obj.x = val; }
    let set_x = RawFunction {
        start: 0,
        end: 30,
        params: vec!["obj".to_string(), "val".to_string()],
        is_expr_body: false,
        body: vec![RawNode::Assign {
            span: span(1, 15),
            target: RawAssignTarget::Member {
                object: Box::new(RawExpr::Var { span: span(1, 4), name: "obj".to_string() }),
                property: RawPropKey::Named("x".to_string()),
                optional: false,
            },
            value: RawExpr::Var { span: span(10, 13), name: "val".to_string() },
        }],
    };
    // function a(x, y) { setX(x, y); }
    let a = RawFunction {
        start: 40,
        end: 80,
        params: vec!["x".to_string(), "y".to_string()],
        is_expr_body: false,
        body: vec![RawNode::ExprStmt {
            span: span(41, 60),
            expr: RawExpr::Call {
                span: span(41, 55),
                callee: Box::new(RawExpr::Var { span: span(41, 45), name: "setX".to_string() }),
                args: vec![
                    RawExpr::Var { span: span(46, 47), name: "x".to_string() },
                    RawExpr::Var { span: span(49, 50), name: "y".to_string() },
                ],
            },
        }],
    };
    let prog = RawProgram {
        frontend_schema_version: 1,
        files: vec![RawFile { path: "src/a.ts".to_string(), functions: vec![set_x, a] }],
    };

    let index = FunctionIndex::build(&prog).unwrap();
    let set_x_id = index.by_span("src/a.ts", 0, 30).unwrap().func_id.clone();
    let a_id = index.by_span("src/a.ts", 40, 80).unwrap().func_id.clone();

    let call_graph = CallGraphDoc {
        schema_version: 1,
        nodes: vec![
            CgNode { id: "a".to_string(), name: None, file_path: "src/a.ts".to_string(), start_offset: 40, end_offset: 80 },
            CgNode { id: "setX".to_string(), name: None, file_path: "src/a.ts".to_string(), start_offset: 0, end_offset: 30 },
        ],
        edges: vec![CgEdge {
            caller_id: "a".to_string(),
            callee_id: "setX".to_string(),
            callsite: CgSpan { file_path: "src/a.ts".to_string(), start_offset: 41, end_offset: 55 },
            kind: Some(CgEdgeKind::Call),
        }],
    };

    let config = AnalysisConfig::default();
    let output = run_pipeline(&prog, &call_graph, &config, None).unwrap();

    let anchor_x = StmtId::new(a_id.clone(), config.anchor_bases.param_base);
    let expected = FlowFact::new(
        FlowFactNode::Var(a_id, VarId::Param(1)),
        FlowFactNode::HeapWrite(HeapId::new(anchor_x, "x")),
    );
    assert!(output.facts.contains(&expected), "missing lifted fact: {expected:?}\nall facts: {:#?}", output.facts);

    let _ = set_x_id;
}

#[test]
fn scenario_6_cache_determinism_writes_byte_identical_output_and_no_rewrite() {
    // Same two-hop program as the fixpoint's own unit test (b identity, a calls b).
    let b = RawFunction {
        start: 0,
        end: 20,
        params: vec!["y".to_string()],
        is_expr_body: false,
        body: vec![RawNode::Return {
            span: span(1, 19),
            value: Some(RawExpr::Var { span: span(17, 18), name: "y".to_string() }),
        }],
    };
    let a = RawFunction {
        start: 30,
        end: 70,
        params: vec!["x".to_string()],
        is_expr_body: false,
        body: vec![
            RawNode::VarDecl {
                span: span(31, 55),
                name: "v".to_string(),
                init: Some(RawExpr::Call {
                    span: span(40, 50),
                    callee: Box::new(RawExpr::Var { span: span(40, 41), name: "b".to_string() }),
                    args: vec![RawExpr::Var { span: span(42, 43), name: "x".to_string() }],
                }),
            },
            RawNode::Return { span: span(56, 69), value: Some(RawExpr::Var { span: span(63, 64), name: "v".to_string() }) },
        ],
    };
    let prog = RawProgram {
        frontend_schema_version: 1,
        files: vec![RawFile { path: "src/a.ts".to_string(), functions: vec![b, a] }],
    };

    let call_graph = CallGraphDoc {
        schema_version: 1,
        nodes: vec![
            CgNode { id: "a".to_string(), name: None, file_path: "src/a.ts".to_string(), start_offset: 30, end_offset: 70 },
            CgNode { id: "b".to_string(), name: None, file_path: "src/a.ts".to_string(), start_offset: 0, end_offset: 20 },
        ],
        edges: vec![CgEdge {
            caller_id: "a".to_string(),
            callee_id: "b".to_string(),
            callsite: CgSpan { file_path: "src/a.ts".to_string(), start_offset: 40, end_offset: 50 },
            kind: Some(CgEdgeKind::Call),
        }],
    };

    let config = AnalysisConfig::default();
    let cache_dir = tempfile::tempdir().unwrap();
    let cache = flowfact_cache::FuncSummaryCache::open(cache_dir.path());

    let first = run_pipeline(&prog, &call_graph, &config, Some(&cache)).unwrap();
    let mut cached_files_after_first: Vec<_> = walk_json(cache_dir.path());
    cached_files_after_first.sort();

    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("facts.jsonl");
    write_flow_facts(&out_path, first.facts.iter().cloned()).unwrap();
    let first_bytes = std::fs::read(&out_path).unwrap();
    let first_mtimes: HashMap<_, _> = cached_files_after_first
        .iter()
        .map(|p| (p.clone(), std::fs::metadata(p).unwrap().modified().unwrap()))
        .collect();

    let second = run_pipeline(&prog, &call_graph, &config, Some(&cache)).unwrap();
    let mut cached_files_after_second: Vec<_> = walk_json(cache_dir.path());
    cached_files_after_second.sort();
    assert_eq!(cached_files_after_first, cached_files_after_second, "second run must not create/remove cache entries");
    for path in &cached_files_after_second {
        let mtime = std::fs::metadata(path).unwrap().modified().unwrap();
        assert_eq!(first_mtimes[path], mtime, "second run must not rewrite {}", path.display());
    }

    write_flow_facts(&out_path, second.facts.iter().cloned()).unwrap();
    let second_bytes = std::fs::read(&out_path).unwrap();
    assert_eq!(first_bytes, second_bytes);

    assert_eq!(canonicalize_facts(first.facts), canonicalize_facts(second.facts));
}

fn walk_json(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.extend(walk_json(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("json") {
                out.push(path);
            }
        }
    }
    out
}
