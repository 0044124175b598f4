//! Hand-written JSON encode/decode for `FuncIr` and `FuncSummary`.
//!
//! Neither type derives `Serialize`/`Deserialize` in `flowfact-core` — like
//! `flowfact_core::facts::FlowFact`, they use canonical identifier strings
//! for every id-shaped field rather than a derived shape, so the on-disk and
//! cache-key representations stay a property of the identifier algebra, not
//! of serde's derive output. This module is the analysis crate's side of
//! that contract: it's the only place that needs to build or consume those
//! JSON values (the cache key derivation and the summary cache).

use serde_json::{json, Map, Value};

use flowfact_core::determinism::canonical_json::validate_finite;
use flowfact_core::errors::{FlowfactError, FlowfactResult};
use flowfact_core::ident::{CallsiteId, FuncId, HeapId, VarId};
use flowfact_core::ir::{AllocKind, FuncIr, IrStmt, LitValue, LogicalOp, PropertyKey, RValue};
use flowfact_core::summary::{FuncSummary, SummaryEdge, SummaryNode};

fn rvalue_to_json(rv: &RValue) -> Value {
    match rv {
        RValue::Var(v) => json!({"kind": "var", "id": v.to_canonical_string()}),
        RValue::Lit(LitValue::Str(s)) => json!({"kind": "lit", "type": "str", "value": s}),
        RValue::Lit(LitValue::Num(n)) => json!({"kind": "lit", "type": "num", "value": n}),
        RValue::Lit(LitValue::Bool(b)) => json!({"kind": "lit", "type": "bool", "value": b}),
        RValue::Lit(LitValue::Null) => json!({"kind": "lit", "type": "null"}),
        RValue::Undef => json!({"kind": "undef"}),
        RValue::Unknown => json!({"kind": "unknown"}),
    }
}

fn rvalue_from_json(v: &Value) -> FlowfactResult<RValue> {
    let kind = v["kind"].as_str().ok_or_else(|| FlowfactError::schema_violation("rvalue missing kind"))?;
    match kind {
        "var" => {
            let id = v["id"].as_str().ok_or_else(|| FlowfactError::schema_violation("rvalue var missing id"))?;
            Ok(RValue::Var(VarId::parse(id)?))
        }
        "lit" => match v["type"].as_str() {
            Some("str") => Ok(RValue::Lit(LitValue::Str(
                v["value"].as_str().ok_or_else(|| FlowfactError::schema_violation("lit str missing value"))?.to_string(),
            ))),
            Some("num") => Ok(RValue::Lit(LitValue::Num(
                v["value"].as_f64().ok_or_else(|| FlowfactError::schema_violation("lit num missing value"))?,
            ))),
            Some("bool") => Ok(RValue::Lit(LitValue::Bool(
                v["value"].as_bool().ok_or_else(|| FlowfactError::schema_violation("lit bool missing value"))?,
            ))),
            Some("null") => Ok(RValue::Lit(LitValue::Null)),
            _ => Err(FlowfactError::schema_violation("unknown lit type")),
        },
        "undef" => Ok(RValue::Undef),
        "unknown" => Ok(RValue::Unknown),
        other => Err(FlowfactError::schema_violation(format!("unknown rvalue kind: {other}"))),
    }
}

fn property_key_to_json(p: &PropertyKey) -> Value {
    match p {
        PropertyKey::Named(n) => json!({"kind": "named", "name": n}),
        PropertyKey::Dynamic => json!({"kind": "dynamic"}),
    }
}

fn property_key_from_json(v: &Value) -> FlowfactResult<PropertyKey> {
    match v["kind"].as_str() {
        Some("named") => Ok(PropertyKey::Named(
            v["name"].as_str().ok_or_else(|| FlowfactError::schema_violation("named property missing name"))?.to_string(),
        )),
        Some("dynamic") => Ok(PropertyKey::Dynamic),
        _ => Err(FlowfactError::schema_violation("unknown property key kind")),
    }
}

fn logical_op_str(op: LogicalOp) -> &'static str {
    match op {
        LogicalOp::And => "and",
        LogicalOp::Or => "or",
        LogicalOp::Nullish => "nullish",
    }
}

fn logical_op_from_str(s: &str) -> FlowfactResult<LogicalOp> {
    match s {
        "and" => Ok(LogicalOp::And),
        "or" => Ok(LogicalOp::Or),
        "nullish" => Ok(LogicalOp::Nullish),
        other => Err(FlowfactError::schema_violation(format!("unknown logical op: {other}"))),
    }
}

fn alloc_kind_str(k: AllocKind) -> &'static str {
    match k {
        AllocKind::New => "new",
        AllocKind::Object => "object",
        AllocKind::Array => "array",
    }
}

fn alloc_kind_from_str(s: &str) -> FlowfactResult<AllocKind> {
    match s {
        "new" => Ok(AllocKind::New),
        "object" => Ok(AllocKind::Object),
        "array" => Ok(AllocKind::Array),
        other => Err(FlowfactError::schema_violation(format!("unknown alloc kind: {other}"))),
    }
}

fn stmt_to_json(stmt: &IrStmt) -> Value {
    match stmt {
        IrStmt::Assign { anchor, dst, src } => json!({
            "op": "assign", "anchor": anchor.to_canonical_string(),
            "dst": dst.to_canonical_string(), "src": rvalue_to_json(src),
        }),
        IrStmt::Return { anchor, value } => json!({
            "op": "return", "anchor": anchor.to_canonical_string(),
            "value": value.as_ref().map(rvalue_to_json),
        }),
        IrStmt::Call { anchor, dst, callee, args } => json!({
            "op": "call", "anchor": anchor.to_canonical_string(),
            "dst": dst.map(|d| d.to_canonical_string()),
            "callee": rvalue_to_json(callee),
            "args": args.iter().map(rvalue_to_json).collect::<Vec<_>>(),
        }),
        IrStmt::Await { anchor, dst, src } => json!({
            "op": "await", "anchor": anchor.to_canonical_string(),
            "dst": dst.to_canonical_string(), "src": rvalue_to_json(src),
        }),
        IrStmt::Alloc { anchor, dst, kind, ctor, args } => json!({
            "op": "alloc", "anchor": anchor.to_canonical_string(),
            "dst": dst.to_canonical_string(), "allocKind": alloc_kind_str(*kind),
            "ctor": ctor.as_ref().map(rvalue_to_json),
            "args": args.iter().map(rvalue_to_json).collect::<Vec<_>>(),
        }),
        IrStmt::MemberRead { anchor, dst, object, property, optional } => json!({
            "op": "member_read", "anchor": anchor.to_canonical_string(),
            "dst": dst.to_canonical_string(), "object": object.to_canonical_string(),
            "property": property_key_to_json(property), "optional": optional,
        }),
        IrStmt::MemberWrite { anchor, object, property, value, optional } => json!({
            "op": "member_write", "anchor": anchor.to_canonical_string(),
            "object": object.to_canonical_string(), "property": property_key_to_json(property),
            "value": rvalue_to_json(value), "optional": optional,
        }),
        IrStmt::Select { anchor, dst, cond, then_value, else_value } => json!({
            "op": "select", "anchor": anchor.to_canonical_string(), "dst": dst.to_canonical_string(),
            "cond": rvalue_to_json(cond), "thenValue": rvalue_to_json(then_value), "elseValue": rvalue_to_json(else_value),
        }),
        IrStmt::ShortCircuit { anchor, dst, op, lhs, rhs } => json!({
            "op": "short_circuit", "anchor": anchor.to_canonical_string(), "dst": dst.to_canonical_string(),
            "logicalOp": logical_op_str(*op), "lhs": rvalue_to_json(lhs), "rhs": rvalue_to_json(rhs),
        }),
    }
}

fn stmt_from_json(v: &Value) -> FlowfactResult<IrStmt> {
    let op = v["op"].as_str().ok_or_else(|| FlowfactError::schema_violation("stmt missing op"))?;
    let anchor = CallsiteId::parse(v["anchor"].as_str().ok_or_else(|| FlowfactError::schema_violation("stmt missing anchor"))?)?;
    let var = |field: &str| -> FlowfactResult<VarId> {
        VarId::parse(v[field].as_str().ok_or_else(|| FlowfactError::schema_violation(format!("stmt missing {field}")))?)
    };
    match op {
        "assign" => Ok(IrStmt::Assign { anchor, dst: var("dst")?, src: rvalue_from_json(&v["src"])? }),
        "return" => {
            let value = if v["value"].is_null() { None } else { Some(rvalue_from_json(&v["value"])?) };
            Ok(IrStmt::Return { anchor, value })
        }
        "call" => {
            let dst = match v["dst"].as_str() {
                Some(s) => Some(VarId::parse(s)?),
                None => None,
            };
            let args = v["args"]
                .as_array()
                .ok_or_else(|| FlowfactError::schema_violation("call missing args"))?
                .iter()
                .map(rvalue_from_json)
                .collect::<FlowfactResult<Vec<_>>>()?;
            Ok(IrStmt::Call { anchor, dst, callee: rvalue_from_json(&v["callee"])?, args })
        }
        "await" => Ok(IrStmt::Await { anchor, dst: var("dst")?, src: rvalue_from_json(&v["src"])? }),
        "alloc" => {
            let kind = alloc_kind_from_str(v["allocKind"].as_str().ok_or_else(|| FlowfactError::schema_violation("alloc missing kind"))?)?;
            let ctor = if v["ctor"].is_null() { None } else { Some(rvalue_from_json(&v["ctor"])?) };
            let args = v["args"]
                .as_array()
                .ok_or_else(|| FlowfactError::schema_violation("alloc missing args"))?
                .iter()
                .map(rvalue_from_json)
                .collect::<FlowfactResult<Vec<_>>>()?;
            Ok(IrStmt::Alloc { anchor, dst: var("dst")?, kind, ctor, args })
        }
        "member_read" => Ok(IrStmt::MemberRead {
            anchor,
            dst: var("dst")?,
            object: var("object")?,
            property: property_key_from_json(&v["property"])?,
            optional: v["optional"].as_bool().unwrap_or(false),
        }),
        "member_write" => Ok(IrStmt::MemberWrite {
            anchor,
            object: var("object")?,
            property: property_key_from_json(&v["property"])?,
            value: rvalue_from_json(&v["value"])?,
            optional: v["optional"].as_bool().unwrap_or(false),
        }),
        "select" => Ok(IrStmt::Select {
            anchor,
            dst: var("dst")?,
            cond: rvalue_from_json(&v["cond"])?,
            then_value: rvalue_from_json(&v["thenValue"])?,
            else_value: rvalue_from_json(&v["elseValue"])?,
        }),
        "short_circuit" => Ok(IrStmt::ShortCircuit {
            anchor,
            dst: var("dst")?,
            op: logical_op_from_str(v["logicalOp"].as_str().ok_or_else(|| FlowfactError::schema_violation("short_circuit missing op"))?)?,
            lhs: rvalue_from_json(&v["lhs"])?,
            rhs: rvalue_from_json(&v["rhs"])?,
        }),
        other => Err(FlowfactError::schema_violation(format!("unknown stmt op: {other}"))),
    }
}

/// Canonical JSON for a normalized `FuncIr`, used both as the cache key's
/// input and (in the explain bundle) as a readable artifact. Validated for
/// finiteness here (`flowfact_core::determinism::canonical_json`'s
/// invariant) rather than leaving that to whatever eventually serializes it,
/// since a `NumLit` literal is the one place a non-finite `f64` from the
/// source program could otherwise reach this layer unchecked.
pub fn ir_to_json(ir: &FuncIr) -> FlowfactResult<Value> {
    let mut obj = Map::new();
    obj.insert("schemaVersion".to_string(), json!(ir.schema_version));
    obj.insert("funcId".to_string(), json!(ir.func_id.to_canonical_string()));
    obj.insert("params".to_string(), json!(ir.params.iter().map(|p| p.to_canonical_string()).collect::<Vec<_>>()));
    obj.insert("locals".to_string(), json!(ir.locals.iter().map(|l| l.to_canonical_string()).collect::<Vec<_>>()));
    obj.insert("stmts".to_string(), json!(ir.stmts.iter().map(stmt_to_json).collect::<Vec<_>>()));
    let value = Value::Object(obj);
    validate_finite(&value)?;
    Ok(value)
}

pub fn ir_from_json(v: &Value) -> FlowfactResult<FuncIr> {
    let func_id = FuncId::parse(v["funcId"].as_str().ok_or_else(|| FlowfactError::schema_violation("ir missing funcId"))?)?;
    let ids = |field: &str| -> FlowfactResult<Vec<VarId>> {
        v[field]
            .as_array()
            .ok_or_else(|| FlowfactError::schema_violation(format!("ir missing {field}")))?
            .iter()
            .map(|x| VarId::parse(x.as_str().ok_or_else(|| FlowfactError::schema_violation("var id not a string"))?))
            .collect()
    };
    let params = ids("params")?;
    let locals = ids("locals")?;
    let stmts = v["stmts"]
        .as_array()
        .ok_or_else(|| FlowfactError::schema_violation("ir missing stmts"))?
        .iter()
        .map(stmt_from_json)
        .collect::<FlowfactResult<Vec<_>>>()?;
    FuncIr::new(func_id, params, locals, stmts).normalize()
}

fn summary_node_to_json(n: &SummaryNode) -> Value {
    match n {
        SummaryNode::Var(v) => json!({"kind": "var", "id": v.to_canonical_string()}),
        SummaryNode::CallArg(c, i) => json!({"kind": "call_arg", "callsiteId": c.to_canonical_string(), "index": i}),
        SummaryNode::HeapRead(h) => json!({"kind": "heap_read", "heapId": h.to_canonical_string()}),
        SummaryNode::HeapWrite(h) => json!({"kind": "heap_write", "heapId": h.to_canonical_string()}),
        SummaryNode::Return => json!({"kind": "return"}),
    }
}

fn summary_node_from_json(v: &Value) -> FlowfactResult<SummaryNode> {
    match v["kind"].as_str() {
        Some("var") => Ok(SummaryNode::Var(VarId::parse(v["id"].as_str().unwrap_or_default())?)),
        Some("call_arg") => Ok(SummaryNode::CallArg(
            CallsiteId::parse(v["callsiteId"].as_str().unwrap_or_default())?,
            v["index"].as_u64().ok_or_else(|| FlowfactError::schema_violation("call_arg missing index"))? as usize,
        )),
        Some("heap_read") => Ok(SummaryNode::HeapRead(HeapId::parse(v["heapId"].as_str().unwrap_or_default())?)),
        Some("heap_write") => Ok(SummaryNode::HeapWrite(HeapId::parse(v["heapId"].as_str().unwrap_or_default())?)),
        Some("return") => Ok(SummaryNode::Return),
        _ => Err(FlowfactError::schema_violation("unknown summary node kind")),
    }
}

pub fn summary_to_json(summary: &FuncSummary) -> FlowfactResult<Value> {
    let value = json!({
        "schemaVersion": summary.schema_version,
        "funcId": summary.func_id.to_canonical_string(),
        "edges": summary.edges.iter().map(|e| json!({
            "from": summary_node_to_json(&e.from),
            "to": summary_node_to_json(&e.to),
        })).collect::<Vec<_>>(),
    });
    validate_finite(&value)?;
    Ok(value)
}

pub fn summary_from_json(v: &Value) -> FlowfactResult<FuncSummary> {
    let func_id = FuncId::parse(v["funcId"].as_str().ok_or_else(|| FlowfactError::schema_violation("summary missing funcId"))?)?;
    let edges = v["edges"]
        .as_array()
        .ok_or_else(|| FlowfactError::schema_violation("summary missing edges"))?
        .iter()
        .map(|e| SummaryEdge::new(summary_node_from_json(&e["from"])?, summary_node_from_json(&e["to"])?))
        .collect::<FlowfactResult<Vec<_>>>()?;
    Ok(FuncSummary::new(func_id, edges).canonicalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfact_core::ident::{Span, StmtId};

    fn fid() -> FuncId {
        FuncId::new("a.ts", Span::new(0, 20).unwrap()).unwrap()
    }

    #[test]
    fn ir_round_trips_through_json() {
        let f = fid();
        let anchor = StmtId::new(f.clone(), 0);
        let ir = FuncIr::new(
            f,
            vec![VarId::Param(0)],
            vec![],
            vec![IrStmt::Return { anchor, value: Some(RValue::Var(VarId::Param(0))) }],
        )
        .normalize()
        .unwrap();

        let json = ir_to_json(&ir).unwrap();
        let back = ir_from_json(&json).unwrap();
        assert_eq!(back.stmts.len(), 1);
        assert_eq!(back.func_id, ir.func_id);
    }

    #[test]
    fn summary_round_trips_through_json() {
        let f = fid();
        let edge = SummaryEdge::new(SummaryNode::Var(VarId::Param(0)), SummaryNode::Return).unwrap();
        let summary = FuncSummary::new(f, vec![edge]).canonicalize();
        let json = summary_to_json(&summary).unwrap();
        let back = summary_from_json(&json).unwrap();
        assert_eq!(back.edges.len(), 1);
    }
}
