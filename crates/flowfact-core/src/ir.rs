//! Normalized per-function intermediate representation (spec §3, §4.4).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::{FlowfactError, FlowfactResult};
use crate::ident::{CallsiteId, FuncId, StmtId, VarId};

pub const IR_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LitValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

/// `var(VarId) | lit(...) | undef | unknown`.
#[derive(Debug, Clone, PartialEq)]
pub enum RValue {
    Var(VarId),
    Lit(LitValue),
    Undef,
    Unknown,
}

impl RValue {
    pub fn as_var(&self) -> Option<VarId> {
        match self {
            RValue::Var(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKey {
    Named(String),
    Dynamic,
}

impl PropertyKey {
    /// The canonical property-name string used in `HeapId` (`"*"` for dynamic).
    pub fn as_heap_name(&self) -> &str {
        match self {
            PropertyKey::Named(n) => n,
            PropertyKey::Dynamic => crate::ident::DYNAMIC_PROPERTY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocKind {
    New,
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// A single IR statement. Every variant carries its anchor `StmtId`
/// (`CallsiteId` for `Call`, which is the same underlying type).
#[derive(Debug, Clone)]
pub enum IrStmt {
    Assign { anchor: StmtId, dst: VarId, src: RValue },
    Return { anchor: StmtId, value: Option<RValue> },
    Call { anchor: CallsiteId, dst: Option<VarId>, callee: RValue, args: Vec<RValue> },
    Await { anchor: StmtId, dst: VarId, src: RValue },
    Alloc { anchor: StmtId, dst: VarId, kind: AllocKind, ctor: Option<RValue>, args: Vec<RValue> },
    MemberRead { anchor: StmtId, dst: VarId, object: VarId, property: PropertyKey, optional: bool },
    MemberWrite { anchor: StmtId, object: VarId, property: PropertyKey, value: RValue, optional: bool },
    Select { anchor: StmtId, dst: VarId, cond: RValue, then_value: RValue, else_value: RValue },
    ShortCircuit { anchor: StmtId, dst: VarId, op: LogicalOp, lhs: RValue, rhs: RValue },
}

impl IrStmt {
    pub fn anchor(&self) -> &StmtId {
        match self {
            IrStmt::Assign { anchor, .. }
            | IrStmt::Return { anchor, .. }
            | IrStmt::Call { anchor, .. }
            | IrStmt::Await { anchor, .. }
            | IrStmt::Alloc { anchor, .. }
            | IrStmt::MemberRead { anchor, .. }
            | IrStmt::MemberWrite { anchor, .. }
            | IrStmt::Select { anchor, .. }
            | IrStmt::ShortCircuit { anchor, .. } => anchor,
        }
    }

    /// The destination variable this statement writes to, if any.
    pub fn dst(&self) -> Option<VarId> {
        match self {
            IrStmt::Assign { dst, .. } => Some(*dst),
            IrStmt::Return { .. } => None,
            IrStmt::Call { dst, .. } => *dst,
            IrStmt::Await { dst, .. } => Some(*dst),
            IrStmt::Alloc { dst, .. } => Some(*dst),
            IrStmt::MemberRead { dst, .. } => Some(*dst),
            IrStmt::MemberWrite { .. } => None,
            IrStmt::Select { dst, .. } => Some(*dst),
            IrStmt::ShortCircuit { dst, .. } => Some(*dst),
        }
    }

    /// Every `VarId` referenced anywhere in this statement (dst and operands).
    pub fn referenced_vars(&self) -> Vec<VarId> {
        fn push_rv(out: &mut Vec<VarId>, rv: &RValue) {
            if let RValue::Var(v) = rv {
                out.push(*v);
            }
        }
        let mut out = Vec::new();
        if let Some(d) = self.dst() {
            out.push(d);
        }
        match self {
            IrStmt::Assign { src, .. } => push_rv(&mut out, src),
            IrStmt::Return { value, .. } => {
                if let Some(v) = value {
                    push_rv(&mut out, v);
                }
            }
            IrStmt::Call { callee, args, .. } => {
                push_rv(&mut out, callee);
                for a in args {
                    push_rv(&mut out, a);
                }
            }
            IrStmt::Await { src, .. } => push_rv(&mut out, src),
            IrStmt::Alloc { ctor, args, .. } => {
                if let Some(c) = ctor {
                    push_rv(&mut out, c);
                }
                for a in args {
                    push_rv(&mut out, a);
                }
            }
            IrStmt::MemberRead { object, .. } => out.push(*object),
            IrStmt::MemberWrite { object, value, .. } => {
                out.push(*object);
                push_rv(&mut out, value);
            }
            IrStmt::Select { cond, then_value, else_value, .. } => {
                push_rv(&mut out, cond);
                push_rv(&mut out, then_value);
                push_rv(&mut out, else_value);
            }
            IrStmt::ShortCircuit { lhs, rhs, .. } => {
                push_rv(&mut out, lhs);
                push_rv(&mut out, rhs);
            }
        }
        out
    }
}

/// `{ schemaVersion, funcId, params, locals, stmts }`, normalized.
#[derive(Debug, Clone)]
pub struct FuncIr {
    pub schema_version: u32,
    pub func_id: FuncId,
    pub params: Vec<VarId>,
    pub locals: Vec<VarId>,
    pub stmts: Vec<IrStmt>,
}

impl FuncIr {
    pub fn new(func_id: FuncId, params: Vec<VarId>, locals: Vec<VarId>, stmts: Vec<IrStmt>) -> Self {
        Self {
            schema_version: IR_SCHEMA_VERSION,
            func_id,
            params,
            locals,
            stmts,
        }
    }

    /// Validate and canonically sort. Consumes and returns `self` so callers
    /// cannot accidentally use a pre-normalization value afterward.
    pub fn normalize(mut self) -> FlowfactResult<Self> {
        for (i, p) in self.params.iter().enumerate() {
            if *p != VarId::Param(i as u64) {
                return Err(FlowfactError::invariant_violation(format!(
                    "params must be contiguous p0..pN, found {p} at position {i}"
                )));
            }
        }
        for (i, l) in self.locals.iter().enumerate() {
            if *l != VarId::Local(i as u64) {
                return Err(FlowfactError::invariant_violation(format!(
                    "locals must be contiguous v0..vM, found {l} at position {i}"
                )));
            }
        }

        let declared: BTreeSet<VarId> = self.params.iter().chain(self.locals.iter()).copied().collect();

        let mut seen_anchors: BTreeSet<StmtId> = BTreeSet::new();
        for stmt in &self.stmts {
            let anchor = stmt.anchor();
            if !anchor.belongs_to(&self.func_id) {
                return Err(FlowfactError::invariant_violation(format!(
                    "statement anchor {anchor} lies outside function {}",
                    self.func_id
                )));
            }
            if !seen_anchors.insert(anchor.clone()) {
                return Err(FlowfactError::invariant_violation(format!(
                    "duplicate statement anchor: {anchor}"
                )));
            }
            for v in stmt.referenced_vars() {
                if !declared.contains(&v) {
                    return Err(FlowfactError::invariant_violation(format!(
                        "undeclared variable {v} referenced at {anchor}"
                    )));
                }
            }
        }

        self.params.sort();
        self.locals.sort();
        self.stmts.sort_by(|a, b| a.anchor().cmp(b.anchor()));

        Ok(self)
    }
}
