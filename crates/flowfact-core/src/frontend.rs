//! The frontend AST contract.
//!
//! Parsing JavaScript/TypeScript source text into an AST is out of scope for
//! this crate (it is the job of an external language frontend). What the
//! core pipeline actually consumes is this JSON-serializable shape: a
//! deliberately thin tree of statement and expression sites, each carrying
//! its own byte-offset span, sufficient for the statement-indexing walk
//! (spec §4.3) and the IR lowering table (spec §4.4) to operate on.
//!
//! Any real frontend only has to emit this shape.

use serde::{Deserialize, Serialize};

use crate::ident::Span;

pub const FRONTEND_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawProgram {
    pub frontend_schema_version: u32,
    pub files: Vec<RawFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFile {
    pub path: String,
    pub functions: Vec<RawFunction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFunction {
    pub start: u64,
    pub end: u64,
    pub params: Vec<String>,
    /// True for an expression-bodied arrow function: `(x) => x + 1`. The
    /// single `body` entry is then the implicit-return expression root
    /// wrapped in a synthetic `ExprStmt`, per spec §4.3.
    pub is_expr_body: bool,
    pub body: Vec<RawNode>,
}

impl RawFunction {
    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
        }
    }
}

/// A statement-level tree node. Every variant except `Block` is a
/// "statement site" in the sense of spec §4.3 and receives its own
/// `statementIndex` during indexing; `Block` is a plain container that the
/// walk descends into without assigning it an index of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawNode {
    ExprStmt { span: RawSpan, expr: RawExpr },
    VarDecl { span: RawSpan, name: String, init: Option<RawExpr> },
    Assign { span: RawSpan, target: RawAssignTarget, value: RawExpr },
    Return { span: RawSpan, value: Option<RawExpr> },
    If { span: RawSpan, cond: RawExpr, then_branch: Vec<RawNode>, else_branch: Vec<RawNode> },
    Block { nodes: Vec<RawNode> },
    /// Any other statement (loop, throw, try, switch, ...): counted as a
    /// single site with no substructure the builder needs to lower.
    Generic { span: RawSpan },
    /// A nested function-like node. Gets its own `FuncId` during indexing
    /// and is never descended into by the enclosing statement walk.
    Nested { func: RawFunction },
}

impl RawNode {
    /// The span used to anchor this node's `StmtId`, if it is a statement
    /// site (i.e. not `Block`, which has no anchor of its own).
    pub fn own_span(&self) -> Option<RawSpan> {
        match self {
            RawNode::ExprStmt { span, .. }
            | RawNode::VarDecl { span, .. }
            | RawNode::Assign { span, .. }
            | RawNode::Return { span, .. }
            | RawNode::If { span, .. }
            | RawNode::Generic { span } => Some(*span),
            RawNode::Block { .. } | RawNode::Nested { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RawAssignTarget {
    Var(String),
    Member { object: Box<RawExpr>, property: RawPropKey, optional: bool },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawSpan {
    pub start: u64,
    pub end: u64,
}

impl From<RawSpan> for Span {
    fn from(s: RawSpan) -> Self {
        Span {
            start: s.start,
            end: s.end,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RawLogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RawPropKey {
    Named(String),
    Computed(Box<RawExpr>),
}

/// An expression-level tree node, always carrying its own span. Anything not
/// representable here (complex destructuring targets, tagged templates,
/// etc.) is the frontend's job to degrade to `Unknown` — the builder never
/// needs to understand a source construct it wasn't told about, it only
/// needs to know it doesn't know (spec §4.4, §9's "polymorphic AST nodes"
/// design note).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawExpr {
    Var { span: RawSpan, name: String },
    /// The `this` receiver. A frontend emits this instead of
    /// `Var{name:"this"}` so `this` never has to be threaded through as a
    /// magic identifier string — see spec §4.4's "reserved local name" rule
    /// for anonymous `this` receivers.
    This { span: RawSpan },
    StrLit { span: RawSpan, value: String },
    NumLit { span: RawSpan, value: f64 },
    BoolLit { span: RawSpan, value: bool },
    NullLit { span: RawSpan },
    Undefined { span: RawSpan },
    Call { span: RawSpan, callee: Box<RawExpr>, args: Vec<RawExpr> },
    New { span: RawSpan, ctor: Box<RawExpr>, args: Vec<RawExpr> },
    Member { span: RawSpan, object: Box<RawExpr>, property: RawPropKey, optional: bool },
    Cond { span: RawSpan, cond: Box<RawExpr>, then_expr: Box<RawExpr>, else_expr: Box<RawExpr> },
    Logical { span: RawSpan, op: RawLogicalOp, left: Box<RawExpr>, right: Box<RawExpr> },
    Await { span: RawSpan, arg: Box<RawExpr> },
    ObjectLit { span: RawSpan },
    ArrayLit { span: RawSpan },
    Paren { span: RawSpan, inner: Box<RawExpr> },
    TypeCast { span: RawSpan, inner: Box<RawExpr> },
    NonNull { span: RawSpan, inner: Box<RawExpr> },
    As { span: RawSpan, inner: Box<RawExpr> },
    Unknown { span: RawSpan },
}

impl RawExpr {
    pub fn span(&self) -> RawSpan {
        match self {
            RawExpr::Var { span, .. }
            | RawExpr::This { span }
            | RawExpr::StrLit { span, .. }
            | RawExpr::NumLit { span, .. }
            | RawExpr::BoolLit { span, .. }
            | RawExpr::NullLit { span }
            | RawExpr::Undefined { span }
            | RawExpr::Call { span, .. }
            | RawExpr::New { span, .. }
            | RawExpr::Member { span, .. }
            | RawExpr::Cond { span, .. }
            | RawExpr::Logical { span, .. }
            | RawExpr::Await { span, .. }
            | RawExpr::ObjectLit { span }
            | RawExpr::ArrayLit { span }
            | RawExpr::Paren { span, .. }
            | RawExpr::TypeCast { span, .. }
            | RawExpr::NonNull { span, .. }
            | RawExpr::As { span, .. }
            | RawExpr::Unknown { span } => *span,
        }
    }

    /// Strip type/paren/non-null/as-cast wrappers, per spec §4.4: "All RHS
    /// expressions are stripped of type/paren/non-null/as-casts before
    /// lowering."
    pub fn peel(&self) -> &RawExpr {
        match self {
            RawExpr::Paren { inner, .. }
            | RawExpr::TypeCast { inner, .. }
            | RawExpr::NonNull { inner, .. }
            | RawExpr::As { inner, .. } => inner.peel(),
            other => other,
        }
    }
}
