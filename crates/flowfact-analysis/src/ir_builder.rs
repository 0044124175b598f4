//! Lowers a function's raw AST body into Normalized FuncIR (spec §4.4).
//!
//! Anchors are assigned purely by allocation order: `StmtId` is
//! `(funcId, sequentialIndex)`, so "which site gets which id" is entirely a
//! function of the order this builder visits and emits statements in, not of
//! source spans. The walk is post-order for nested call/alloc/await operands
//! so a temporary's defining statement always gets a lower index than any
//! statement that reads it (`return f(x)` lowers the call before the
//! return; see the table in spec §4.4).

use std::collections::HashMap;

use flowfact_core::errors::FlowfactResult;
use flowfact_core::frontend::{RawExpr, RawFunction, RawLogicalOp, RawNode, RawPropKey, RawSpan};
use flowfact_core::ident::{CallsiteId, FuncId, StmtId, VarId};
use flowfact_core::ir::{AllocKind, FuncIr, IrStmt, LitValue, LogicalOp, PropertyKey, RValue};

/// A lowered function: its normalized IR plus the original source span of
/// every call expression it contains, keyed to the `CallsiteId` the builder
/// assigned it. The mapper (spec §4.8) needs this to resolve an externally
/// supplied callsite span back to an internal `CallsiteId` — something the
/// IR itself can no longer do once anchors are pure sequential indices.
pub struct FunctionLowering {
    pub ir: FuncIr,
    pub call_spans: Vec<(RawSpan, CallsiteId)>,
}

struct VarScope {
    names: HashMap<String, VarId>,
}

impl VarScope {
    fn get(&self, name: &str) -> Option<VarId> {
        self.names.get(name).copied()
    }
}

struct Builder {
    func_id: FuncId,
    params: Vec<VarId>,
    locals: Vec<VarId>,
    next_local: u64,
    next_index: u64,
    stmts: Vec<IrStmt>,
    call_spans: Vec<(RawSpan, CallsiteId)>,
    /// The reserved local standing in for `this` in this function, allocated
    /// lazily on first use (spec §4.4: "anonymous receivers for `this` uses
    /// are allocated on demand under a reserved local name"). Every `this`
    /// site in the function resolves to this same `VarId`.
    this_var: Option<VarId>,
}

impl Builder {
    fn next_stmt_id(&mut self) -> StmtId {
        let id = StmtId::new(self.func_id.clone(), self.next_index);
        self.next_index += 1;
        id
    }

    fn fresh_temp(&mut self) -> VarId {
        let v = VarId::Local(self.next_local);
        self.next_local += 1;
        self.locals.push(v);
        v
    }

    fn this_var(&mut self) -> VarId {
        if let Some(v) = self.this_var {
            v
        } else {
            let v = self.fresh_temp();
            self.this_var = Some(v);
            v
        }
    }

    fn simple_var(&mut self, expr: &RawExpr, vars: &VarScope) -> Option<VarId> {
        match expr.peel() {
            RawExpr::Var { name, .. } => vars.get(name),
            RawExpr::This { .. } => Some(self.this_var()),
            _ => None,
        }
    }

    fn property_key_of(&self, p: &RawPropKey) -> PropertyKey {
        match p {
            RawPropKey::Named(n) => PropertyKey::Named(n.clone()),
            RawPropKey::Computed(e) => match e.peel() {
                RawExpr::StrLit { value, .. } => PropertyKey::Named(value.clone()),
                _ => PropertyKey::Dynamic,
            },
        }
    }

    fn rvalue_of(&mut self, expr: &RawExpr, vars: &VarScope) -> RValue {
        match expr.peel() {
            RawExpr::Var { name, .. } => vars.get(name).map(RValue::Var).unwrap_or(RValue::Unknown),
            RawExpr::This { .. } => RValue::Var(self.this_var()),
            RawExpr::StrLit { value, .. } => RValue::Lit(LitValue::Str(value.clone())),
            RawExpr::NumLit { value, .. } => RValue::Lit(LitValue::Num(*value)),
            RawExpr::BoolLit { value, .. } => RValue::Lit(LitValue::Bool(*value)),
            RawExpr::NullLit { .. } => RValue::Lit(LitValue::Null),
            RawExpr::Undefined { .. } => RValue::Undef,
            _ => RValue::Unknown,
        }
    }

    /// Lower an expression used in "value position": any call/alloc/await it
    /// contains is materialized into a fresh temporary and consumed by
    /// reference, since the IR cannot inline a nested side-effecting form.
    fn lower_operand(&mut self, expr: &RawExpr, vars: &VarScope) -> FlowfactResult<RValue> {
        let peeled = expr.peel();
        match peeled {
            RawExpr::Call { span, callee, args, .. } => {
                let tmp = self.fresh_temp();
                self.lower_call(*span, callee, args, Some(tmp), vars)?;
                Ok(RValue::Var(tmp))
            }
            RawExpr::New { .. } | RawExpr::ObjectLit { .. } | RawExpr::ArrayLit { .. } => {
                let tmp = self.fresh_temp();
                self.lower_alloc_into(tmp, peeled, vars)?;
                Ok(RValue::Var(tmp))
            }
            RawExpr::Await { arg, .. } => {
                let tmp = self.fresh_temp();
                self.lower_await(arg, Some(tmp), vars)?;
                Ok(RValue::Var(tmp))
            }
            RawExpr::Member { object, property, optional, .. } => {
                if let Some(obj_var) = self.simple_var(object, vars) {
                    let tmp = self.fresh_temp();
                    let prop = self.property_key_of(property);
                    let anchor = self.next_stmt_id();
                    self.stmts.push(IrStmt::MemberRead {
                        anchor,
                        dst: tmp,
                        object: obj_var,
                        property: prop,
                        optional: *optional,
                    });
                    Ok(RValue::Var(tmp))
                } else {
                    Ok(RValue::Unknown)
                }
            }
            RawExpr::Cond { .. } | RawExpr::Logical { .. } => {
                let tmp = self.fresh_temp();
                self.lower_rhs_into(tmp, expr, vars)?;
                Ok(RValue::Var(tmp))
            }
            other => Ok(self.rvalue_of(other, vars)),
        }
    }

    fn lower_call(
        &mut self,
        call_span: RawSpan,
        callee: &RawExpr,
        args: &[RawExpr],
        dst: Option<VarId>,
        vars: &VarScope,
    ) -> FlowfactResult<StmtId> {
        let callee_rv = self.lower_operand(callee, vars)?;
        let mut arg_rvs = Vec::with_capacity(args.len());
        for a in args {
            arg_rvs.push(self.lower_operand(a, vars)?);
        }
        let anchor = self.next_stmt_id();
        self.call_spans.push((call_span, anchor.clone()));
        self.stmts.push(IrStmt::Call {
            anchor: anchor.clone(),
            dst,
            callee: callee_rv,
            args: arg_rvs,
        });
        Ok(anchor)
    }

    fn lower_alloc_into(&mut self, dst: VarId, expr: &RawExpr, vars: &VarScope) -> FlowfactResult<()> {
        match expr {
            RawExpr::New { ctor, args, .. } => {
                let ctor_rv = Some(self.lower_operand(ctor, vars)?);
                let mut arg_rvs = Vec::with_capacity(args.len());
                for a in args {
                    arg_rvs.push(self.lower_operand(a, vars)?);
                }
                let anchor = self.next_stmt_id();
                self.stmts.push(IrStmt::Alloc {
                    anchor,
                    dst,
                    kind: AllocKind::New,
                    ctor: ctor_rv,
                    args: arg_rvs,
                });
            }
            RawExpr::ObjectLit { .. } => {
                let anchor = self.next_stmt_id();
                self.stmts.push(IrStmt::Alloc { anchor, dst, kind: AllocKind::Object, ctor: None, args: vec![] });
            }
            RawExpr::ArrayLit { .. } => {
                let anchor = self.next_stmt_id();
                self.stmts.push(IrStmt::Alloc { anchor, dst, kind: AllocKind::Array, ctor: None, args: vec![] });
            }
            _ => unreachable!("lower_alloc_into called on non-alloc expr"),
        }
        Ok(())
    }

    fn lower_await(&mut self, arg: &RawExpr, dst: Option<VarId>, vars: &VarScope) -> FlowfactResult<()> {
        let dst = dst.unwrap_or_else(|| self.fresh_temp());
        let peeled = arg.peel();
        let src = if let RawExpr::Call { span, callee, args, .. } = peeled {
            let tmp = self.fresh_temp();
            self.lower_call(*span, callee, args, Some(tmp), vars)?;
            RValue::Var(tmp)
        } else {
            self.rvalue_of(peeled, vars)
        };
        let anchor = self.next_stmt_id();
        self.stmts.push(IrStmt::Await { anchor, dst, src });
        Ok(())
    }

    fn lower_member_read_into(
        &mut self,
        dst: VarId,
        object: &RawExpr,
        property: &RawPropKey,
        optional: bool,
        vars: &VarScope,
    ) -> FlowfactResult<()> {
        let anchor = self.next_stmt_id();
        if let Some(obj_var) = self.simple_var(object, vars) {
            let prop = self.property_key_of(property);
            self.stmts.push(IrStmt::MemberRead { anchor, dst, object: obj_var, property: prop, optional });
        } else {
            self.stmts.push(IrStmt::Assign { anchor, dst, src: RValue::Unknown });
        }
        Ok(())
    }

    /// The shared RHS dispatch used by `const x = ...` / `x = ...`, and by
    /// `lower_operand` for a ternary/logical expression materialized into a
    /// temp. Matches every row of spec §4.4's lowering table.
    fn lower_rhs_into(&mut self, dst: VarId, rhs: &RawExpr, vars: &VarScope) -> FlowfactResult<()> {
        let peeled = rhs.peel();

        if let RawExpr::Logical { op: RawLogicalOp::Nullish, left, .. } = peeled {
            if let RawExpr::Member { object, property, optional, .. } = left.peel() {
                return self.lower_member_read_into(dst, object, property, *optional, vars);
            }
        }

        match peeled {
            RawExpr::Call { span, callee, args, .. } => {
                self.lower_call(*span, callee, args, Some(dst), vars)?;
            }
            RawExpr::New { .. } | RawExpr::ObjectLit { .. } | RawExpr::ArrayLit { .. } => {
                self.lower_alloc_into(dst, peeled, vars)?;
            }
            RawExpr::Await { arg, .. } => {
                self.lower_await(arg, Some(dst), vars)?;
            }
            RawExpr::Member { object, property, optional, .. } => {
                self.lower_member_read_into(dst, object, property, *optional, vars)?;
            }
            RawExpr::Cond { cond, then_expr, else_expr, .. } => {
                let c = self.lower_operand(cond, vars)?;
                let t = self.lower_operand(then_expr, vars)?;
                let e = self.lower_operand(else_expr, vars)?;
                let anchor = self.next_stmt_id();
                self.stmts.push(IrStmt::Select { anchor, dst, cond: c, then_value: t, else_value: e });
            }
            RawExpr::Logical { op, left, right, .. } => {
                let l = self.lower_operand(left, vars)?;
                let r = self.lower_operand(right, vars)?;
                let anchor = self.next_stmt_id();
                self.stmts.push(IrStmt::ShortCircuit { anchor, dst, op: map_logical_op(op), lhs: l, rhs: r });
            }
            other => {
                let src = self.rvalue_of(other, vars);
                let anchor = self.next_stmt_id();
                self.stmts.push(IrStmt::Assign { anchor, dst, src });
            }
        }
        Ok(())
    }

    fn lower_member_write(
        &mut self,
        object: &RawExpr,
        property: &RawPropKey,
        optional: bool,
        value: &RawExpr,
        vars: &VarScope,
    ) -> FlowfactResult<()> {
        if let Some(obj_var) = self.simple_var(object, vars) {
            let prop = self.property_key_of(property);
            let val_rv = self.lower_operand(value, vars)?;
            let anchor = self.next_stmt_id();
            self.stmts.push(IrStmt::MemberWrite { anchor, object: obj_var, property: prop, value: val_rv, optional });
        } else {
            let _ = self.lower_operand(value, vars)?;
        }
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&RawExpr>, vars: &VarScope) -> FlowfactResult<()> {
        match value {
            None => {
                let anchor = self.next_stmt_id();
                self.stmts.push(IrStmt::Return { anchor, value: None });
            }
            Some(expr) => {
                let rv = self.lower_operand(expr, vars)?;
                let anchor = self.next_stmt_id();
                self.stmts.push(IrStmt::Return { anchor, value: Some(rv) });
            }
        }
        Ok(())
    }

    fn lower_expr_stmt(&mut self, expr: &RawExpr, vars: &VarScope) -> FlowfactResult<()> {
        let peeled = expr.peel();
        match peeled {
            RawExpr::Call { span, callee, args, .. } => {
                self.lower_call(*span, callee, args, None, vars)?;
            }
            RawExpr::Await { arg, .. } => {
                self.lower_await(arg, None, vars)?;
            }
            RawExpr::New { .. } | RawExpr::ObjectLit { .. } | RawExpr::ArrayLit { .. } => {
                let tmp = self.fresh_temp();
                self.lower_alloc_into(tmp, peeled, vars)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn lower_stmt_list(&mut self, nodes: &[RawNode], vars: &VarScope) -> FlowfactResult<()> {
        for node in nodes {
            match node {
                RawNode::ExprStmt { expr, .. } => self.lower_expr_stmt(expr, vars)?,
                RawNode::VarDecl { name, init, .. } => {
                    if let Some(dst) = vars.get(name) {
                        match init {
                            Some(e) => self.lower_rhs_into(dst, e, vars)?,
                            None => {
                                let anchor = self.next_stmt_id();
                                self.stmts.push(IrStmt::Assign { anchor, dst, src: RValue::Undef });
                            }
                        }
                    }
                }
                RawNode::Assign { target, value, .. } => match target {
                    flowfact_core::frontend::RawAssignTarget::Var(name) => {
                        if let Some(dst) = vars.get(name) {
                            self.lower_rhs_into(dst, value, vars)?;
                        }
                    }
                    flowfact_core::frontend::RawAssignTarget::Member { object, property, optional } => {
                        self.lower_member_write(object, property, *optional, value, vars)?;
                    }
                },
                RawNode::Return { value, .. } => self.lower_return(value.as_ref(), vars)?,
                RawNode::If { cond, then_branch, else_branch, .. } => {
                    let _ = self.lower_operand(cond, vars)?;
                    self.lower_stmt_list(then_branch, vars)?;
                    self.lower_stmt_list(else_branch, vars)?;
                }
                RawNode::Block { nodes } => self.lower_stmt_list(nodes, vars)?,
                RawNode::Generic { .. } | RawNode::Nested { .. } => {}
            }
        }
        Ok(())
    }
}

fn map_logical_op(op: &RawLogicalOp) -> LogicalOp {
    match op {
        RawLogicalOp::And => LogicalOp::And,
        RawLogicalOp::Or => LogicalOp::Or,
        RawLogicalOp::Nullish => LogicalOp::Nullish,
    }
}

/// Collect the names introduced by `VarDecl` in source order, skipping
/// nested function bodies (spec §4.4: "one `v` for each named declaration
/// in source order").
fn prescan_named_locals(nodes: &[RawNode], names: &mut Vec<String>) {
    for node in nodes {
        match node {
            RawNode::VarDecl { name, .. } => names.push(name.clone()),
            RawNode::Block { nodes } => prescan_named_locals(nodes, names),
            RawNode::If { then_branch, else_branch, .. } => {
                prescan_named_locals(then_branch, names);
                prescan_named_locals(else_branch, names);
            }
            RawNode::ExprStmt { .. } | RawNode::Assign { .. } | RawNode::Return { .. } | RawNode::Generic { .. } | RawNode::Nested { .. } => {}
        }
    }
}

/// Lower one function's body into Normalized FuncIR, plus the call-span
/// side table the mapper needs.
pub fn build_function_ir(func_id: FuncId, func: &RawFunction) -> FlowfactResult<FunctionLowering> {
    let mut param_names = HashMap::new();
    let mut params = Vec::with_capacity(func.params.len());
    for (i, name) in func.params.iter().enumerate() {
        let v = VarId::Param(i as u64);
        params.push(v);
        param_names.insert(name.clone(), v);
    }

    let mut local_names = Vec::new();
    if !func.is_expr_body {
        prescan_named_locals(&func.body, &mut local_names);
    }
    let mut names = param_names;
    let mut locals = Vec::with_capacity(local_names.len());
    for (i, name) in local_names.into_iter().enumerate() {
        let v = VarId::Local(i as u64);
        locals.push(v);
        names.insert(name, v);
    }
    let next_local = locals.len() as u64;

    let vars = VarScope { names };
    let mut builder = Builder {
        func_id: func_id.clone(),
        params,
        locals,
        next_local,
        next_index: 0,
        stmts: Vec::new(),
        call_spans: Vec::new(),
        this_var: None,
    };

    if func.is_expr_body {
        if let Some(RawNode::ExprStmt { expr, .. }) = func.body.first() {
            let rv = builder.lower_operand(expr, &vars)?;
            let anchor = builder.next_stmt_id();
            builder.stmts.push(IrStmt::Return { anchor, value: Some(rv) });
        }
    } else {
        builder.lower_stmt_list(&func.body, &vars)?;
    }

    let call_spans = builder.call_spans;
    let ir = FuncIr::new(func_id, builder.params, builder.locals, builder.stmts).normalize()?;
    Ok(FunctionLowering { ir, call_spans })
}
