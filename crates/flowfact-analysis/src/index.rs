//! Function, statement, and callsite indexing (spec §4.3).
//!
//! The function index is a standalone walk over the raw AST: every
//! function-like node with a body gets a `FuncId`, including nested ones,
//! each indexed independently and never descended into by an enclosing
//! function's statement walk.
//!
//! The statement and callsite indexes are *derived views* rather than a
//! second independent walk: `ir_builder` already assigns every `StmtId` by
//! allocation order while lowering a function's body, and a normalized
//! `FuncIr`'s statements are exactly the statement-index entries spec §4.3
//! describes. Maintaining a second walk that has to agree with the first on
//! every anchor would just be a second place for the same bug to hide.

use std::collections::BTreeMap;

use flowfact_core::errors::{FlowfactError, FlowfactResult};
use flowfact_core::frontend::{RawFunction, RawNode, RawProgram};
use flowfact_core::ident::{FuncId, StmtId};
use flowfact_core::ir::{FuncIr, IrStmt};

#[derive(Debug, Clone)]
pub struct IndexedFunction {
    pub func_id: FuncId,
    pub file_path: String,
    pub raw: RawFunction,
}

/// The program's function index: every function-like node, sorted by
/// `FuncId`, with lookup by id and by `(filePath, start, end)` span.
#[derive(Debug, Clone, Default)]
pub struct FunctionIndex {
    entries: Vec<IndexedFunction>,
    by_span: BTreeMap<(String, u64, u64), usize>,
}

impl FunctionIndex {
    pub fn build(prog: &RawProgram) -> FlowfactResult<Self> {
        let mut entries = Vec::new();
        let mut by_span = BTreeMap::new();
        for file in &prog.files {
            for func in &file.functions {
                index_function_recursive(&file.path, func, &mut entries, &mut by_span)?;
            }
        }
        entries.sort_by(|a, b| a.func_id.cmp(&b.func_id));
        // Spans were captured as insertion positions before the sort; rebuild
        // the lookup against the sorted vector.
        let mut by_span_sorted = BTreeMap::new();
        for (i, e) in entries.iter().enumerate() {
            by_span_sorted.insert((e.file_path.clone(), e.func_id.span.start, e.func_id.span.end), i);
        }
        Ok(Self { entries, by_span: by_span_sorted })
    }

    pub fn all(&self) -> &[IndexedFunction] {
        &self.entries
    }

    pub fn by_id(&self, func_id: &FuncId) -> Option<&IndexedFunction> {
        self.entries.iter().find(|e| &e.func_id == func_id)
    }

    pub fn by_span(&self, file_path: &str, start: u64, end: u64) -> Option<&IndexedFunction> {
        self.by_span
            .get(&(file_path.to_string(), start, end))
            .map(|&i| &self.entries[i])
    }
}

fn index_function_recursive(
    file_path: &str,
    func: &RawFunction,
    entries: &mut Vec<IndexedFunction>,
    by_span: &mut BTreeMap<(String, u64, u64), usize>,
) -> FlowfactResult<()> {
    let func_id = FuncId::new(file_path, func.span())?;
    let key = (file_path.to_string(), func.start, func.end);
    if by_span.insert(key, entries.len()).is_some() {
        return Err(FlowfactError::invariant_violation(format!(
            "duplicate function span at {file_path}:{}:{}",
            func.start, func.end
        )));
    }
    entries.push(IndexedFunction {
        func_id,
        file_path: file_path.to_string(),
        raw: func.clone(),
    });

    for node in &func.body {
        index_nested_functions(file_path, node, entries, by_span)?;
    }
    Ok(())
}

fn index_nested_functions(
    file_path: &str,
    node: &RawNode,
    entries: &mut Vec<IndexedFunction>,
    by_span: &mut BTreeMap<(String, u64, u64), usize>,
) -> FlowfactResult<()> {
    match node {
        RawNode::Nested { func } => index_function_recursive(file_path, func, entries, by_span),
        RawNode::Block { nodes } => {
            for n in nodes {
                index_nested_functions(file_path, n, entries, by_span)?;
            }
            Ok(())
        }
        RawNode::If { then_branch, else_branch, .. } => {
            for n in then_branch.iter().chain(else_branch.iter()) {
                index_nested_functions(file_path, n, entries, by_span)?;
            }
            Ok(())
        }
        RawNode::ExprStmt { .. } | RawNode::VarDecl { .. } | RawNode::Assign { .. } | RawNode::Return { .. } | RawNode::Generic { .. } => {
            Ok(())
        }
    }
}

/// A derived view over a normalized `FuncIr`'s statements, for lookups by
/// `StmtId` and the callsite projection (spec §4.3).
#[derive(Debug, Clone)]
pub struct StatementIndex<'a> {
    func_id: FuncId,
    stmts: &'a [IrStmt],
}

impl<'a> StatementIndex<'a> {
    pub fn from_ir(ir: &'a FuncIr) -> Self {
        Self { func_id: ir.func_id.clone(), stmts: &ir.stmts }
    }

    pub fn func_id(&self) -> &FuncId {
        &self.func_id
    }

    /// `ir.stmts` is already sorted by anchor post-`normalize()`, so this is
    /// the statement index in id order.
    pub fn all(&self) -> &'a [IrStmt] {
        self.stmts
    }

    pub fn by_id(&self, id: &StmtId) -> Option<&'a IrStmt> {
        self.stmts.binary_search_by(|s| s.anchor().cmp(id)).ok().map(|i| &self.stmts[i])
    }

    /// The subset of statements that are call expressions, in id order.
    pub fn callsites(&self) -> Vec<&'a IrStmt> {
        self.stmts.iter().filter(|s| matches!(s, IrStmt::Call { .. })).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowfact_core::frontend::{RawFile, RawSpan};

    fn leaf_fn(start: u64, end: u64) -> RawFunction {
        RawFunction {
            start,
            end,
            params: vec![],
            is_expr_body: false,
            body: vec![RawNode::Return { span: RawSpan { start: start + 1, end: end - 1 }, value: None }],
        }
    }

    #[test]
    fn indexes_top_level_functions_sorted_by_func_id() {
        let prog = RawProgram {
            frontend_schema_version: 1,
            files: vec![RawFile {
                path: "b.ts".to_string(),
                functions: vec![leaf_fn(10, 20), leaf_fn(0, 5)],
            }],
        };
        let idx = FunctionIndex::build(&prog).unwrap();
        assert_eq!(idx.all().len(), 2);
        assert_eq!(idx.all()[0].func_id.span.start, 0);
        assert_eq!(idx.all()[1].func_id.span.start, 10);
    }

    #[test]
    fn indexes_nested_function_independently() {
        let outer = RawFunction {
            start: 0,
            end: 30,
            params: vec![],
            is_expr_body: false,
            body: vec![RawNode::Nested { func: leaf_fn(5, 15) }],
        };
        let prog = RawProgram {
            frontend_schema_version: 1,
            files: vec![RawFile { path: "a.ts".to_string(), functions: vec![outer] }],
        };
        let idx = FunctionIndex::build(&prog).unwrap();
        assert_eq!(idx.all().len(), 2);
    }

    #[test]
    fn rejects_duplicate_function_span() {
        let prog = RawProgram {
            frontend_schema_version: 1,
            files: vec![RawFile {
                path: "a.ts".to_string(),
                functions: vec![leaf_fn(0, 10), leaf_fn(0, 10)],
            }],
        };
        assert!(FunctionIndex::build(&prog).is_err());
    }
}
