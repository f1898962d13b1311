use rustc_hash::FxHashMap;

use ember_ast::arena::ExprId;
use ember_ast::expr::Expr;
use ember_ast::local::LocalId;
use ember_ast::stmt::{ElseBody, IfStmt, Stmt};
use ember_ast::Ast;

/// Reference counts for every local reachable from a block.
///
/// Unlike the substitution walker, the collector descends everywhere:
/// nested bodies, table literals, and function bodies all contribute, so a
/// local captured by a closure is never mistaken for unused.
#[derive(Debug, Default)]
pub(crate) struct UseCounts {
    /// Total `Local` reference occurrences, assignment targets included.
    uses: FxHashMap<LocalId, u32>,
    /// References that are the root of an assignment's left-hand side.
    assign_roots: FxHashMap<LocalId, u32>,
}

impl UseCounts {
    pub fn uses(&self, local: LocalId) -> u32 {
        self.uses.get(&local).copied().unwrap_or(0)
    }

    pub fn is_assign_target(&self, local: LocalId) -> bool {
        self.assign_roots.get(&local).copied().unwrap_or(0) > 0
    }
}

pub(crate) fn count_uses(body: &[Stmt], ast: &Ast) -> UseCounts {
    let mut counts = UseCounts::default();
    for stmt in body {
        count_stmt(stmt, ast, &mut counts);
    }
    counts
}

fn count_stmt(stmt: &Stmt, ast: &Ast, counts: &mut UseCounts) {
    match stmt {
        Stmt::Do(body) => {
            for s in body {
                count_stmt(s, ast, counts);
            }
        }
        Stmt::If(if_stmt) => count_if(if_stmt, ast, counts),
        Stmt::While { condition, body } => {
            count_expr(*condition, ast, counts);
            for s in body {
                count_stmt(s, ast, counts);
            }
        }
        Stmt::Repeat { body, condition } => {
            for s in body {
                count_stmt(s, ast, counts);
            }
            count_expr(*condition, ast, counts);
        }
        Stmt::Break => {}
        Stmt::Return(values) => {
            for &v in values {
                count_expr(v, ast, counts);
            }
        }
        Stmt::Expr(e) => count_expr(*e, ast, counts),
        Stmt::Local { values, .. } => {
            for &v in values {
                count_expr(v, ast, counts);
            }
        }
        Stmt::LocalFunction { func, .. } => count_expr(*func, ast, counts),
        Stmt::For {
            from,
            to,
            step,
            body,
            ..
        } => {
            count_expr(*from, ast, counts);
            count_expr(*to, ast, counts);
            if let Some(step) = step {
                count_expr(*step, ast, counts);
            }
            for s in body {
                count_stmt(s, ast, counts);
            }
        }
        Stmt::ForIn { values, body, .. } => {
            for &v in values {
                count_expr(v, ast, counts);
            }
            for s in body {
                count_stmt(s, ast, counts);
            }
        }
        Stmt::Assign { targets, values } => {
            for &t in targets {
                if let Expr::Local { local, .. } = ast.exprs.get(t) {
                    *counts.assign_roots.entry(*local).or_insert(0) += 1;
                }
                count_expr(t, ast, counts);
            }
            for &v in values {
                count_expr(v, ast, counts);
            }
        }
        Stmt::Function { name, func } => {
            count_expr(*name, ast, counts);
            count_expr(*func, ast, counts);
        }
    }
}

fn count_if(if_stmt: &IfStmt, ast: &Ast, counts: &mut UseCounts) {
    count_expr(if_stmt.condition, ast, counts);
    for s in &if_stmt.then_body {
        count_stmt(s, ast, counts);
    }
    match if_stmt.else_body.as_deref() {
        Some(ElseBody::Else(body)) => {
            for s in body {
                count_stmt(s, ast, counts);
            }
        }
        Some(ElseBody::ElseIf(nested)) => count_if(nested, ast, counts),
        None => {}
    }
}

fn count_expr(id: ExprId, ast: &Ast, counts: &mut UseCounts) {
    match ast.exprs.get(id) {
        Expr::Local { local, .. } => {
            *counts.uses.entry(*local).or_insert(0) += 1;
        }
        Expr::Group(inner) => count_expr(*inner, ast, counts),
        Expr::Call { func, args, .. } => {
            count_expr(*func, ast, counts);
            for &a in args {
                count_expr(a, ast, counts);
            }
        }
        Expr::IndexName { expr, .. } => count_expr(*expr, ast, counts),
        Expr::IndexExpr { expr, index } => {
            count_expr(*expr, ast, counts);
            count_expr(*index, ast, counts);
        }
        Expr::Unary { expr, .. } => count_expr(*expr, ast, counts),
        Expr::Binary { left, right, .. } => {
            count_expr(*left, ast, counts);
            count_expr(*right, ast, counts);
        }
        Expr::Table { items } => {
            for item in items {
                if let Some(key) = item.key {
                    count_expr(key, ast, counts);
                }
                count_expr(item.value, ast, counts);
            }
        }
        Expr::Function(f) => {
            for s in &f.body {
                count_stmt(s, ast, counts);
            }
        }
        Expr::Nil
        | Expr::Bool(_)
        | Expr::Number(_)
        | Expr::String(_)
        | Expr::Global(_)
        | Expr::Varargs => {}
    }
}
