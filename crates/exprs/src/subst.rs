use ember_ast::arena::ExprId;
use ember_ast::expr::Expr;
use ember_ast::local::LocalId;
use ember_ast::stmt::{ElseBody, IfStmt, Stmt};
use ember_ast::Ast;

/// What to put in place of a matched local reference.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Replacement {
    /// Overwrite the reference slot with a copy of this node (inlining).
    CopyOf(ExprId),
    /// Re-point the reference at another local (reassignment splitting).
    Rename(LocalId),
}

/// Substitute references to `target` within one statement.
///
/// Bounded traversal: descends grouped expressions, calls, indexing,
/// unary/binary operands, return and assignment lists, local initializers,
/// statement-level function name chains, and `if`/`while` conditions and
/// their direct bodies. Nested `do` blocks, `repeat`, `for` bodies, table
/// literals, and function bodies are boundaries. Returns the number of
/// replacements made.
pub(crate) fn substitute_stmt(
    stmt: &mut Stmt,
    ast: &mut Ast,
    target: LocalId,
    replacement: Replacement,
) -> u32 {
    match stmt {
        Stmt::Expr(e) => substitute_expr(*e, ast, target, replacement),
        Stmt::Return(values) => {
            let mut n = 0;
            for &v in values.iter() {
                n += substitute_expr(v, ast, target, replacement);
            }
            n
        }
        Stmt::Local { values, .. } => {
            let mut n = 0;
            for &v in values.iter() {
                n += substitute_expr(v, ast, target, replacement);
            }
            n
        }
        Stmt::Assign { targets, values } => {
            let mut n = 0;
            for &t in targets.iter() {
                n += substitute_expr(t, ast, target, replacement);
            }
            for &v in values.iter() {
                n += substitute_expr(v, ast, target, replacement);
            }
            n
        }
        Stmt::If(if_stmt) => substitute_if(if_stmt, ast, target, replacement),
        Stmt::While { condition, body } => {
            let mut n = substitute_expr(*condition, ast, target, replacement);
            for s in body.iter_mut() {
                n += substitute_stmt(s, ast, target, replacement);
            }
            n
        }
        Stmt::Function { name, .. } => substitute_expr(*name, ast, target, replacement),
        Stmt::Do(_)
        | Stmt::Repeat { .. }
        | Stmt::For { .. }
        | Stmt::ForIn { .. }
        | Stmt::LocalFunction { .. }
        | Stmt::Break => 0,
    }
}

fn substitute_if(
    if_stmt: &mut IfStmt,
    ast: &mut Ast,
    target: LocalId,
    replacement: Replacement,
) -> u32 {
    let mut n = substitute_expr(if_stmt.condition, ast, target, replacement);
    for s in if_stmt.then_body.iter_mut() {
        n += substitute_stmt(s, ast, target, replacement);
    }
    match if_stmt.else_body.as_deref_mut() {
        Some(ElseBody::Else(body)) => {
            for s in body.iter_mut() {
                n += substitute_stmt(s, ast, target, replacement);
            }
        }
        Some(ElseBody::ElseIf(nested)) => {
            n += substitute_if(nested, ast, target, replacement);
        }
        None => {}
    }
    n
}

/// Substitute within an expression tree, replacing matching reference
/// slots in place.
pub(crate) fn substitute_expr(
    id: ExprId,
    ast: &mut Ast,
    target: LocalId,
    replacement: Replacement,
) -> u32 {
    let expr = ast.exprs.get(id).clone();
    match expr {
        Expr::Local { local, .. } if local == target => {
            match replacement {
                Replacement::CopyOf(src) => ast.exprs.copy_node(id, src),
                Replacement::Rename(new_local) => ast.exprs.replace(
                    id,
                    Expr::Local {
                        local: new_local,
                        upvalue: false,
                    },
                ),
            }
            1
        }
        Expr::Group(inner) => substitute_expr(inner, ast, target, replacement),
        Expr::Call { func, args, .. } => {
            let mut n = substitute_expr(func, ast, target, replacement);
            for a in args {
                n += substitute_expr(a, ast, target, replacement);
            }
            n
        }
        Expr::IndexName { expr, .. } => substitute_expr(expr, ast, target, replacement),
        Expr::IndexExpr { expr, index } => {
            substitute_expr(expr, ast, target, replacement)
                + substitute_expr(index, ast, target, replacement)
        }
        Expr::Unary { expr, .. } => substitute_expr(expr, ast, target, replacement),
        Expr::Binary { left, right, .. } => {
            substitute_expr(left, ast, target, replacement)
                + substitute_expr(right, ast, target, replacement)
        }
        // boundaries: table literals and function bodies trap substitutions
        Expr::Table { .. } | Expr::Function(_) => 0,
        Expr::Local { .. }
        | Expr::Nil
        | Expr::Bool(_)
        | Expr::Number(_)
        | Expr::String(_)
        | Expr::Global(_)
        | Expr::Varargs => 0,
    }
}

/// Apply the substitution at the innermost statement that directly owns a
/// reference to `target`, searching `body` in order (nested function bodies
/// included). Used by the inline pass, which has already established that
/// exactly one reference exists.
pub(crate) fn substitute_at_reference(
    body: &mut [Stmt],
    ast: &mut Ast,
    target: LocalId,
    replacement: Replacement,
) -> bool {
    for stmt in body.iter_mut() {
        if directly_references(stmt, ast, target) {
            substitute_stmt(stmt, ast, target, replacement);
            return true;
        }
        if substitute_in_nested(stmt, ast, target, replacement) {
            return true;
        }
    }
    false
}

/// Recurse into the statement's nested bodies looking for the reference.
fn substitute_in_nested(
    stmt: &mut Stmt,
    ast: &mut Ast,
    target: LocalId,
    replacement: Replacement,
) -> bool {
    match stmt {
        Stmt::Do(body)
        | Stmt::While { body, .. }
        | Stmt::Repeat { body, .. }
        | Stmt::For { body, .. }
        | Stmt::ForIn { body, .. } => {
            substitute_at_reference(body, ast, target, replacement)
        }
        Stmt::If(if_stmt) => substitute_in_if(if_stmt, ast, target, replacement),
        Stmt::LocalFunction { func, .. } | Stmt::Function { func, .. } => {
            substitute_in_function(*func, ast, target, replacement)
        }
        Stmt::Expr(_) | Stmt::Return(_) | Stmt::Local { .. } | Stmt::Assign { .. } => {
            // function literals in expression position carry nested bodies
            for root in stmt_expr_roots(stmt) {
                if substitute_in_expr_functions(root, ast, target, replacement) {
                    return true;
                }
            }
            false
        }
        Stmt::Break => false,
    }
}

fn substitute_in_if(
    if_stmt: &mut IfStmt,
    ast: &mut Ast,
    target: LocalId,
    replacement: Replacement,
) -> bool {
    if substitute_at_reference(&mut if_stmt.then_body, ast, target, replacement) {
        return true;
    }
    match if_stmt.else_body.as_deref_mut() {
        Some(ElseBody::Else(body)) => substitute_at_reference(body, ast, target, replacement),
        Some(ElseBody::ElseIf(nested)) => substitute_in_if(nested, ast, target, replacement),
        None => false,
    }
}

/// Search function literals reachable from `id` for the reference.
fn substitute_in_expr_functions(
    id: ExprId,
    ast: &mut Ast,
    target: LocalId,
    replacement: Replacement,
) -> bool {
    let expr = ast.exprs.get(id).clone();
    match expr {
        Expr::Function(_) => substitute_in_function(id, ast, target, replacement),
        Expr::Group(inner) => substitute_in_expr_functions(inner, ast, target, replacement),
        Expr::Call { func, args, .. } => {
            if substitute_in_expr_functions(func, ast, target, replacement) {
                return true;
            }
            args.into_iter()
                .any(|a| substitute_in_expr_functions(a, ast, target, replacement))
        }
        Expr::IndexName { expr, .. } => {
            substitute_in_expr_functions(expr, ast, target, replacement)
        }
        Expr::IndexExpr { expr, index } => {
            substitute_in_expr_functions(expr, ast, target, replacement)
                || substitute_in_expr_functions(index, ast, target, replacement)
        }
        Expr::Unary { expr, .. } => substitute_in_expr_functions(expr, ast, target, replacement),
        Expr::Binary { left, right, .. } => {
            substitute_in_expr_functions(left, ast, target, replacement)
                || substitute_in_expr_functions(right, ast, target, replacement)
        }
        Expr::Table { items } => items.into_iter().any(|item| {
            item.key
                .is_some_and(|k| substitute_in_expr_functions(k, ast, target, replacement))
                || substitute_in_expr_functions(item.value, ast, target, replacement)
        }),
        _ => false,
    }
}

/// Recurse into a function literal's body (taken out of the arena for the
/// duration so the walker can borrow it mutably).
fn substitute_in_function(
    id: ExprId,
    ast: &mut Ast,
    target: LocalId,
    replacement: Replacement,
) -> bool {
    let mut body = match ast.exprs.get_mut(id) {
        Expr::Function(f) => std::mem::take(&mut f.body),
        _ => return false,
    };
    let hit = substitute_at_reference(&mut body, ast, target, replacement);
    if let Expr::Function(f) = ast.exprs.get_mut(id) {
        f.body = body;
    }
    hit
}

/// Whether the statement itself (not a nested statement) owns a reference
/// to `target`. Descends the statement's expression roots through all
/// expression structure except function bodies.
fn directly_references(stmt: &Stmt, ast: &Ast, target: LocalId) -> bool {
    stmt_expr_roots(stmt)
        .into_iter()
        .any(|root| expr_references(root, ast, target))
}

fn stmt_expr_roots(stmt: &Stmt) -> Vec<ExprId> {
    match stmt {
        Stmt::Expr(e) => vec![*e],
        Stmt::Return(values) | Stmt::Local { values, .. } => values.clone(),
        Stmt::Assign { targets, values } => {
            let mut roots = targets.clone();
            roots.extend_from_slice(values);
            roots
        }
        Stmt::If(if_stmt) => vec![if_stmt.condition],
        Stmt::While { condition, .. } => vec![*condition],
        Stmt::Repeat { condition, .. } => vec![*condition],
        Stmt::For { from, to, step, .. } => {
            let mut roots = vec![*from, *to];
            if let Some(step) = step {
                roots.push(*step);
            }
            roots
        }
        Stmt::ForIn { values, .. } => values.clone(),
        Stmt::LocalFunction { func, .. } => vec![*func],
        Stmt::Function { name, func } => vec![*name, *func],
        Stmt::Do(_) | Stmt::Break => Vec::new(),
    }
}

fn expr_references(id: ExprId, ast: &Ast, target: LocalId) -> bool {
    match ast.exprs.get(id) {
        Expr::Local { local, .. } => *local == target,
        Expr::Group(inner) => expr_references(*inner, ast, target),
        Expr::Call { func, args, .. } => {
            expr_references(*func, ast, target)
                || args.iter().any(|&a| expr_references(a, ast, target))
        }
        Expr::IndexName { expr, .. } => expr_references(*expr, ast, target),
        Expr::IndexExpr { expr, index } => {
            expr_references(*expr, ast, target) || expr_references(*index, ast, target)
        }
        Expr::Unary { expr, .. } => expr_references(*expr, ast, target),
        Expr::Binary { left, right, .. } => {
            expr_references(*left, ast, target) || expr_references(*right, ast, target)
        }
        Expr::Table { items } => items.iter().any(|item| {
            item.key.map_or(false, |k| expr_references(k, ast, target))
                || expr_references(item.value, ast, target)
        }),
        Expr::Function(_) => false,
        Expr::Nil
        | Expr::Bool(_)
        | Expr::Number(_)
        | Expr::String(_)
        | Expr::Global(_)
        | Expr::Varargs => false,
    }
}
