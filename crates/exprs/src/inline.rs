use ember_ast::arena::ExprId;
use ember_ast::expr::Expr;
use ember_ast::local::LocalId;
use ember_ast::stmt::Stmt;
use ember_ast::Ast;

use crate::collect::count_uses;
use crate::subst::{substitute_at_reference, Replacement};

/// Inline single-use bindings and drop the dissolved statements.
///
/// A `local x = e` whose `x` is referenced exactly once, and never as the
/// root of an assignment target, has `e` substituted at the reference. The
/// binding statement is removed only when every one of its variables was
/// inlined; a multi-variable binding whose last initializer is a call or
/// varargs is skipped outright so multi-value arity survives.
pub(crate) fn inline_single_use(ast: &mut Ast, body: &mut Vec<Stmt>) -> u32 {
    let counts = count_uses(body, ast);

    struct Candidate {
        stmt_index: usize,
        inlines: Vec<(LocalId, ExprId)>,
        remove: bool,
    }

    let mut candidates: Vec<Candidate> = Vec::new();

    for (stmt_index, stmt) in body.iter().enumerate() {
        let Stmt::Local { vars, values } = stmt else {
            continue;
        };
        if values.is_empty() {
            continue;
        }

        let last = ast.exprs.get(*values.last().unwrap());
        let multi_value = matches!(last, Expr::Call { .. } | Expr::Varargs);
        if multi_value && vars.len() > 1 {
            continue;
        }

        let mut inlines = Vec::new();
        for (i, &var) in vars.iter().enumerate() {
            let Some(&value) = values.get(i) else {
                continue;
            };
            if counts.uses(var) == 1 && !counts.is_assign_target(var) {
                inlines.push((var, value));
            }
        }

        if !inlines.is_empty() {
            let remove = inlines.len() == vars.len();
            candidates.push(Candidate {
                stmt_index,
                inlines,
                remove,
            });
        }
    }

    let mut inlined = 0;
    let mut to_remove = Vec::new();
    for candidate in &candidates {
        for &(var, value) in &candidate.inlines {
            if substitute_at_reference(body, ast, var, Replacement::CopyOf(value)) {
                inlined += 1;
            }
        }
        if candidate.remove {
            to_remove.push(candidate.stmt_index);
        }
    }

    for &index in to_remove.iter().rev() {
        body.remove(index);
    }

    inlined
}
