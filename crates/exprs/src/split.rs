use rustc_hash::FxHashSet;

use ember_ast::expr::Expr;
use ember_ast::local::LocalId;
use ember_ast::stmt::Stmt;
use ember_ast::Ast;

use crate::subst::{substitute_stmt, Replacement};

/// Split re-assignments of block-bound locals into fresh bindings.
///
/// The lifter binds one local per register, so a register reused for a
/// second, unrelated value surfaces as `x = ...` after `local x = ...`.
/// Each such assignment becomes a new `local var<N> = ...` and every
/// subsequent reference to the old local is redirected to the new one.
/// Renames chain: a third store to the register splits again.
///
/// Only assignments whose binding lives in this same statement list are
/// split; a loop body re-assigning a local bound outside itself carries a
/// real loop-carried dependence and is left alone.
pub(crate) fn split_reassignments(
    ast: &mut Ast,
    body: &mut [Stmt],
    function_depth: u32,
) -> u32 {
    let mut bound: FxHashSet<LocalId> = FxHashSet::default();
    let mut renames: Vec<(LocalId, LocalId)> = Vec::new();
    let mut split = 0;

    for stmt in body.iter_mut() {
        for &(old, new) in &renames {
            substitute_stmt(stmt, ast, old, Replacement::Rename(new));
        }

        match stmt {
            Stmt::Local { vars, .. } if vars.len() == 1 => {
                bound.insert(vars[0]);
            }
            Stmt::Assign { targets, values } if targets.len() == 1 => {
                let target = targets[0];
                let Expr::Local { local, .. } = ast.exprs.get(target) else {
                    continue;
                };
                let local = *local;
                if !bound.contains(&local) {
                    continue;
                }

                let location = ast.exprs.location(target);
                let fresh = ast.fresh_synthetic(location, function_depth);
                let values = std::mem::take(values);
                *stmt = Stmt::Local {
                    vars: vec![fresh],
                    values,
                };
                renames.push((local, fresh));
                bound.insert(fresh);
                split += 1;
            }
            _ => {}
        }
    }

    split
}
