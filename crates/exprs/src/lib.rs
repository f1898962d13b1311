//! Block-level cleanup of lifted statement lists.
//!
//! The lifter allocates one synthetic local per register, but scripts reuse
//! registers freely, so raw lifted blocks are noisy. Two passes run over
//! each block before it is wrapped, bottom-up:
//!
//! 1. **Reassignment splitting** — a register reused for a second value
//!    shows up as `x = ...` after `local x = ...`; the second assignment
//!    becomes a fresh `local` binding and later references are redirected,
//!    recovering lexical distinctness.
//! 2. **Single-use inlining** — a binding whose variable is referenced
//!    exactly once (and never as an assignment target) is folded into its
//!    sole reference and removed.
//!
//! Both passes share one reference index and one bounded substitution
//! walker. The walker does not descend into nested function bodies, table
//! literals, or `repeat`/`for` bodies; substitutions that would have to
//! cross those boundaries are trapped there, which can leave a binding
//! behind. The lifter never produces those shapes, so nothing is lost in
//! practice.

mod collect;
mod inline;
mod split;
mod subst;

use ember_ast::stmt::Stmt;
use ember_ast::Ast;

/// Optimize one statement list in place.
///
/// `function_depth` is the nesting depth of the prototype the block belongs
/// to; locals created by the split pass are introduced at that depth.
pub fn optimize(ast: &mut Ast, body: &mut Vec<Stmt>, function_depth: u32) {
    let split = split::split_reassignments(ast, body, function_depth);
    let inlined = inline::inline_single_use(ast, body);
    if split > 0 || inlined > 0 {
        tracing::debug!(split, inlined, "optimized block");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_ast::arena::ExprId;
    use ember_ast::expr::Expr;
    use ember_ast::local::LocalId;
    use ember_ast::pos::Location;

    fn local_ref(ast: &mut Ast, local: LocalId) -> ExprId {
        ast.exprs.alloc(
            Expr::Local {
                local,
                upvalue: false,
            },
            Location::default(),
        )
    }

    fn number(ast: &mut Ast, value: f64) -> ExprId {
        ast.exprs.alloc(Expr::Number(value), Location::default())
    }

    fn call_global(ast: &mut Ast, name: &str, arg: ExprId) -> ExprId {
        let name = ast.names.intern(name);
        let func = ast.exprs.alloc(Expr::Global(name), Location::default());
        ast.exprs.alloc(
            Expr::Call {
                func,
                args: vec![arg],
                method: false,
            },
            Location::default(),
        )
    }

    #[test]
    fn single_use_binding_is_inlined() {
        let mut ast = Ast::new();
        let v = ast.fresh_synthetic(Location::default(), 1);
        let init = number(&mut ast, 42.0);
        let use_site = local_ref(&mut ast, v);
        let mut body = vec![
            Stmt::Local {
                vars: vec![v],
                values: vec![init],
            },
            Stmt::Return(vec![use_site]),
        ];

        optimize(&mut ast, &mut body, 1);

        assert_eq!(body.len(), 1);
        let Stmt::Return(values) = &body[0] else {
            panic!("expected return");
        };
        assert!(matches!(ast.exprs.get(values[0]), Expr::Number(n) if *n == 42.0));
    }

    #[test]
    fn assignment_targets_are_not_inlined() {
        let mut ast = Ast::new();
        let v = ast.fresh_synthetic(Location::default(), 1);
        let w = ast.fresh_synthetic(Location::default(), 1);
        let one = number(&mut ast, 1.0);
        let two = number(&mut ast, 2.0);
        let three = number(&mut ast, 3.0);
        let target = local_ref(&mut ast, v);
        // two-variable binding: the split pass ignores it, and the sole
        // reference to v is the assignment target
        let mut body = vec![
            Stmt::Local {
                vars: vec![v, w],
                values: vec![one, two],
            },
            Stmt::Assign {
                targets: vec![target],
                values: vec![three],
            },
        ];

        optimize(&mut ast, &mut body, 1);

        assert_eq!(body.len(), 2);
        assert!(matches!(&body[0], Stmt::Local { vars, .. } if vars.len() == 2));
    }

    #[test]
    fn reassignment_splits_and_both_halves_inline() {
        let mut ast = Ast::new();
        let a = ast.fresh_synthetic(Location::default(), 1);
        let one = number(&mut ast, 1.0);
        let two = number(&mut ast, 2.0);
        let f_arg = local_ref(&mut ast, a);
        let f_call = call_global(&mut ast, "f", f_arg);
        let assign_target = local_ref(&mut ast, a);
        let g_arg = local_ref(&mut ast, a);
        let g_call = call_global(&mut ast, "g", g_arg);
        let mut body = vec![
            Stmt::Local {
                vars: vec![a],
                values: vec![one],
            },
            Stmt::Expr(f_call),
            Stmt::Assign {
                targets: vec![assign_target],
                values: vec![two],
            },
            Stmt::Expr(g_call),
        ];

        optimize(&mut ast, &mut body, 1);

        // both bindings dissolve into the call arguments
        assert_eq!(body.len(), 2);
        for (stmt, expected) in body.iter().zip([1.0, 2.0]) {
            let Stmt::Expr(call) = stmt else {
                panic!("expected a call statement");
            };
            let Expr::Call { args, .. } = ast.exprs.get(*call) else {
                panic!("expected a call");
            };
            assert!(matches!(ast.exprs.get(args[0]), Expr::Number(n) if *n == expected));
        }
    }

    #[test]
    fn multi_value_binding_keeps_its_arity() {
        let mut ast = Ast::new();
        let v0 = ast.fresh_synthetic(Location::default(), 1);
        let v1 = ast.fresh_synthetic(Location::default(), 1);
        let zero = number(&mut ast, 0.0);
        let producer = call_global(&mut ast, "f", zero);
        let use_site = local_ref(&mut ast, v0);
        let mut body = vec![
            Stmt::Local {
                vars: vec![v0, v1],
                values: vec![producer],
            },
            Stmt::Return(vec![use_site]),
        ];

        optimize(&mut ast, &mut body, 1);

        assert_eq!(body.len(), 2);
        assert!(matches!(&body[0], Stmt::Local { vars, .. } if vars.len() == 2));
    }

    #[test]
    fn closure_captures_count_as_references() {
        let mut ast = Ast::new();
        let c = ast.fresh_synthetic(Location::default(), 1);
        let one = number(&mut ast, 1.0);
        let inner_ref = ast.exprs.alloc(
            Expr::Local {
                local: c,
                upvalue: true,
            },
            Location::default(),
        );
        let outer_ref = local_ref(&mut ast, c);
        let func = ast.exprs.alloc(
            Expr::Function(ember_ast::expr::FuncExpr {
                self_local: None,
                args: Vec::new(),
                vararg: false,
                body: vec![Stmt::Return(vec![inner_ref])],
            }),
            Location::default(),
        );
        let mut body = vec![
            Stmt::Local {
                vars: vec![c],
                values: vec![one],
            },
            Stmt::Expr(func),
            Stmt::Return(vec![outer_ref]),
        ];

        optimize(&mut ast, &mut body, 1);

        // two references: the binding survives
        assert_eq!(body.len(), 3);
    }
}
