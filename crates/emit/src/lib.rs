//! Pretty-printer: renders an AST back to source text.
//!
//! A depth-first walk with a four-space indent counter. The outermost
//! block prints bare; nested block statements are wrapped in `do ... end`.
//! Printing is deterministic: emitting the same tree twice yields
//! byte-identical output.

mod exprs;
mod stmts;

use ember_ast::stmt::Stmt;
use ember_ast::Ast;

/// The advisory preamble prepended when a job could not prove the output
/// equivalent to the input.
pub const FLAG_PREAMBLE: &str = "--[[\n\tinput function was flagged as potentially incompatible.\n\tplease private message a developer for support.\n]]\n";

/// Render a program body. `flagged` prepends [`FLAG_PREAMBLE`].
pub fn print(ast: &Ast, body: &[Stmt], flagged: bool) -> String {
    let mut emitter = Emitter::new(ast);
    if flagged {
        emitter.output.push_str(FLAG_PREAMBLE);
    }
    emitter.emit_block(body);
    emitter.output
}

pub struct Emitter<'a> {
    pub(crate) ast: &'a Ast,
    pub output: String,
    pub(crate) indent: usize,
    /// Set once the outermost block has been entered; every block seen
    /// after that is wrapped in `do ... end`.
    pub(crate) root_seen: bool,
}

impl<'a> Emitter<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            output: String::new(),
            indent: 0,
            root_seen: false,
        }
    }

    pub(crate) fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
    }

    pub(crate) fn local_name(&self, local: ember_ast::local::LocalId) -> &'a str {
        self.ast.names.text(self.ast.locals.get(local).name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_ast::expr::Expr;
    use ember_ast::pos::Location;
    use ember_ast::stmt::Stmt;

    fn print_return_of(ast: &mut Ast, expr: Expr) -> String {
        let id = ast.exprs.alloc(expr, Location::default());
        print(ast, &[Stmt::Return(vec![id])], false)
    }

    #[test]
    fn integers_print_without_a_decimal_point() {
        let mut ast = Ast::new();
        assert_eq!(print_return_of(&mut ast, Expr::Number(42.0)), "return 42\n");
        assert_eq!(print_return_of(&mut ast, Expr::Number(-7.0)), "return -7\n");
    }

    #[test]
    fn fractions_trim_trailing_zeros() {
        let mut ast = Ast::new();
        assert_eq!(print_return_of(&mut ast, Expr::Number(0.5)), "return 0.5\n");
        assert_eq!(
            print_return_of(&mut ast, Expr::Number(1.25)),
            "return 1.25\n"
        );
    }

    #[test]
    fn string_quoting_follows_content() {
        let mut ast = Ast::new();
        assert_eq!(
            print_return_of(&mut ast, Expr::String(b"plain".to_vec())),
            "return \"plain\"\n"
        );
        assert_eq!(
            print_return_of(&mut ast, Expr::String(b"it's".to_vec())),
            "return \"it's\"\n"
        );
        assert_eq!(
            print_return_of(&mut ast, Expr::String(b"say \"hi\"".to_vec())),
            "return 'say \"hi\"'\n"
        );
        assert_eq!(
            print_return_of(&mut ast, Expr::String(b"line\nbreak".to_vec())),
            "return [[line\nbreak]]\n"
        );
        assert_eq!(
            print_return_of(&mut ast, Expr::String(b"'\"".to_vec())),
            "return [['\"]]\n"
        );
    }

    #[test]
    fn string_keys_degrade_to_dotted_access() {
        let mut ast = Ast::new();
        let name = ast.names.intern("t");
        let table = ast.exprs.alloc(Expr::Global(name), Location::default());
        let good = ast
            .exprs
            .alloc(Expr::String(b"field".to_vec()), Location::default());
        let id = ast.exprs.alloc(
            Expr::IndexExpr {
                expr: table,
                index: good,
            },
            Location::default(),
        );
        assert_eq!(print(&ast, &[Stmt::Return(vec![id])], false), "return t.field\n");

        let bad = ast
            .exprs
            .alloc(Expr::String(b"not valid".to_vec()), Location::default());
        let id = ast.exprs.alloc(
            Expr::IndexExpr {
                expr: table,
                index: bad,
            },
            Location::default(),
        );
        assert_eq!(
            print(&ast, &[Stmt::Return(vec![id])], false),
            "return t[\"not valid\"]\n"
        );
    }

    #[test]
    fn nested_blocks_wrap_in_do_end() {
        let mut ast = Ast::new();
        let body = vec![Stmt::Do(vec![Stmt::Break])];
        assert_eq!(print(&ast, &body, false), "do\n    break\nend\n");
        let empty = vec![Stmt::Do(Vec::new())];
        assert_eq!(print(&mut ast, &empty, false), "do end\n");
    }

    #[test]
    fn flag_preamble_precedes_the_program() {
        let ast = Ast::new();
        let text = print(&ast, &[Stmt::Break], true);
        assert!(text.starts_with("--[[\n\tinput function was flagged"));
        assert!(text.ends_with("]]\nbreak\n"));
    }

    #[test]
    fn local_nil_initializer_is_elided() {
        let mut ast = Ast::new();
        let v = ast.fresh_synthetic(Location::default(), 1);
        let nil = ast.exprs.alloc(Expr::Nil, Location::default());
        let body = vec![Stmt::Local {
            vars: vec![v],
            values: vec![nil],
        }];
        assert_eq!(print(&ast, &body, false), "local var0\n");
    }
}
