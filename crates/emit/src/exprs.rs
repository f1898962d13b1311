use std::fmt::Write;

use ember_ast::arena::ExprId;
use ember_ast::expr::{BinOp, Expr, FuncExpr, UnOp};

use crate::Emitter;

enum QuoteStyle {
    Long,
    Single,
    Double,
}

/// Pick a quote style with one scan: newlines and backslashes force long
/// brackets, a string containing both quote kinds falls back to long
/// brackets too (a proper escape form is a TODO), otherwise use whichever
/// quote the content does not contain.
fn quote_style(bytes: &[u8]) -> QuoteStyle {
    let mut has_single = false;
    let mut has_double = false;
    for &b in bytes {
        if b == b'\n' || b == b'\\' {
            return QuoteStyle::Long;
        }
        if b == b'"' {
            has_double = true;
        } else if b == b'\'' {
            has_single = true;
        }
    }
    if has_double && has_single {
        QuoteStyle::Long
    } else if has_double {
        QuoteStyle::Single
    } else {
        QuoteStyle::Double
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_valid_name(bytes: &[u8]) -> bool {
    let Some((&first, rest)) = bytes.split_first() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return false;
    }
    rest.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Mimics stream output at precision 14: integral values print bare,
/// fractional ones trim trailing zeros.
fn format_number(value: f64) -> String {
    if value.is_infinite() {
        // not representable as a literal; print the idiomatic constant
        return if value.is_sign_positive() {
            "math.huge".to_string()
        } else {
            "-math.huge".to_string()
        };
    }
    if value.is_nan() {
        return "(0/0)".to_string();
    }
    if value == value.trunc() && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let mut text = format!("{:.14}", value);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}

impl<'a> Emitter<'a> {
    pub(crate) fn emit_expr(&mut self, id: ExprId) {
        match self.ast.exprs.get(id) {
            Expr::Group(inner) => {
                self.output.push('(');
                self.emit_expr(*inner);
                self.output.push(')');
            }
            Expr::Nil => self.output.push_str("nil"),
            Expr::Bool(true) => self.output.push_str("true"),
            Expr::Bool(false) => self.output.push_str("false"),
            Expr::Number(value) => {
                let text = format_number(*value);
                self.output.push_str(&text);
            }
            Expr::String(bytes) => self.emit_string(bytes),
            Expr::Local { local, .. } => {
                let name = self.local_name(*local);
                self.output.push_str(name);
            }
            Expr::Global(name) => {
                let text = self.ast.names.text(*name);
                self.output.push_str(text);
            }
            Expr::Varargs => self.output.push_str("..."),
            Expr::Call { func, args, method } => {
                self.emit_call(*func, args, *method);
            }
            Expr::IndexName { expr, index } => {
                self.emit_expr(*expr);
                self.output.push('.');
                let text = self.ast.names.text(*index);
                self.output.push_str(text);
            }
            Expr::IndexExpr { expr, index } => {
                self.emit_expr(*expr);
                if let Expr::String(bytes) = self.ast.exprs.get(*index) {
                    if is_valid_name(bytes) {
                        self.output.push('.');
                        let text = String::from_utf8_lossy(bytes).into_owned();
                        self.output.push_str(&text);
                        return;
                    }
                }
                self.output.push('[');
                self.emit_expr(*index);
                self.output.push(']');
            }
            Expr::Function(func) => self.emit_function_literal(func),
            Expr::Table { .. } => self.emit_table(id),
            Expr::Unary { op, expr } => {
                match op {
                    UnOp::Not => self.output.push_str("not "),
                    UnOp::Minus => self.output.push('-'),
                    UnOp::Len => self.output.push('#'),
                }
                self.emit_expr(*expr);
            }
            Expr::Binary { op, left, right } => {
                self.emit_expr(*left);
                self.output.push_str(binop_str(*op));
                self.emit_expr(*right);
            }
        }
    }

    fn emit_call(&mut self, func: ExprId, args: &[ExprId], method: bool) {
        let callee = self.ast.exprs.get(func);
        if method {
            if let Expr::IndexName { expr, index } = callee {
                self.emit_expr(*expr);
                self.output.push(':');
                let text = self.ast.names.text(*index);
                self.output.push_str(text);
                self.emit_call_args(args);
                return;
            }
        }

        let no_paren = matches!(
            callee,
            Expr::Local { .. }
                | Expr::Global(_)
                | Expr::Group(_)
                | Expr::IndexName { .. }
                | Expr::IndexExpr { .. }
        );
        if !no_paren {
            self.output.push('(');
        }
        self.emit_expr(func);
        if !no_paren {
            self.output.push(')');
        }
        self.emit_call_args(args);
    }

    fn emit_call_args(&mut self, args: &[ExprId]) {
        self.output.push('(');
        for (i, &arg) in args.iter().enumerate() {
            self.emit_expr(arg);
            if i != args.len() - 1 {
                self.output.push_str(", ");
            }
        }
        self.output.push(')');
    }

    pub(crate) fn emit_function_literal(&mut self, func: &FuncExpr) {
        self.output.push_str("function(");
        self.emit_params(func);
        self.output.push_str(")\n");

        self.indent += 1;
        for stmt in &func.body {
            self.emit_stmt(stmt);
        }
        self.indent -= 1;

        self.write_indent();
        self.output.push_str("end");
    }

    pub(crate) fn emit_params(&mut self, func: &FuncExpr) {
        for (i, &arg) in func.args.iter().enumerate() {
            let name = self.local_name(arg);
            self.output.push_str(name);
            if i != func.args.len() - 1 {
                self.output.push_str(", ");
            }
        }
        if func.vararg {
            if !func.args.is_empty() {
                self.output.push_str(", ");
            }
            self.output.push_str("...");
        }
    }

    fn emit_table(&mut self, id: ExprId) {
        let Expr::Table { items } = self.ast.exprs.get(id) else {
            return;
        };

        self.output.push('{');
        if !items.is_empty() {
            self.indent += 1;

            for (index, item) in items.iter().enumerate() {
                let i = index * 2;
                if i % 30 * 2 == 0 {
                    self.output.push('\n');
                    self.write_indent();
                }

                if let Some(key) = item.key {
                    if let Expr::String(bytes) = self.ast.exprs.get(key) {
                        if is_valid_name(bytes) {
                            let text = String::from_utf8_lossy(bytes).into_owned();
                            let _ = write!(self.output, "{} = ", text);
                            self.emit_expr(item.value);
                            self.emit_table_separator(index, items.len());
                            continue;
                        }
                    }
                    self.output.push('[');
                    self.emit_expr(key);
                    self.output.push_str("] = ");
                }
                self.emit_expr(item.value);
                self.emit_table_separator(index, items.len());
            }

            self.indent -= 1;
            self.write_indent();
        }
        self.output.push('}');
    }

    fn emit_table_separator(&mut self, index: usize, len: usize) {
        if index != len - 1 {
            self.output.push_str(", ");
        } else {
            self.output.push('\n');
        }
    }

    fn emit_string(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        match quote_style(bytes) {
            QuoteStyle::Single => {
                self.output.push('\'');
                self.output.push_str(&text);
                self.output.push('\'');
            }
            QuoteStyle::Double => {
                self.output.push('"');
                self.output.push_str(&text);
                self.output.push('"');
            }
            QuoteStyle::Long => {
                self.output.push_str("[[");
                self.output.push_str(&text);
                self.output.push_str("]]");
            }
        }
    }
}

fn binop_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => " + ",
        BinOp::Sub => " - ",
        BinOp::Mul => " * ",
        BinOp::Div => " / ",
        BinOp::Mod => " % ",
        BinOp::Pow => " ^ ",
        BinOp::Concat => " .. ",
        BinOp::CompareNe => " ~= ",
        BinOp::CompareEq => " == ",
        BinOp::CompareLt => " < ",
        BinOp::CompareLe => " <= ",
        BinOp::CompareGt => " > ",
        BinOp::CompareGe => " >= ",
        BinOp::And => " and ",
        BinOp::Or => " or ",
    }
}
