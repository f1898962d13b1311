use ember_ast::expr::Expr;
use ember_ast::stmt::{ElseBody, IfStmt, Stmt};

use crate::Emitter;

impl<'a> Emitter<'a> {
    /// Emit a block body. The outermost block prints bare; any block
    /// entered after it is wrapped in `do ... end`.
    pub(crate) fn emit_block(&mut self, body: &[Stmt]) {
        let nested = self.root_seen;
        self.root_seen = true;

        if nested {
            self.write_indent();
            self.output.push_str("do");
        }

        if !body.is_empty() {
            if nested {
                self.output.push('\n');
                self.indent += 1;
            }
            for stmt in body {
                self.emit_stmt(stmt);
            }
            if nested {
                self.indent -= 1;
                self.write_indent();
            }
        } else {
            self.output.push(' ');
        }

        if nested {
            self.output.push_str("end\n");
        }
    }

    pub(crate) fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Do(body) => self.emit_block(body),

            Stmt::If(if_stmt) => {
                self.write_indent();
                self.output.push_str("if ");
                self.emit_if_chain(if_stmt);
                self.write_indent();
                self.output.push_str("end\n");
            }

            Stmt::While { condition, body } => {
                self.write_indent();
                self.output.push_str("while ");
                self.emit_expr(*condition);
                self.output.push_str(" do\n");
                self.indent += 1;
                for s in body {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
                self.write_indent();
                self.output.push_str("end\n");
            }

            Stmt::Repeat { body, condition } => {
                self.write_indent();
                self.output.push_str("repeat\n");
                self.indent += 1;
                for s in body {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
                self.write_indent();
                self.output.push_str("until ");
                self.emit_expr(*condition);
                self.output.push('\n');
            }

            Stmt::Break => {
                self.write_indent();
                self.output.push_str("break\n");
            }

            Stmt::Return(values) => {
                self.write_indent();
                self.output.push_str("return ");
                for (i, &value) in values.iter().enumerate() {
                    self.emit_expr(value);
                    if i != values.len() - 1 {
                        self.output.push_str(", ");
                    }
                }
                self.output.push('\n');
            }

            Stmt::Expr(expr) => {
                self.write_indent();
                self.emit_expr(*expr);
                self.output.push('\n');
            }

            Stmt::Local { vars, values } => {
                self.write_indent();
                self.output.push_str("local ");
                for (i, &var) in vars.iter().enumerate() {
                    let name = self.local_name(var);
                    self.output.push_str(name);
                    if i != vars.len() - 1 {
                        self.output.push_str(", ");
                    }
                }

                if !values.is_empty() {
                    // `local x = nil` carries no information; print `local x`
                    if values.len() == 1 && matches!(self.ast.exprs.get(values[0]), Expr::Nil) {
                        self.output.push('\n');
                        return;
                    }
                    self.output.push_str(" = ");
                    for (i, &value) in values.iter().enumerate() {
                        self.emit_expr(value);
                        if i != values.len() - 1 {
                            self.output.push_str(", ");
                        }
                    }
                }
                self.output.push('\n');
            }

            Stmt::LocalFunction { var, func } => {
                self.write_indent();
                self.output.push_str("local function ");
                let name = self.local_name(*var);
                self.output.push_str(name);
                self.output.push('(');
                if let Expr::Function(func) = self.ast.exprs.get(*func) {
                    self.emit_params(func);
                    self.output.push_str(")\n");
                    self.indent += 1;
                    for s in &func.body {
                        self.emit_stmt(s);
                    }
                    self.indent -= 1;
                } else {
                    self.output.push_str(")\n");
                }
                self.write_indent();
                self.output.push_str("end\n");
            }

            Stmt::For {
                var,
                from,
                to,
                step,
                body,
            } => {
                self.write_indent();
                self.output.push_str("for ");
                let name = self.local_name(*var);
                self.output.push_str(name);
                self.output.push_str(" = ");
                self.emit_expr(*from);
                self.output.push_str(", ");
                self.emit_expr(*to);
                if let Some(step) = step {
                    self.output.push_str(", ");
                    self.emit_expr(*step);
                }
                self.output.push_str(" do\n");
                self.indent += 1;
                for s in body {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
                self.write_indent();
                self.output.push_str("end\n");
            }

            Stmt::ForIn { vars, values, body } => {
                self.write_indent();
                self.output.push_str("for ");
                for (i, &var) in vars.iter().enumerate() {
                    let name = self.local_name(var);
                    self.output.push_str(name);
                    if i != vars.len() - 1 {
                        self.output.push_str(", ");
                    }
                }
                self.output.push_str(" in ");
                for (i, &value) in values.iter().enumerate() {
                    self.emit_expr(value);
                    if i != values.len() - 1 {
                        self.output.push_str(", ");
                    }
                }
                self.output.push_str(" do\n");
                self.indent += 1;
                for s in body {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
                self.write_indent();
                self.output.push_str("end\n");
            }

            Stmt::Assign { targets, values } => {
                self.write_indent();
                for (i, &target) in targets.iter().enumerate() {
                    self.emit_expr(target);
                    if i != targets.len() - 1 {
                        self.output.push_str(", ");
                    }
                }
                self.output.push_str(" = ");
                for (i, &value) in values.iter().enumerate() {
                    self.emit_expr(value);
                    if i != values.len() - 1 {
                        self.output.push_str(", ");
                    }
                }
                self.output.push('\n');
            }

            Stmt::Function { name, func } => {
                self.write_indent();
                self.output.push_str("function ");
                let Expr::Function(body) = self.ast.exprs.get(*func) else {
                    self.output.push_str("()\nend\n");
                    return;
                };

                // method definitions print with `:` sugar
                let receiver = if body.self_local.is_some() {
                    match self.ast.exprs.get(*name) {
                        Expr::IndexName { expr, index } => Some((*expr, *index)),
                        _ => None,
                    }
                } else {
                    None
                };
                match receiver {
                    Some((expr, index)) => {
                        self.emit_expr(expr);
                        self.output.push(':');
                        let text = self.ast.names.text(index);
                        self.output.push_str(text);
                    }
                    None => self.emit_expr(*name),
                }

                self.output.push('(');
                self.emit_params(body);
                self.output.push_str(")\n");
                self.indent += 1;
                for s in &body.body {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
                self.write_indent();
                self.output.push_str("end\n");
            }
        }
    }

    fn emit_if_chain(&mut self, if_stmt: &IfStmt) {
        self.emit_expr(if_stmt.condition);
        self.output.push_str(" then\n");

        self.indent += 1;
        for s in &if_stmt.then_body {
            self.emit_stmt(s);
        }
        self.indent -= 1;

        match if_stmt.else_body.as_deref() {
            Some(ElseBody::ElseIf(nested)) => {
                self.write_indent();
                self.output.push_str("elseif ");
                self.emit_if_chain(nested);
            }
            Some(ElseBody::Else(body)) => {
                self.write_indent();
                self.output.push_str("else\n");
                self.indent += 1;
                for s in body {
                    self.emit_stmt(s);
                }
                self.indent -= 1;
            }
            None => {}
        }
    }
}
