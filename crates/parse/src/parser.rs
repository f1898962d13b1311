use rustc_hash::FxHashMap;

use ember_ast::arena::ExprId;
use ember_ast::expr::{BinOp, Expr, FuncExpr, TableItem, UnOp};
use ember_ast::local::{Local, LocalId};
use ember_ast::name::{NameId, Reserved};
use ember_ast::pos::Location;
use ember_ast::stmt::{ElseBody, IfStmt, Stmt};
use ember_ast::Ast;

use crate::lexer::{describe, Lexer, Token, TokenKind};
use crate::ParseError;

/// Left/right binding power per binary operator, indexed by `BinOp`
/// declaration order. `^` and `..` are right-associative (their right
/// priority is below their left).
const BINARY_PRIORITY: [(u8, u8); 15] = [
    (6, 6),  // +
    (6, 6),  // -
    (7, 7),  // *
    (7, 7),  // /
    (7, 7),  // %
    (10, 9), // ^
    (5, 4),  // ..
    (3, 3),  // ~=
    (3, 3),  // ==
    (3, 3),  // <
    (3, 3),  // <=
    (3, 3),  // >
    (3, 3),  // >=
    (2, 2),  // and
    (1, 1),  // or
];

const UNARY_PRIORITY: u8 = 8;

struct FuncState {
    vararg: bool,
    loop_depth: u32,
}

pub(crate) struct Parser<'s, 'a> {
    lexer: Lexer<'s>,
    current: Token,
    ast: &'a mut Ast,
    function_stack: Vec<FuncState>,
    /// Current binding for each spelling; `None` marks a spelling whose
    /// innermost binding has been closed.
    local_map: FxHashMap<NameId, Option<LocalId>>,
    local_stack: Vec<LocalId>,
    name_self: NameId,
}

impl<'s, 'a> Parser<'s, 'a> {
    pub fn parse(source: &'s [u8], ast: &'a mut Ast) -> Result<Vec<Stmt>, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next(&mut ast.names)?;
        let name_self = ast.names.intern("self");

        let mut parser = Parser {
            lexer,
            current,
            ast,
            function_stack: vec![FuncState {
                vararg: true,
                loop_depth: 0,
            }],
            local_map: FxHashMap::default(),
            local_stack: Vec::new(),
            name_self,
        };

        let body = parser.parse_block()?;
        if parser.current.kind != TokenKind::Eof {
            return Err(parser.unexpected("'<eof>'"));
        }
        Ok(body)
    }

    // ---- token plumbing ----

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current = self.lexer.next(&mut self.ast.names)?;
        Ok(())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            self.current.location,
            format!(
                "{} expected near {}",
                expected,
                describe(&self.current.kind, &self.ast.names)
            ),
        )
    }

    fn expect_char(&self, c: u8) -> Result<(), ParseError> {
        if self.current.kind.is_char(c) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", c as char)))
        }
    }

    fn expect_reserved(&self, word: Reserved) -> Result<(), ParseError> {
        if self.current.kind.is_reserved(word) {
            Ok(())
        } else {
            let text = ember_ast::name::RESERVED
                .iter()
                .find(|(_, r)| *r == word)
                .map(|(t, _)| *t)
                .unwrap_or("?");
            Err(self.unexpected(&format!("'{}'", text)))
        }
    }

    // ---- scope handling ----

    fn push_local(&mut self, name: NameId, location: Location) -> LocalId {
        let shadow = self.local_map.get(&name).copied().flatten();
        let local = self.ast.locals.alloc(Local {
            name,
            location,
            shadow,
            function_depth: self.function_stack.len() as u32,
        });
        self.local_map.insert(name, Some(local));
        self.local_stack.push(local);
        local
    }

    fn save_locals(&self) -> usize {
        self.local_stack.len()
    }

    /// Close a scope: walk the bindings opened since `offset` and restore
    /// each spelling to the binding it shadowed.
    fn restore_locals(&mut self, offset: usize) {
        while self.local_stack.len() > offset {
            let local = self.local_stack.pop().unwrap();
            let info = self.ast.locals.get(local);
            self.local_map.insert(info.name, info.shadow);
        }
    }

    // ---- statements ----

    fn block_follow(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
            || self.current.kind.is_reserved(Reserved::Else)
            || self.current.kind.is_reserved(Reserved::Elseif)
            || self.current.kind.is_reserved(Reserved::End)
            || self.current.kind.is_reserved(Reserved::Until)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let locals_begin = self.save_locals();
        let result = self.parse_block_no_scope();
        self.restore_locals(locals_begin);
        result
    }

    fn parse_block_no_scope(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut body = Vec::new();
        while !self.block_follow() {
            let (stmt, last) = self.parse_stat()?;
            if self.current.kind.is_char(b';') {
                self.advance()?;
            }
            body.push(stmt);
            if last {
                break;
            }
        }
        Ok(body)
    }

    fn parse_stat(&mut self) -> Result<(Stmt, bool), ParseError> {
        match &self.current.kind {
            TokenKind::Reserved(Reserved::If) => Ok((self.parse_if()?, false)),
            TokenKind::Reserved(Reserved::While) => Ok((self.parse_while()?, false)),
            TokenKind::Reserved(Reserved::Do) => Ok((self.parse_do()?, false)),
            TokenKind::Reserved(Reserved::For) => Ok((self.parse_for()?, false)),
            TokenKind::Reserved(Reserved::Repeat) => Ok((self.parse_repeat()?, false)),
            TokenKind::Reserved(Reserved::Function) => Ok((self.parse_function_stat()?, false)),
            TokenKind::Reserved(Reserved::Local) => Ok((self.parse_local()?, false)),
            TokenKind::Reserved(Reserved::Return) => Ok((self.parse_return()?, true)),
            TokenKind::Reserved(Reserved::Break) => Ok((self.parse_break()?, true)),
            _ => Ok((self.parse_assignment_or_call()?, false)),
        }
    }

    /// `if exp then block {elseif exp then block} [else block] end`
    ///
    /// Constant conditions fold to the taken branch.
    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        self.advance()?; // if / elseif

        let condition = self.parse_expr()?;
        self.expect_reserved(Reserved::Then)?;
        self.advance()?;

        let then_body = self.parse_block()?;

        let else_stmt = if self.current.kind.is_reserved(Reserved::Elseif) {
            Some(self.parse_if()?)
        } else {
            let else_stmt = if self.current.kind.is_reserved(Reserved::Else) {
                self.advance()?;
                Some(Stmt::Do(self.parse_block()?))
            } else {
                None
            };
            self.expect_reserved(Reserved::End)?;
            self.advance()?;
            else_stmt
        };

        match self.ast.exprs.get(condition).const_eval() {
            Some(true) => return Ok(Stmt::Do(then_body)),
            Some(false) => {
                return Ok(else_stmt.unwrap_or_else(|| Stmt::Do(Vec::new())));
            }
            None => {}
        }

        let else_body = else_stmt.map(|stmt| {
            Box::new(match stmt {
                Stmt::If(nested) => ElseBody::ElseIf(nested),
                Stmt::Do(body) => ElseBody::Else(body),
                other => ElseBody::Else(vec![other]),
            })
        });

        Ok(Stmt::If(IfStmt {
            condition,
            then_body,
            else_body,
        }))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        self.advance()?; // while

        let condition = self.parse_expr()?;
        self.expect_reserved(Reserved::Do)?;
        self.advance()?;

        self.function_stack.last_mut().unwrap().loop_depth += 1;
        let body = self.parse_block()?;
        self.function_stack.last_mut().unwrap().loop_depth -= 1;

        self.expect_reserved(Reserved::End)?;
        self.advance()?;

        Ok(Stmt::While { condition, body })
    }

    fn parse_repeat(&mut self) -> Result<Stmt, ParseError> {
        self.advance()?; // repeat

        let locals_begin = self.save_locals();

        self.function_stack.last_mut().unwrap().loop_depth += 1;
        let body = self.parse_block_no_scope()?;
        self.function_stack.last_mut().unwrap().loop_depth -= 1;

        self.expect_reserved(Reserved::Until)?;
        self.advance()?;

        // the until-expression still sees the body's locals
        let condition = self.parse_expr()?;
        self.restore_locals(locals_begin);

        Ok(Stmt::Repeat { body, condition })
    }

    fn parse_do(&mut self) -> Result<Stmt, ParseError> {
        self.advance()?; // do
        let body = self.parse_block()?;
        self.expect_reserved(Reserved::End)?;
        self.advance()?;
        Ok(Stmt::Do(body))
    }

    fn parse_break(&mut self) -> Result<Stmt, ParseError> {
        if self.function_stack.last().unwrap().loop_depth == 0 {
            return Err(ParseError::new(self.current.location, "no loop to break"));
        }
        self.advance()?;
        Ok(Stmt::Break)
    }

    /// `for Name = exp, exp [, exp] do block end` or
    /// `for namelist in explist do block end`
    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        self.advance()?; // for

        let (first_name, first_location) = self.parse_name()?;

        if self.current.kind.is_char(b'=') {
            self.advance()?;

            let from = self.parse_expr()?;
            self.expect_char(b',')?;
            self.advance()?;
            let to = self.parse_expr()?;

            let step = if self.current.kind.is_char(b',') {
                self.advance()?;
                Some(self.parse_expr()?)
            } else {
                None
            };

            self.expect_reserved(Reserved::Do)?;
            self.advance()?;

            let locals_begin = self.save_locals();
            let var = self.push_local(first_name, first_location);

            self.function_stack.last_mut().unwrap().loop_depth += 1;
            let body = self.parse_block()?;
            self.function_stack.last_mut().unwrap().loop_depth -= 1;

            self.restore_locals(locals_begin);
            self.expect_reserved(Reserved::End)?;
            self.advance()?;

            Ok(Stmt::For {
                var,
                from,
                to,
                step,
                body,
            })
        } else {
            let mut names = vec![(first_name, first_location)];
            if self.current.kind.is_char(b',') {
                self.advance()?;
                self.parse_name_list(&mut names, false)?;
            }

            self.expect_reserved(Reserved::In)?;
            self.advance()?;

            let values = self.parse_expr_list()?;

            self.expect_reserved(Reserved::Do)?;
            self.advance()?;

            let locals_begin = self.save_locals();
            let vars = names
                .into_iter()
                .map(|(name, location)| self.push_local(name, location))
                .collect();

            self.function_stack.last_mut().unwrap().loop_depth += 1;
            let body = self.parse_block()?;
            self.function_stack.last_mut().unwrap().loop_depth -= 1;

            self.restore_locals(locals_begin);
            self.expect_reserved(Reserved::End)?;
            self.advance()?;

            Ok(Stmt::ForIn { vars, values, body })
        }
    }

    /// `function funcname funcbody` where
    /// `funcname ::= Name {'.' Name} [':' Name]`
    fn parse_function_stat(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current.location;
        self.advance()?; // function

        let mut name = self.parse_name_expr()?;
        while self.current.kind.is_char(b'.') {
            self.advance()?;
            let (index, location) = self.parse_name()?;
            name = self.ast.exprs.alloc(
                Expr::IndexName { expr: name, index },
                Location::span(start, location),
            );
        }

        let mut has_self = false;
        if self.current.kind.is_char(b':') {
            self.advance()?;
            let (index, location) = self.parse_name()?;
            name = self.ast.exprs.alloc(
                Expr::IndexName { expr: name, index },
                Location::span(start, location),
            );
            has_self = true;
        }

        let func = self.parse_function_body(has_self)?;
        Ok(Stmt::Function { name, func })
    }

    /// `local function Name funcbody` or `local namelist ['=' explist]`
    fn parse_local(&mut self) -> Result<Stmt, ParseError> {
        self.advance()?; // local

        if self.current.kind.is_reserved(Reserved::Function) {
            self.advance()?;
            let (name, location) = self.parse_name()?;
            let var = self.push_local(name, location);
            let func = self.parse_function_body(false)?;
            return Ok(Stmt::LocalFunction { var, func });
        }

        let mut names = Vec::new();
        self.parse_name_list(&mut names, false)?;

        let values = if self.current.kind.is_char(b'=') {
            self.advance()?;
            self.parse_expr_list()?
        } else {
            Vec::new()
        };

        // bind after the initializers so they resolve in the outer scope
        let vars = names
            .into_iter()
            .map(|(name, location)| self.push_local(name, location))
            .collect();

        Ok(Stmt::Local { vars, values })
    }

    fn parse_return(&mut self) -> Result<Stmt, ParseError> {
        self.advance()?; // return

        let values = if !self.block_follow() && !self.current.kind.is_char(b';') {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };

        Ok(Stmt::Return(values))
    }

    fn parse_assignment_or_call(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_primary_expr()?;

        if matches!(self.ast.exprs.get(expr), Expr::Call { .. }) {
            Ok(Stmt::Expr(expr))
        } else {
            self.parse_assignment(expr)
        }
    }

    fn is_expr_var(&self, expr: ExprId) -> bool {
        matches!(
            self.ast.exprs.get(expr),
            Expr::Local { .. } | Expr::Global(_) | Expr::IndexName { .. } | Expr::IndexExpr { .. }
        )
    }

    fn parse_assignment(&mut self, initial: ExprId) -> Result<Stmt, ParseError> {
        if !self.is_expr_var(initial) {
            return Err(ParseError::new(
                self.ast.exprs.location(initial),
                "expression must be a variable or a field",
            ));
        }

        let mut targets = vec![initial];
        while self.current.kind.is_char(b',') {
            self.advance()?;
            let expr = self.parse_primary_expr()?;
            if !self.is_expr_var(expr) {
                return Err(ParseError::new(
                    self.ast.exprs.location(expr),
                    "expression must be a variable or a field",
                ));
            }
            targets.push(expr);
        }

        self.expect_char(b'=')?;
        self.advance()?;

        let values = self.parse_expr_list()?;
        Ok(Stmt::Assign { targets, values })
    }

    /// `funcbody ::= '(' [parlist] ')' block end`
    fn parse_function_body(&mut self, has_self: bool) -> Result<ExprId, ParseError> {
        let start = self.current.location;
        self.expect_char(b'(')?;
        self.advance()?;

        let mut names = Vec::new();
        let vararg = if self.current.kind.is_char(b')') {
            false
        } else {
            self.parse_name_list(&mut names, true)?
        };

        self.expect_char(b')')?;
        self.advance()?;

        let locals_begin = self.save_locals();
        self.function_stack.push(FuncState {
            vararg,
            loop_depth: 0,
        });

        let self_local = if has_self {
            Some(self.push_local(self.name_self, start))
        } else {
            None
        };
        let args = names
            .into_iter()
            .map(|(name, location)| self.push_local(name, location))
            .collect();

        let body = self.parse_block()?;

        self.function_stack.pop();
        self.restore_locals(locals_begin);

        self.expect_reserved(Reserved::End)?;
        let end = self.current.location;
        self.advance()?;

        Ok(self.ast.exprs.alloc(
            Expr::Function(FuncExpr {
                self_local,
                args,
                vararg,
                body,
            }),
            Location::span(start, end),
        ))
    }

    fn parse_expr_list(&mut self) -> Result<Vec<ExprId>, ParseError> {
        let mut result = vec![self.parse_expr()?];
        while self.current.kind.is_char(b',') {
            self.advance()?;
            result.push(self.parse_expr()?);
        }
        Ok(result)
    }

    /// `namelist ::= Name {',' Name}`; with `allow_dot3`, a trailing (or
    /// lone) `...` ends the list and returns true.
    fn parse_name_list(
        &mut self,
        result: &mut Vec<(NameId, Location)>,
        allow_dot3: bool,
    ) -> Result<bool, ParseError> {
        if allow_dot3 && self.current.kind == TokenKind::Dot3 {
            self.advance()?;
            return Ok(true);
        }

        result.push(self.parse_name()?);
        while self.current.kind.is_char(b',') {
            self.advance()?;
            if allow_dot3 && self.current.kind == TokenKind::Dot3 {
                self.advance()?;
                return Ok(true);
            }
            result.push(self.parse_name()?);
        }
        Ok(false)
    }

    // ---- expressions ----

    fn parse_expr(&mut self) -> Result<ExprId, ParseError> {
        Ok(self.parse_sub_expr(0)?.0)
    }

    /// `subexpr ::= (simpleexp | unop subexpr) {binop subexpr}` where the
    /// binary operator's left priority exceeds `limit`.
    fn parse_sub_expr(&mut self, limit: u8) -> Result<(ExprId, Option<BinOp>), ParseError> {
        let start = self.current.location;

        let mut expr = if let Some(op) = unary_op(&self.current.kind) {
            self.advance()?;
            let (operand, _) = self.parse_sub_expr(UNARY_PRIORITY)?;
            if op == UnOp::Minus {
                if let Expr::Number(value) = self.ast.exprs.get(operand) {
                    // fold negation into the literal
                    let negated = -*value;
                    self.ast.exprs.replace(operand, Expr::Number(negated));
                    operand
                } else {
                    let location = Location::span(start, self.ast.exprs.location(operand));
                    self.ast.exprs.alloc(Expr::Unary { op, expr: operand }, location)
                }
            } else {
                let location = Location::span(start, self.ast.exprs.location(operand));
                self.ast.exprs.alloc(Expr::Unary { op, expr: operand }, location)
            }
        } else {
            self.parse_simple_expr()?
        };

        let mut op = binary_op(&self.current.kind);
        while let Some(binop) = op {
            let (left_priority, right_priority) = BINARY_PRIORITY[binop as usize];
            if left_priority <= limit {
                break;
            }
            self.advance()?;

            let (right, next_op) = self.parse_sub_expr(right_priority)?;
            let location = Location::span(start, self.ast.exprs.location(right));
            expr = self.ast.exprs.alloc(
                Expr::Binary {
                    op: binop,
                    left: expr,
                    right,
                },
                location,
            );
            op = next_op;
        }

        Ok((expr, op))
    }

    /// `simpleexp ::= NUMBER | STRING | nil | true | false | '...' |
    /// tableconstructor | function funcbody | primaryexp`
    fn parse_simple_expr(&mut self) -> Result<ExprId, ParseError> {
        let location = self.current.location;

        match &self.current.kind {
            TokenKind::Reserved(Reserved::Nil) => {
                self.advance()?;
                Ok(self.ast.exprs.alloc(Expr::Nil, location))
            }
            TokenKind::Reserved(Reserved::True) => {
                self.advance()?;
                Ok(self.ast.exprs.alloc(Expr::Bool(true), location))
            }
            TokenKind::Reserved(Reserved::False) => {
                self.advance()?;
                Ok(self.ast.exprs.alloc(Expr::Bool(false), location))
            }
            TokenKind::Reserved(Reserved::Function) => {
                self.advance()?;
                self.parse_function_body(false)
            }
            TokenKind::Number(text) => {
                let Some(value) = number_value(text) else {
                    return Err(ParseError::new(location, "malformed number"));
                };
                self.advance()?;
                Ok(self.ast.exprs.alloc(Expr::Number(value), location))
            }
            TokenKind::Str(bytes) => {
                let bytes = bytes.clone();
                self.advance()?;
                Ok(self.ast.exprs.alloc(Expr::String(bytes), location))
            }
            TokenKind::Dot3 => {
                if !self.function_stack.last().unwrap().vararg {
                    return Err(ParseError::new(
                        location,
                        "cannot use '...' outside a vararg function",
                    ));
                }
                self.advance()?;
                Ok(self.ast.exprs.alloc(Expr::Varargs, location))
            }
            TokenKind::Char(b'{') => self.parse_table_constructor(),
            _ => self.parse_primary_expr(),
        }
    }

    /// `prefixexp ::= NAME | '(' expr ')'`
    fn parse_prefix_expr(&mut self) -> Result<ExprId, ParseError> {
        if self.current.kind.is_char(b'(') {
            let start = self.current.location;
            self.advance()?;

            let expr = self.parse_expr()?;

            let end = self.current.location;
            self.expect_char(b')')?;
            self.advance()?;

            Ok(self
                .ast
                .exprs
                .alloc(Expr::Group(expr), Location::span(start, end)))
        } else {
            self.parse_name_expr()
        }
    }

    fn parse_name_expr(&mut self) -> Result<ExprId, ParseError> {
        let (name, location) = self.parse_name()?;

        if let Some(Some(local)) = self.local_map.get(&name) {
            let local = *local;
            let upvalue =
                self.ast.locals.get(local).function_depth != self.function_stack.len() as u32;
            return Ok(self.ast.exprs.alloc(Expr::Local { local, upvalue }, location));
        }
        Ok(self.ast.exprs.alloc(Expr::Global(name), location))
    }

    /// `primaryexp ::= prefixexp {'.' NAME | '[' exp ']' | ':' NAME
    /// funcargs | funcargs}`
    fn parse_primary_expr(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current.location;
        let mut expr = self.parse_prefix_expr()?;

        loop {
            if self.current.kind.is_char(b'.') {
                self.advance()?;
                let (index, location) = self.parse_name()?;
                expr = self.ast.exprs.alloc(
                    Expr::IndexName { expr, index },
                    Location::span(start, location),
                );
            } else if self.current.kind.is_char(b'[') {
                self.advance()?;
                let index = self.parse_expr()?;
                let end = self.current.location;
                self.expect_char(b']')?;
                self.advance()?;
                expr = self
                    .ast
                    .exprs
                    .alloc(Expr::IndexExpr { expr, index }, Location::span(start, end));
            } else if self.current.kind.is_char(b':') {
                self.advance()?;
                let (index, location) = self.parse_name()?;
                let func = self.ast.exprs.alloc(
                    Expr::IndexName { expr, index },
                    Location::span(start, location),
                );
                expr = self.parse_function_args(func, true)?;
            } else if self.current.kind.is_char(b'{')
                || self.current.kind.is_char(b'(')
                || matches!(self.current.kind, TokenKind::Str(_))
            {
                expr = self.parse_function_args(expr, false)?;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// `args ::= '(' [explist] ')' | tableconstructor | STRING`
    fn parse_function_args(&mut self, func: ExprId, method: bool) -> Result<ExprId, ParseError> {
        let func_location = self.ast.exprs.location(func);

        if self.current.kind.is_char(b'(') {
            if func_location.end.line != self.current.location.begin.line {
                return Err(ParseError::new(
                    self.current.location,
                    "ambiguous syntax: this looks like an argument list for a function call, \
                     but could also be a start of new statement",
                ));
            }
            self.advance()?;

            let args = if self.current.kind.is_char(b')') {
                Vec::new()
            } else {
                self.parse_expr_list()?
            };

            let end = self.current.location;
            self.expect_char(b')')?;
            self.advance()?;

            Ok(self.ast.exprs.alloc(
                Expr::Call { func, args, method },
                Location::span(func_location, end),
            ))
        } else if self.current.kind.is_char(b'{') {
            let arg = self.parse_table_constructor()?;
            let location = Location::span(func_location, self.ast.exprs.location(arg));
            Ok(self.ast.exprs.alloc(
                Expr::Call {
                    func,
                    args: vec![arg],
                    method,
                },
                location,
            ))
        } else if let TokenKind::Str(bytes) = &self.current.kind {
            let bytes = bytes.clone();
            let location = self.current.location;
            self.advance()?;
            let arg = self.ast.exprs.alloc(Expr::String(bytes), location);
            Ok(self.ast.exprs.alloc(
                Expr::Call {
                    func,
                    args: vec![arg],
                    method,
                },
                Location::span(func_location, location),
            ))
        } else {
            Err(self.unexpected("'(', '{' or <string>"))
        }
    }

    /// `tableconstructor ::= '{' [field {fieldsep field} [fieldsep]] '}'`
    /// with `field ::= '[' exp ']' '=' exp | Name '=' exp | exp`.
    fn parse_table_constructor(&mut self) -> Result<ExprId, ParseError> {
        let start = self.current.location;
        self.expect_char(b'{')?;
        self.advance()?;

        let mut items = Vec::new();
        while !self.current.kind.is_char(b'}') {
            if self.current.kind.is_char(b'[') {
                self.advance()?;
                let key = self.parse_expr()?;
                self.expect_char(b']')?;
                self.advance()?;
                self.expect_char(b'=')?;
                self.advance()?;
                let value = self.parse_expr()?;
                items.push(TableItem {
                    key: Some(key),
                    value,
                });
            } else {
                let expr = self.parse_expr()?;

                if self.current.kind.is_char(b'=') {
                    self.advance()?;

                    // `Name = value`: the parsed expr must be a bare name
                    let name = match self.ast.exprs.get(expr) {
                        Expr::Local { local, .. } => self.ast.locals.get(*local).name,
                        Expr::Global(name) => *name,
                        _ => {
                            return Err(ParseError::new(
                                self.ast.exprs.location(expr),
                                "expected a name, got a complex expression",
                            ));
                        }
                    };
                    let bytes = self.ast.names.text(name).as_bytes().to_vec();
                    let key = self
                        .ast
                        .exprs
                        .alloc(Expr::String(bytes), self.ast.exprs.location(expr));
                    let value = self.parse_expr()?;
                    items.push(TableItem {
                        key: Some(key),
                        value,
                    });
                } else {
                    items.push(TableItem {
                        key: None,
                        value: expr,
                    });
                }
            }

            if self.current.kind.is_char(b',') || self.current.kind.is_char(b';') {
                self.advance()?;
            } else {
                self.expect_char(b'}')?;
            }
        }

        let end = self.current.location;
        self.advance()?;

        Ok(self
            .ast
            .exprs
            .alloc(Expr::Table { items }, Location::span(start, end)))
    }

    fn parse_name(&mut self) -> Result<(NameId, Location), ParseError> {
        let TokenKind::Name(name) = &self.current.kind else {
            return Err(self.unexpected("<name>"));
        };
        let name = *name;
        let location = self.current.location;
        self.advance()?;
        Ok((name, location))
    }
}

fn unary_op(kind: &TokenKind) -> Option<UnOp> {
    match kind {
        TokenKind::Reserved(Reserved::Not) => Some(UnOp::Not),
        TokenKind::Char(b'-') => Some(UnOp::Minus),
        TokenKind::Char(b'#') => Some(UnOp::Len),
        _ => None,
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::Char(b'+') => Some(BinOp::Add),
        TokenKind::Char(b'-') => Some(BinOp::Sub),
        TokenKind::Char(b'*') => Some(BinOp::Mul),
        TokenKind::Char(b'/') => Some(BinOp::Div),
        TokenKind::Char(b'%') => Some(BinOp::Mod),
        TokenKind::Char(b'^') => Some(BinOp::Pow),
        TokenKind::Dot2 => Some(BinOp::Concat),
        TokenKind::NotEqual => Some(BinOp::CompareNe),
        TokenKind::Equal => Some(BinOp::CompareEq),
        TokenKind::Char(b'<') => Some(BinOp::CompareLt),
        TokenKind::LessEqual => Some(BinOp::CompareLe),
        TokenKind::Char(b'>') => Some(BinOp::CompareGt),
        TokenKind::GreaterEqual => Some(BinOp::CompareGe),
        TokenKind::Reserved(Reserved::And) => Some(BinOp::And),
        TokenKind::Reserved(Reserved::Or) => Some(BinOp::Or),
        _ => None,
    }
}

/// Convert a number literal: decimal (with fraction/exponent) or `0x` hex.
fn number_value(text: &str) -> Option<f64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok().map(|v| v as f64);
    }
    text.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> (Ast, Vec<Stmt>) {
        let mut ast = Ast::new();
        let body = Parser::parse(source.as_bytes(), &mut ast).unwrap();
        (ast, body)
    }

    #[test]
    fn locals_resolve_and_shadow() {
        let (ast, body) = parse_ok("local x = 1\ndo\n    local x = 2\nend\nx = 3\n");
        assert_eq!(body.len(), 3);

        let Stmt::Local { vars, .. } = &body[0] else {
            panic!("expected local");
        };
        let outer = vars[0];

        // after the do-block closes, `x` resolves to the outer binding again
        let Stmt::Assign { targets, .. } = &body[2] else {
            panic!("expected assignment");
        };
        let Expr::Local { local, .. } = ast.exprs.get(targets[0]) else {
            panic!("expected local reference");
        };
        assert_eq!(*local, outer);
    }

    #[test]
    fn operator_precedence_follows_the_table() {
        let (ast, body) = parse_ok("return 1 + 2 * 3\n");
        let Stmt::Return(values) = &body[0] else {
            panic!("expected return");
        };
        let Expr::Binary { op, right, .. } = ast.exprs.get(values[0]) else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinOp::Add);
        assert!(matches!(
            ast.exprs.get(*right),
            Expr::Binary { op: BinOp::Mul, .. }
        ));
    }

    #[test]
    fn power_is_right_associative() {
        let (ast, body) = parse_ok("return 2 ^ 3 ^ 4\n");
        let Stmt::Return(values) = &body[0] else {
            panic!("expected return");
        };
        let Expr::Binary { op, left, .. } = ast.exprs.get(values[0]) else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinOp::Pow);
        assert!(matches!(ast.exprs.get(*left), Expr::Number(n) if *n == 2.0));
    }

    #[test]
    fn constant_if_conditions_fold() {
        let (_, body) = parse_ok("if true then return 1 end\n");
        assert!(matches!(&body[0], Stmt::Do(inner) if inner.len() == 1));

        let (_, body) = parse_ok("if false then return 1 else return 2 end\n");
        assert!(matches!(&body[0], Stmt::Do(inner) if inner.len() == 1));
    }

    #[test]
    fn negated_number_literals_fold() {
        let (ast, body) = parse_ok("return -5\n");
        let Stmt::Return(values) = &body[0] else {
            panic!("expected return");
        };
        assert!(matches!(ast.exprs.get(values[0]), Expr::Number(n) if *n == -5.0));
    }

    #[test]
    fn hex_numbers_parse() {
        let (ast, body) = parse_ok("return 0x1F\n");
        let Stmt::Return(values) = &body[0] else {
            panic!("expected return");
        };
        assert!(matches!(ast.exprs.get(values[0]), Expr::Number(n) if *n == 31.0));
    }

    #[test]
    fn break_outside_a_loop_is_rejected() {
        let mut ast = Ast::new();
        assert!(Parser::parse(b"break\n", &mut ast).is_err());
    }

    #[test]
    fn varargs_outside_vararg_function_is_rejected() {
        let mut ast = Ast::new();
        // the chunk itself is vararg; a plain nested function is not
        assert!(Parser::parse(b"return ...\n", &mut ast).is_ok());
        let mut ast = Ast::new();
        assert!(Parser::parse(b"local f = function() return ... end\n", &mut ast).is_err());
    }

    #[test]
    fn method_definitions_carry_a_self_local() {
        let (ast, body) = parse_ok("function T:m(a)\n    return self, a\nend\n");
        let Stmt::Function { func, .. } = &body[0] else {
            panic!("expected function statement");
        };
        let Expr::Function(f) = ast.exprs.get(*func) else {
            panic!("expected function expression");
        };
        assert!(f.self_local.is_some());
        assert_eq!(f.args.len(), 1);
    }

    #[test]
    fn ambiguous_call_across_lines_is_rejected() {
        let mut ast = Ast::new();
        assert!(Parser::parse(b"f\n(1)\n", &mut ast).is_err());
    }
}
