//! Lexer and recursive-descent parser over source text.
//!
//! Shares the decompiler's AST; used by the format entry point to
//! round-trip a script through parse-and-reprint. Locals are scoped with a
//! save/restore stack: each binding records the binding it shadows, and
//! closing a scope walks those shadow pointers back.

mod lexer;
mod parser;

use ember_ast::pos::Location;
use ember_ast::stmt::Stmt;
use ember_ast::Ast;

/// A lexing or parsing failure, with the source location (1-based line).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at line {}: {message}", location.begin.line)]
pub struct ParseError {
    pub location: Location,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(location: Location, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

/// Parse a complete chunk, returning the top-level statement list.
pub fn parse(source: &[u8], ast: &mut Ast) -> Result<Vec<Stmt>, ParseError> {
    parser::Parser::parse(source, ast)
}
