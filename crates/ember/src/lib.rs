//! Ember — a decompiler for an obfuscated Lua-family bytecode format.
//!
//! The pipeline reads a compiled program (prototype forest, pooled string
//! table, constant pool), lifts each prototype's register machine into AST
//! statements, cleans the result up, and prints source text. A companion
//! entry point re-formats plain source through the same printer.
//!
//! Recovery is not promised to be perfect: the compiler erases names and
//! comments, and a handful of shapes (structured `for` loops, `and`/`or`,
//! comparison conditionals) are recovered best-effort. When the pipeline
//! cannot prove the output equivalent it prepends an advisory comment
//! rather than failing; everything else fails fast with no partial output.

pub use ember_bytecode::ReadError;
pub use ember_lift::LiftError;
pub use ember_parse::ParseError;

use ember_ast::Ast;

/// Why a decompilation job failed. The reader reports in-band compiler
/// rejections, version mismatches, and malformed input; the lifter reports
/// violated invariants in the instruction stream.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecompileError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Lift(#[from] LiftError),
}

/// Decompile a compiled program to source text.
///
/// The advisory flag preamble is included in the output when set; errors
/// produce no partial output.
pub fn decompile(bytecode: &[u8]) -> Result<String, DecompileError> {
    let mut ast = Ast::new();
    let chunk = ember_bytecode::read(bytecode, &mut ast)?;
    let lifted = ember_lift::lift_chunk(&chunk, &mut ast)?;
    let flagged = chunk.flagged || lifted.flagged;
    Ok(ember_emit::print(&ast, &lifted.body, flagged))
}

/// Parse source text and re-print it with the decompiler's printer.
pub fn format(source: &[u8]) -> Result<String, ParseError> {
    let mut ast = Ast::new();
    let body = ember_parse::parse(source, &mut ast)?;
    Ok(ember_emit::print(&ast, &body, false))
}
