//! Register-machine lifter: turns one prototype's instruction stream into
//! a nested block of AST statements.
//!
//! Registers are bound to synthetic locals lazily; the first write to a
//! register creates `var<N>` and emits a `local` binding, later writes
//! re-assign it. Multi-value producers (calls with open result counts,
//! vararg loads) park a *tail expression* that the next consumer expands.
//! `Test`/`NotTest` open conditional regions resolved when their jump
//! offset is reached; backward `LoopJump`s slice the accumulated body into
//! `while` loops. Completed regions are optimized bottom-up before they
//! are wrapped, so inner blocks are already clean when outer regions close.

mod lifter;

use ember_ast::stmt::Stmt;
use ember_ast::Ast;
use ember_bytecode::Chunk;

pub use lifter::LiftError;

/// A lifted program body plus the advisory flag raised while lifting.
#[derive(Debug)]
pub struct LiftOutput {
    pub body: Vec<Stmt>,
    pub flagged: bool,
}

/// Lift the chunk's main prototype (recursing into child prototypes at
/// their closure sites).
pub fn lift_chunk(chunk: &Chunk, ast: &mut Ast) -> Result<LiftOutput, LiftError> {
    let mut lifter = lifter::Lifter::new(chunk, ast);
    let (_args, body) = lifter.lift_proto(chunk.main, Vec::new())?;
    Ok(LiftOutput {
        body,
        flagged: lifter.flagged(),
    })
}
