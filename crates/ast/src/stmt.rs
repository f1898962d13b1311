use crate::arena::ExprId;
use crate::local::LocalId;

/// An `if` statement. The else branch, when present, is either a plain
/// block or a nested `if` forming an `elseif` chain.
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: ExprId,
    pub then_body: Vec<Stmt>,
    pub else_body: Option<Box<ElseBody>>,
}

#[derive(Debug, Clone)]
pub enum ElseBody {
    Else(Vec<Stmt>),
    ElseIf(IfStmt),
}

/// A statement node. Bodies are held by value; expressions by arena id.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `do ... end` (also produced when the parser folds a constant `if`).
    Do(Vec<Stmt>),
    If(IfStmt),
    While { condition: ExprId, body: Vec<Stmt> },
    Repeat { body: Vec<Stmt>, condition: ExprId },
    Break,
    Return(Vec<ExprId>),
    /// Expression in statement position (a call).
    Expr(ExprId),
    /// `local v1, v2, ... [= e1, e2, ...]`
    Local {
        vars: Vec<LocalId>,
        values: Vec<ExprId>,
    },
    /// `local function name(...) ... end`; `func` is a `Function` expression.
    LocalFunction { var: LocalId, func: ExprId },
    /// Numeric `for var = from, to [, step] do ... end`.
    For {
        var: LocalId,
        from: ExprId,
        to: ExprId,
        step: Option<ExprId>,
        body: Vec<Stmt>,
    },
    /// `for v1, ... in e1, ... do ... end`.
    ForIn {
        vars: Vec<LocalId>,
        values: Vec<ExprId>,
        body: Vec<Stmt>,
    },
    /// `lv1, lv2, ... = e1, e2, ...`
    Assign {
        targets: Vec<ExprId>,
        values: Vec<ExprId>,
    },
    /// `function name.chain[:method](...) ... end`; `func` is a `Function`
    /// expression, `name` the lvalue chain.
    Function { name: ExprId, func: ExprId },
}
