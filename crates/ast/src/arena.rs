use crate::expr::Expr;
use crate::pos::Location;

/// Opaque expression identifier. Index into [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// Flat arena storing all expressions in a job.
///
/// Expressions reference each other by `ExprId`, not by nesting. This makes
/// the optimizer's substitution O(1): replacing a variable reference with an
/// expression is overwriting the slot. Locations are kept in a parallel
/// table so the node enum stays small.
#[derive(Debug, Default)]
pub struct ExprArena {
    exprs: Vec<Expr>,
    locations: Vec<Location>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self {
            exprs: Vec::new(),
            locations: Vec::new(),
        }
    }

    /// Allocate a new expression, returns its id.
    pub fn alloc(&mut self, expr: Expr, location: Location) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        self.locations.push(location);
        id
    }

    pub fn get(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.0 as usize]
    }

    /// Overwrite a slot in place, keeping its location.
    pub fn replace(&mut self, id: ExprId, expr: Expr) {
        self.exprs[id.0 as usize] = expr;
    }

    /// Overwrite `dst` with a shallow copy of `src` (node and location).
    /// Children stay shared by id.
    pub fn copy_node(&mut self, dst: ExprId, src: ExprId) {
        self.exprs[dst.0 as usize] = self.exprs[src.0 as usize].clone();
        self.locations[dst.0 as usize] = self.locations[src.0 as usize];
    }

    pub fn location(&self, id: ExprId) -> Location {
        self.locations[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}
