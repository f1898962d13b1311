use crate::name::NameId;
use crate::pos::Location;

/// Opaque local-variable identifier. Index into [`LocalTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(pub u32);

/// A lexically scoped variable.
///
/// `shadow` points at the previous binding of the same spelling; the text
/// parser walks it when a scope closes to restore the outer binding.
/// `function_depth` is the nesting depth of the function that introduced
/// the local; a reference from a deeper function is an upvalue.
#[derive(Debug, Clone)]
pub struct Local {
    pub name: NameId,
    pub location: Location,
    pub shadow: Option<LocalId>,
    pub function_depth: u32,
}

/// Flat storage for all locals in a job.
#[derive(Debug, Default)]
pub struct LocalTable {
    locals: Vec<Local>,
}

impl LocalTable {
    pub fn new() -> Self {
        Self { locals: Vec::new() }
    }

    pub fn alloc(&mut self, local: Local) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(local);
        id
    }

    pub fn get(&self, id: LocalId) -> &Local {
        &self.locals[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: LocalId) -> &mut Local {
        &mut self.locals[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }
}
