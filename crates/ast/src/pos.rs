/// A zero-based source position.
///
/// The bytecode reader has no column information and synthesizes
/// `column = 0`; only the text parser produces real columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A `(begin, end)` position pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub begin: Position,
    pub end: Position,
}

impl Location {
    pub fn new(begin: Position, end: Position) -> Self {
        Self { begin, end }
    }

    /// A zero-width location at the start of `line`.
    pub fn at_line(line: u32) -> Self {
        let p = Position::new(line, 0);
        Self { begin: p, end: p }
    }

    /// The span from the start of `a` to the end of `b`.
    pub fn span(a: Location, b: Location) -> Self {
        Self {
            begin: a.begin,
            end: b.end,
        }
    }
}
