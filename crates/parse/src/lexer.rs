use ember_ast::name::{NameId, NameTable, Reserved};
use ember_ast::pos::{Location, Position};

use crate::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Eof,
    /// A single-character token (`+`, `{`, `=`, ...).
    Char(u8),
    Equal,
    LessEqual,
    GreaterEqual,
    NotEqual,
    Dot2,
    Dot3,
    /// String literal with escapes already decoded.
    Str(Vec<u8>),
    /// Number literal, raw text (converted during parsing).
    Number(String),
    Name(NameId),
    Reserved(Reserved),
}

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

impl TokenKind {
    pub fn is_char(&self, c: u8) -> bool {
        matches!(self, TokenKind::Char(have) if *have == c)
    }

    pub fn is_reserved(&self, word: Reserved) -> bool {
        matches!(self, TokenKind::Reserved(have) if *have == word)
    }
}

/// Token description for error messages.
pub(crate) fn describe(kind: &TokenKind, names: &NameTable) -> String {
    match kind {
        TokenKind::Eof => "'<eof>'".to_string(),
        TokenKind::Char(c) => format!("'{}'", *c as char),
        TokenKind::Equal => "'=='".to_string(),
        TokenKind::LessEqual => "'<='".to_string(),
        TokenKind::GreaterEqual => "'>='".to_string(),
        TokenKind::NotEqual => "'~='".to_string(),
        TokenKind::Dot2 => "'..'".to_string(),
        TokenKind::Dot3 => "'...'".to_string(),
        TokenKind::Str(bytes) => format!("\"{}\"", String::from_utf8_lossy(bytes)),
        TokenKind::Number(text) => format!("'{}'", text),
        TokenKind::Name(id) => format!("'{}'", names.text(*id)),
        TokenKind::Reserved(word) => {
            let text = ember_ast::name::RESERVED
                .iter()
                .find(|(_, r)| r == word)
                .map(|(t, _)| *t)
                .unwrap_or("?");
            format!("'{}'", text)
        }
    }
}

pub(crate) struct Lexer<'s> {
    source: &'s [u8],
    offset: usize,
    line: u32,
    line_offset: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            line_offset: 0,
        }
    }

    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, lookahead: usize) -> u8 {
        self.source
            .get(self.offset + lookahead)
            .copied()
            .unwrap_or(0)
    }

    fn position(&self) -> Position {
        Position::new(self.line, (self.offset - self.line_offset) as u32)
    }

    fn here(&self) -> Location {
        let p = self.position();
        Location::new(p, p)
    }

    fn consume(&mut self) {
        if self.peek() == b'\n' {
            self.line += 1;
            self.line_offset = self.offset + 1;
        }
        self.offset += 1;
    }

    /// Read the next token, skipping whitespace and comments.
    pub fn next(&mut self, names: &mut NameTable) -> Result<Token, ParseError> {
        loop {
            if is_space(self.peek()) {
                while is_space(self.peek()) {
                    self.consume();
                }
            } else if self.peek() == b'-' && self.peek_at(1) == b'-' {
                self.consume();
                self.consume();
                self.skip_comment_body()?;
            } else {
                break;
            }
        }

        self.read_token(names)
    }

    fn skip_comment_body(&mut self) -> Result<(), ParseError> {
        if self.peek() == b'[' {
            let sep = self.skip_long_separator();
            if sep >= 0 {
                let start = self.position();
                if self.read_long_string(sep as usize).is_none() {
                    return Err(ParseError::new(
                        Location::new(start, self.position()),
                        "unfinished long comment",
                    ));
                }
                return Ok(());
            }
        }

        while self.peek() != 0 && self.peek() != b'\n' {
            self.consume();
        }
        Ok(())
    }

    /// Given `[===[` or `]===]`, consumes the opening bracket and the `=`
    /// run. Returns the separator length, or a negative value when the run
    /// is not closed by the same bracket. Does not consume the closer.
    fn skip_long_separator(&mut self) -> i32 {
        let start = self.peek();
        self.consume();

        let mut count = 0;
        while self.peek() == b'=' {
            self.consume();
            count += 1;
        }

        if self.peek() == start {
            count
        } else {
            -count - 1
        }
    }

    fn read_long_string(&mut self, sep: usize) -> Option<Vec<u8>> {
        // skip the second opening bracket
        self.consume();
        if self.peek() == b'\n' {
            self.consume();
        }

        let start = self.offset;
        while self.peek() != 0 {
            if self.peek() == b']' {
                if self.skip_long_separator() == sep as i32 {
                    self.consume();
                    let end = self.offset - sep - 2;
                    return Some(self.source[start..end].to_vec());
                }
            } else {
                self.consume();
            }
        }
        None
    }

    fn read_string(&mut self) -> Result<Vec<u8>, ParseError> {
        let start = self.position();
        let delimiter = self.peek();
        self.consume();

        let mut data = Vec::new();
        while self.peek() != delimiter {
            match self.peek() {
                0 | b'\r' | b'\n' => {
                    return Err(ParseError::new(
                        Location::new(start, self.position()),
                        "unfinished string",
                    ));
                }
                b'\\' => {
                    self.consume();
                    data.push(self.read_escaped_char(start)?);
                }
                b => {
                    data.push(b);
                    self.consume();
                }
            }
        }
        self.consume();
        Ok(data)
    }

    fn read_escaped_char(&mut self, start: Position) -> Result<u8, ParseError> {
        match self.peek() {
            b'\n' => {
                self.consume();
                Ok(b'\n')
            }
            b'\r' => {
                self.consume();
                if self.peek() == b'\n' {
                    self.consume();
                }
                Ok(b'\n')
            }
            0 => Err(ParseError::new(
                Location::new(start, self.position()),
                "unfinished string",
            )),
            b if b.is_ascii_digit() => {
                let mut code: u32 = 0;
                let mut digits = 0;
                while digits < 3 && self.peek().is_ascii_digit() {
                    code = 10 * code + (self.peek() - b'0') as u32;
                    self.consume();
                    digits += 1;
                }
                if code > u8::MAX as u32 {
                    return Err(ParseError::new(
                        Location::new(start, self.position()),
                        "escape sequence too large",
                    ));
                }
                Ok(code as u8)
            }
            b => {
                self.consume();
                Ok(unescape(b))
            }
        }
    }

    fn read_number(&mut self, start_offset: usize) -> String {
        while self.peek().is_ascii_digit() || self.peek() == b'.' {
            self.consume();
        }
        if self.peek() == b'e' || self.peek() == b'E' {
            self.consume();
            if self.peek() == b'+' || self.peek() == b'-' {
                self.consume();
            }
        }
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.consume();
        }
        String::from_utf8_lossy(&self.source[start_offset..self.offset]).into_owned()
    }

    fn read_token(&mut self, names: &mut NameTable) -> Result<Token, ParseError> {
        let start = self.position();
        let token = |kind, begin: Position, end: Position| Token {
            kind,
            location: Location::new(begin, end),
        };

        match self.peek() {
            0 => Ok(token(TokenKind::Eof, start, start)),
            b'-' => {
                self.consume();
                Ok(token(TokenKind::Char(b'-'), start, self.position()))
            }
            b'[' => {
                let sep = self.skip_long_separator();
                if sep >= 0 {
                    match self.read_long_string(sep as usize) {
                        Some(data) => Ok(token(TokenKind::Str(data), start, self.position())),
                        None => Err(ParseError::new(
                            Location::new(start, self.position()),
                            "unfinished long string",
                        )),
                    }
                } else if sep == -1 {
                    Ok(token(TokenKind::Char(b'['), start, self.position()))
                } else {
                    Err(ParseError::new(
                        Location::new(start, self.position()),
                        "invalid long string delimiter",
                    ))
                }
            }
            b'=' => {
                self.consume();
                if self.peek() == b'=' {
                    self.consume();
                    Ok(token(TokenKind::Equal, start, self.position()))
                } else {
                    Ok(token(TokenKind::Char(b'='), start, self.position()))
                }
            }
            b'<' => {
                self.consume();
                if self.peek() == b'=' {
                    self.consume();
                    Ok(token(TokenKind::LessEqual, start, self.position()))
                } else {
                    Ok(token(TokenKind::Char(b'<'), start, self.position()))
                }
            }
            b'>' => {
                self.consume();
                if self.peek() == b'=' {
                    self.consume();
                    Ok(token(TokenKind::GreaterEqual, start, self.position()))
                } else {
                    Ok(token(TokenKind::Char(b'>'), start, self.position()))
                }
            }
            b'~' => {
                self.consume();
                if self.peek() == b'=' {
                    self.consume();
                    Ok(token(TokenKind::NotEqual, start, self.position()))
                } else {
                    Ok(token(TokenKind::Char(b'~'), start, self.position()))
                }
            }
            b'"' | b'\'' => {
                let data = self.read_string()?;
                Ok(token(TokenKind::Str(data), start, self.position()))
            }
            b'.' => {
                self.consume();
                if self.peek() == b'.' {
                    self.consume();
                    if self.peek() == b'.' {
                        self.consume();
                        Ok(token(TokenKind::Dot3, start, self.position()))
                    } else {
                        Ok(token(TokenKind::Dot2, start, self.position()))
                    }
                } else if self.peek().is_ascii_digit() {
                    let text = self.read_number(self.offset - 1);
                    Ok(token(TokenKind::Number(text), start, self.position()))
                } else {
                    Ok(token(TokenKind::Char(b'.'), start, self.position()))
                }
            }
            b if b.is_ascii_digit() => {
                let text = self.read_number(self.offset);
                Ok(token(TokenKind::Number(text), start, self.position()))
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                let start_offset = self.offset;
                while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
                    self.consume();
                }
                let text = String::from_utf8_lossy(&self.source[start_offset..self.offset])
                    .into_owned();
                let id = names.intern(&text);
                let kind = match names.classify(id) {
                    Some(word) => TokenKind::Reserved(word),
                    None => TokenKind::Name(id),
                };
                Ok(token(kind, start, self.position()))
            }
            b => {
                self.consume();
                Ok(token(TokenKind::Char(b), start, self.position()))
            }
        }
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn unescape(b: u8) -> u8 {
    match b {
        b'a' => 0x07,
        b'b' => 0x08,
        b'f' => 0x0C,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'v' => 0x0B,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &[u8]) -> Vec<TokenKind> {
        let mut names = NameTable::new();
        let mut lexer = Lexer::new(source);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next(&mut names).unwrap();
            let done = token.kind == TokenKind::Eof;
            kinds.push(token.kind);
            if done {
                break;
            }
        }
        kinds
    }

    #[test]
    fn operators_and_names() {
        let kinds = lex_all(b"a == b ~= ... ..");
        assert!(matches!(kinds[0], TokenKind::Name(_)));
        assert_eq!(kinds[1], TokenKind::Equal);
        assert!(matches!(kinds[2], TokenKind::Name(_)));
        assert_eq!(kinds[3], TokenKind::NotEqual);
        assert_eq!(kinds[4], TokenKind::Dot3);
        assert_eq!(kinds[5], TokenKind::Dot2);
    }

    #[test]
    fn reserved_words_are_not_names() {
        let kinds = lex_all(b"while true do end");
        assert_eq!(kinds[0], TokenKind::Reserved(Reserved::While));
        assert_eq!(kinds[1], TokenKind::Reserved(Reserved::True));
        assert_eq!(kinds[2], TokenKind::Reserved(Reserved::Do));
        assert_eq!(kinds[3], TokenKind::Reserved(Reserved::End));
    }

    #[test]
    fn strings_decode_escapes() {
        let kinds = lex_all(br#""a\n\065\t""#);
        assert_eq!(kinds[0], TokenKind::Str(b"a\nA\t".to_vec()));
    }

    #[test]
    fn long_strings_and_comments() {
        let kinds = lex_all(b"-- line comment\n--[[ long\ncomment ]] [[raw\ntext]]");
        assert_eq!(kinds[0], TokenKind::Str(b"raw\ntext".to_vec()));
    }

    #[test]
    fn unfinished_string_is_an_error() {
        let mut names = NameTable::new();
        let mut lexer = Lexer::new(b"\"abc");
        assert!(lexer.next(&mut names).is_err());
    }
}
