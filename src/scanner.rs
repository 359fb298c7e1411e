use std::ops::Range;

use crate::error::SourceLocation;

pub fn is_identifier_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

pub fn is_identifier_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Result of trying to read a quoted string at the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quoted<'a> {
    /// the cursor was not at a quote, nothing was consumed
    Missing,
    /// the string ran into a newline or the end of the file
    Unterminated,
    Text(&'a str),
}

/// Byte cursor over shader source that tracks 1-based line numbers.
///
/// Every token the transpiler cares about is ASCII, so positions are byte
/// offsets and non-ASCII text is only ever skipped over.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    line_start: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.pos - self.line_start + 1)
    }

    pub fn slice(&self, range: Range<usize>) -> &'a str {
        self.source.get(range).unwrap_or_default()
    }

    pub fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.as_bytes().get(self.pos + offset).copied()
    }

    pub fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
        Some(byte)
    }

    pub fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn advance_to(&mut self, pos: usize) {
        while self.pos < pos && self.bump().is_some() {}
    }

    /// spaces, tabs and carriage returns, but not newlines
    pub fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
            self.bump();
        }
    }

    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.bump();
        }
    }

    /// whitespace and comments
    pub fn skip_trivia(&mut self) {
        loop {
            self.skip_whitespace();
            if !self.skip_comment() {
                break;
            }
        }
    }

    pub fn at_comment(&self) -> bool {
        self.peek() == Some(b'/') && matches!(self.peek_at(1), Some(b'/' | b'*'))
    }

    /// Skips a line or block comment, returning false when the cursor is not
    /// at one. An unterminated block comment runs to the end of the file.
    pub fn skip_comment(&mut self) -> bool {
        if !self.at_comment() {
            return false;
        }
        if self.peek_at(1) == Some(b'/') {
            while self.peek().is_some_and(|byte| byte != b'\n') {
                self.bump();
            }
        } else {
            self.pos += 2;
            while let Some(byte) = self.bump() {
                if byte == b'*' && self.eat(b'/') {
                    break;
                }
            }
        }
        true
    }

    /// Moves to the newline ending the current logical line, following
    /// backslash continuations.
    pub fn skip_line(&mut self) {
        let end = self.line_end();
        self.advance_to(end);
    }

    /// Offset of the newline ending the current logical line, or the end of
    /// the file.
    pub fn line_end(&self) -> usize {
        let bytes = self.source.as_bytes();
        let mut pos = self.pos;
        while pos < bytes.len() {
            if bytes[pos] == b'\n' {
                let continued = bytes[self.pos..pos]
                    .iter()
                    .rev()
                    .find(|byte| **byte != b'\r')
                    .is_some_and(|byte| *byte == b'\\');
                if !continued {
                    return pos;
                }
            }
            pos += 1;
        }
        bytes.len()
    }

    /// Skips a double quoted string literal including escapes.
    pub fn skip_string_literal(&mut self) {
        if !self.eat(b'"') {
            return;
        }
        while let Some(byte) = self.peek() {
            match byte {
                b'\\' => {
                    self.bump();
                    self.bump();
                }
                b'"' => {
                    self.bump();
                    return;
                }
                b'\n' => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Reads an identifier, returning an empty string when the cursor is not
    /// at an identifier start.
    pub fn read_identifier(&mut self) -> &'a str {
        let start = self.pos;
        if self.peek().is_some_and(is_identifier_start) {
            while self.peek().is_some_and(is_identifier_continue) {
                self.bump();
            }
        }
        self.slice(start..self.pos)
    }

    /// Reads a bare attribute or field value such as `Float3`, `0.5f` or `-1`.
    pub fn read_value_token(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|byte| is_identifier_continue(byte) || matches!(byte, b'.' | b'-' | b'+'))
        {
            self.bump();
        }
        self.slice(start..self.pos)
    }

    /// Reads a string delimited by single or double quotes on a single line.
    pub fn read_quoted(&mut self) -> Quoted<'a> {
        let Some(quote @ (b'"' | b'\'')) = self.peek() else {
            return Quoted::Missing;
        };
        self.bump();
        let start = self.pos;
        loop {
            match self.peek() {
                None | Some(b'\n') => return Quoted::Unterminated,
                Some(byte) if byte == quote => {
                    let text = self.slice(start..self.pos);
                    self.bump();
                    return Quoted::Text(text);
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Reads either a quoted string or a bare value token.
    pub fn read_value(&mut self) -> Quoted<'a> {
        match self.read_quoted() {
            Quoted::Missing => match self.read_value_token() {
                "" => Quoted::Missing,
                token => Quoted::Text(token),
            },
            quoted => quoted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.advance_to(4);
        assert_eq!(cursor.location(), SourceLocation::new(2, 2));
    }

    #[test]
    fn skips_comments_and_whitespace() {
        let mut cursor = Cursor::new("  // line\n /* block\n */ word");
        cursor.skip_trivia();
        assert_eq!(cursor.read_identifier(), "word");
        assert_eq!(cursor.location().line, 3);
    }

    #[test]
    fn line_end_follows_continuations() {
        let source = "#define A \\\n  1\nnext";
        let cursor = Cursor::new(source);
        assert_eq!(&source[cursor.line_end()..], "\nnext");
    }

    #[test]
    fn reads_quoted_strings_with_either_quote() {
        let mut cursor = Cursor::new("\"Main\" 'Other' \"broken\n");
        assert_eq!(cursor.read_quoted(), Quoted::Text("Main"));
        cursor.skip_inline_whitespace();
        assert_eq!(cursor.read_quoted(), Quoted::Text("Other"));
        cursor.skip_inline_whitespace();
        assert_eq!(cursor.read_quoted(), Quoted::Unterminated);
    }

    #[test]
    fn reads_bare_values() {
        let mut cursor = Cursor::new("0.5f, Float3)");
        assert_eq!(cursor.read_value(), Quoted::Text("0.5f"));
        assert!(cursor.eat(b','));
        cursor.skip_inline_whitespace();
        assert_eq!(cursor.read_value(), Quoted::Text("Float3"));
        assert_eq!(cursor.read_value(), Quoted::Missing);
    }

    #[test]
    fn identifiers_do_not_start_with_digits() {
        let mut cursor = Cursor::new("4x");
        assert_eq!(cursor.read_identifier(), "");
        assert_eq!(cursor.pos(), 0);
    }
}
