//! The ParseError type and source position helpers.
//!
//! A [`ParseError`] points at the first character the grammar could not
//! match. Positions are reported both as a byte offset (for tooling that
//! slices the source) and as a 1-based line and column (for people).

use std::fmt;

use crate::error::ErrorCode;

/// A 1-based line and column inside a source text.
///
/// Columns count characters, not bytes, and tabs are not expanded. Every
/// newline consumed, including the one inside a line continuation, starts a
/// new line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    line: usize,
    column: usize,
}

impl Position {
    /// Create a position from explicit line and column numbers.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Compute the position of a byte offset inside `source`.
    ///
    /// Offsets past the end of the source are clamped to the end.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let prefix = source.get(..offset).unwrap_or(source);

        let line = prefix.matches('\n').count() + 1;
        let line_start = prefix.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = prefix[line_start..].chars().count() + 1;

        Self { line, column }
    }

    /// The 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The 1-based column number.
    pub fn column(&self) -> usize {
        self.column
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Error returned when text does not match a construct's grammar.
///
/// Parsing is all-or-nothing: no partial tree is produced alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    code: ErrorCode,
    message: String,
    offset: usize,
    position: Position,
}

impl ParseError {
    /// Create a parse error located at `offset` inside `source`.
    pub fn at(source: &str, offset: usize, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            offset,
            position: Position::from_offset(source, offset),
        }
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The diagnostic message, without position information.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset of the first non-matching character.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Line and column of the first non-matching character.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Shorthand for `position().line()`.
    pub fn line(&self) -> usize {
        self.position.line
    }

    /// Shorthand for `position().column()`.
    pub fn column(&self) -> usize {
        self.position.column
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_first_line() {
        let position = Position::from_offset("ARG ", 4);
        assert_eq!(position, Position::new(1, 5));
    }

    #[test]
    fn test_position_after_newlines() {
        let source = "FROM a\nRUN b \\\n  c";
        let offset = source.find('c').unwrap();
        assert_eq!(Position::from_offset(source, offset), Position::new(3, 3));
    }

    #[test]
    fn test_position_counts_characters() {
        let source = "LABEL é=\tx";
        let offset = source.find('x').unwrap();
        assert_eq!(Position::from_offset(source, offset).column(), 10);
    }

    #[test]
    fn test_position_clamps_offset() {
        assert_eq!(Position::from_offset("ab", 10), Position::new(1, 3));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::at("FROM\n!", 5, ErrorCode::E100, "expected instruction");
        assert_eq!(err.to_string(), "expected instruction (line 2, column 1)");
        assert_eq!(err.code(), ErrorCode::E100);
        assert_eq!(err.offset(), 5);
    }
}
