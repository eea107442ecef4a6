//! Source locations for diagnostics.

use std::fmt;

/// A line/column position in the source text.
///
/// Both coordinates are 1-based. Columns count characters, not bytes, so a
/// multi-byte identifier still advances the column by one per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// The location of the first character of any input.
    pub const START: Location = Location { line: 1, column: 1 };

    /// Create a location from explicit coordinates.
    #[inline]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Move past one consumed character.
    #[inline]
    pub fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    /// Move past every character of `text`.
    #[inline]
    pub fn advance_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.advance(ch);
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_plain_characters() {
        let mut loc = Location::START;
        loc.advance('a');
        loc.advance('b');
        assert_eq!(loc, Location::new(1, 3));
    }

    #[test]
    fn test_newline_resets_column() {
        let mut loc = Location::START;
        loc.advance_str("ab\ncd");
        assert_eq!(loc, Location::new(2, 3));
    }

    #[test]
    fn test_multibyte_counts_once() {
        let mut loc = Location::START;
        loc.advance_str("рок");
        assert_eq!(loc, Location::new(1, 4));
    }

    #[test]
    fn test_display() {
        assert_eq!(Location::new(3, 7).to_string(), "line 3, column 7");
    }
}
