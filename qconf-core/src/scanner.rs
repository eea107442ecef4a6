//! Character cursor with position tracking and trivia skipping.
//!
//! Every character the parser consumes goes through [`Scanner::bump`] or
//! [`Scanner::advance_by`], so the [`Location`] stays accurate even after
//! long comments or string bodies.

use memchr::memmem;
use unicode_xid::UnicodeXID;

use crate::error::{ParseError, SyntaxErrorCode};
use crate::span::Location;
use crate::xml::{is_name_char, is_name_start_char};

pub(crate) const LINE_COMMENT: &str = "//";
pub(crate) const BLOCK_COMMENT_OPEN: &str = "/#";
pub(crate) const BLOCK_COMMENT_CLOSE: &str = "#/";

/// Cursor over the source text.
#[derive(Debug)]
pub(crate) struct Scanner<'a> {
    src: &'a str,
    /// Byte offset of the next unconsumed character.
    pos: usize,
    location: Location,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            location: Location::START,
        }
    }

    #[inline]
    pub(crate) fn location(&self) -> Location {
        self.location
    }

    /// Unconsumed input.
    #[inline]
    pub(crate) fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    #[inline]
    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    #[inline]
    pub(crate) fn starts_with(&self, prefix: &str) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Consume one character.
    pub(crate) fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        self.location.advance(ch);
        Some(ch)
    }

    /// Consume `ch` if it is next.
    pub(crate) fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume `token` if the input starts with it.
    pub(crate) fn eat_str(&mut self, token: &str) -> bool {
        if self.starts_with(token) {
            self.advance_by(token.len());
            true
        } else {
            false
        }
    }

    /// Consume `len` bytes, which must end on a character boundary.
    pub(crate) fn advance_by(&mut self, len: usize) -> &'a str {
        let consumed = &self.src[self.pos..self.pos + len];
        self.location.advance_str(consumed);
        self.pos += len;
        consumed
    }

    /// Build a syntax error at the current location.
    #[inline]
    pub(crate) fn error(&self, code: SyntaxErrorCode) -> ParseError {
        ParseError::syntax(code, self.location)
    }

    /// Skip whitespace, `// line` comments and `/# block #/` comments.
    ///
    /// Stops at the first structural character or end of input. An unclosed
    /// block comment is reported at its opener.
    pub(crate) fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            let rest = self.rest();
            let Some(ch) = rest.chars().next() else {
                return Ok(());
            };

            if ch.is_whitespace() {
                self.bump();
                continue;
            }

            if rest.starts_with(LINE_COMMENT) {
                let len = match memchr::memchr(b'\n', rest.as_bytes()) {
                    Some(newline) => newline + 1,
                    None => rest.len(),
                };
                self.advance_by(len);
                continue;
            }

            if rest.starts_with(BLOCK_COMMENT_OPEN) {
                let body = &rest.as_bytes()[BLOCK_COMMENT_OPEN.len()..];
                match memmem::find(body, BLOCK_COMMENT_CLOSE.as_bytes()) {
                    Some(close) => {
                        self.advance_by(
                            BLOCK_COMMENT_OPEN.len() + close + BLOCK_COMMENT_CLOSE.len(),
                        );
                    }
                    None => return Err(self.error(SyntaxErrorCode::UnclosedComment)),
                }
                continue;
            }

            return Ok(());
        }
    }

    /// Consume the maximal run of ASCII digits (possibly empty).
    pub(crate) fn scan_digits(&mut self) -> &'a str {
        let len = self
            .rest()
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or_else(|| self.rest().len());
        self.advance_by(len)
    }

    /// Consume an identifier, or return `None` without consuming anything.
    pub(crate) fn scan_identifier(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, c)) if is_ident_start(c) => {}
            _ => return None,
        }
        let len = chars
            .find(|&(_, c)| !is_ident_continue(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        Some(self.advance_by(len))
    }
}

/// Identifiers are Unicode XID names that are also XML element names, so
/// every parsed key can be serialized.
#[inline]
pub(crate) fn is_ident_start(c: char) -> bool {
    (c == '_' || c.is_xid_start()) && is_name_start_char(c)
}

#[inline]
pub(crate) fn is_ident_continue(c: char) -> bool {
    (c == '_' || c.is_xid_continue()) && is_name_char(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped(input: &str) -> (&str, Location) {
        let mut s = Scanner::new(input);
        s.skip_trivia().unwrap();
        (s.rest(), s.location())
    }

    #[test]
    fn test_skip_whitespace() {
        assert_eq!(skipped("  \n\t x"), ("x", Location::new(2, 3)));
    }

    #[test]
    fn test_skip_line_comment() {
        assert_eq!(skipped("// hello\n(x"), ("(x", Location::new(2, 1)));
        assert_eq!(skipped("// no newline"), ("", Location::new(1, 14)));
    }

    #[test]
    fn test_skip_block_comment() {
        let (rest, loc) = skipped("/# one\ntwo #/ (");
        assert_eq!(rest, "(");
        assert_eq!(loc, Location::new(2, 8));
    }

    #[test]
    fn test_mixed_trivia() {
        let (rest, _) = skipped(" // a\n /# b #/ // c\n\n  define");
        assert_eq!(rest, "define");
    }

    #[test]
    fn test_unclosed_block_comment_reports_opener() {
        let mut s = Scanner::new("\n  /# never closed");
        let err = s.skip_trivia().unwrap_err();
        assert_eq!(err, ParseError::syntax(SyntaxErrorCode::UnclosedComment, Location::new(2, 3)));
    }

    #[test]
    fn test_close_marker_does_not_overlap_opener() {
        let mut s = Scanner::new("/#/ x");
        assert!(s.skip_trivia().is_err());
    }

    #[test]
    fn test_skip_is_idempotent() {
        let mut s = Scanner::new("  // c\n  (a");
        s.skip_trivia().unwrap();
        let (pos, loc) = (s.rest(), s.location());
        s.skip_trivia().unwrap();
        assert_eq!((s.rest(), s.location()), (pos, loc));
    }

    #[test]
    fn test_scan_digits() {
        let mut s = Scanner::new("8080;");
        assert_eq!(s.scan_digits(), "8080");
        assert_eq!(s.rest(), ";");
        assert_eq!(s.location(), Location::new(1, 5));
    }

    #[test]
    fn test_scan_identifier() {
        let mut s = Scanner::new("base_value2 5");
        assert_eq!(s.scan_identifier(), Some("base_value2"));
        assert_eq!(s.rest(), " 5");

        let mut s = Scanner::new("_x:");
        assert_eq!(s.scan_identifier(), Some("_x"));

        let mut s = Scanner::new("9abc");
        assert_eq!(s.scan_identifier(), None);
        assert_eq!(s.rest(), "9abc");
    }

    #[test]
    fn test_scan_unicode_identifier() {
        let mut s = Scanner::new("порт: 1");
        assert_eq!(s.scan_identifier(), Some("порт"));
        assert_eq!(s.location(), Location::new(1, 5));
    }

    #[test]
    fn test_identifier_must_be_xml_name() {
        let mut s = Scanner::new("a·b‿c\u{301}: 1");
        assert_eq!(s.scan_identifier(), Some("a·b‿c\u{301}"));

        // XID letters outside the XML name ranges
        let mut s = Scanner::new("ª: 1");
        assert_eq!(s.scan_identifier(), None);
        let mut s = Scanner::new("aµb: 1");
        assert_eq!(s.scan_identifier(), Some("a"));
    }

    #[test]
    fn test_eat() {
        let mut s = Scanner::new("q(x");
        assert!(!s.eat('('));
        assert!(s.eat_str("q("));
        assert_eq!(s.peek(), Some('x'));
        assert_eq!(s.bump(), Some('x'));
        assert_eq!(s.peek(), None);
        assert_eq!(s.bump(), None);
    }
}
