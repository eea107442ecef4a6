//! Recursive-descent reader for qconf documents.
//!
//! # Grammar
//!
//! ```text
//! document   := ( define | mapping )*
//! define     := "define" identifier value
//! mapping    := "(" ( identifier ":" value ( ";" | &")" ) )* ")"
//! value      := integer | "q(" text ")" | mapping | "$" expression "$"
//! ```
//!
//! Whitespace, `// line` and `/# block #/` comments may appear between any
//! two tokens. The first top-level mapping is the document; later ones are
//! still checked for well-formedness but discarded.

use memchr::memchr2_iter;
use tracing::{debug, trace};

use crate::error::{ParseError, SyntaxErrorCode};
use crate::eval::Constants;
use crate::scanner::Scanner;
use crate::value::{Mapping, Value};

pub(crate) const MAPPING_OPEN: char = '(';
pub(crate) const MAPPING_CLOSE: char = ')';
pub(crate) const STRING_OPEN: &str = "q(";
pub(crate) const EXPR_DELIM: char = '$';
pub(crate) const DEFINE_KEYWORD: &str = "define";

const KEY_SEPARATOR: char = ':';
const ENTRY_TERMINATOR: char = ';';

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Deepest mapping nesting accepted before failing with
    /// [`SyntaxErrorCode::NestingTooDeep`].
    pub max_depth: usize,
}

impl ParseOptions {
    pub const DEFAULT_MAX_DEPTH: usize = 128;
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

/// A parse session over one source text.
///
/// Owns the cursor and the constant table; every nested reader borrows the
/// same session, so positions and constants follow one linear scan.
///
/// # Example
///
/// ```
/// use qconf_core::{Parser, Value};
///
/// let mut parser = Parser::new("define port 8080\n(p: $port 1 +$;)");
/// let doc = parser.parse().unwrap();
/// assert_eq!(doc.get("p"), Some(&Value::Integer(8081)));
/// assert_eq!(parser.constants().len(), 1);
/// ```
#[derive(Debug)]
pub struct Parser<'a> {
    src: &'a str,
    options: ParseOptions,
    pub(crate) scanner: Scanner<'a>,
    pub(crate) constants: Constants,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::with_options(src, ParseOptions::default())
    }

    pub fn with_options(src: &'a str, options: ParseOptions) -> Self {
        Self {
            src,
            options,
            scanner: Scanner::new(src),
            constants: Constants::new(),
            depth: 0,
        }
    }

    /// Constants defined by the most recent parse.
    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    /// Parse the whole source and return the document mapping.
    ///
    /// Resets all session state first, so calling this twice yields the same
    /// result. Returns an empty mapping when the source has no mapping.
    pub fn parse(&mut self) -> Result<Mapping, ParseError> {
        self.reset();
        debug!(len = self.src.len(), "parsing");

        let mut document: Option<Mapping> = None;
        loop {
            self.scanner.skip_trivia()?;
            let Some(ch) = self.scanner.peek() else {
                break;
            };

            if self.scanner.eat_str(DEFINE_KEYWORD) {
                self.read_define()?;
            } else if ch == MAPPING_OPEN {
                let at = self.scanner.location();
                let mapping = self.read_mapping()?;
                if document.is_none() {
                    trace!(line = at.line, keys = mapping.len(), "document mapping");
                    document = Some(mapping);
                } else {
                    debug!(line = at.line, "discarding additional top-level mapping");
                }
            } else {
                return Err(self.scanner.error(SyntaxErrorCode::UnrecognizedConstruct(ch)));
            }
        }

        let document = document.unwrap_or_default();
        debug!(
            keys = document.len(),
            constants = self.constants.len(),
            "parsed"
        );
        Ok(document)
    }

    fn reset(&mut self) {
        self.scanner = Scanner::new(self.src);
        self.constants.clear();
        self.depth = 0;
    }

    /// `define name value`, with the keyword already consumed.
    fn read_define(&mut self) -> Result<(), ParseError> {
        self.scanner.skip_trivia()?;
        let name = self
            .scanner
            .scan_identifier()
            .ok_or_else(|| self.scanner.error(SyntaxErrorCode::ExpectedIdentifier))?;
        let value = self.read_value()?;
        trace!(name, kind = value.type_name(), "define");
        self.constants.define(name, value);
        Ok(())
    }

    /// Skip trivia and read one value of any kind.
    pub(crate) fn read_value(&mut self) -> Result<Value, ParseError> {
        self.scanner.skip_trivia()?;
        match self.scanner.peek() {
            None => Err(self.scanner.error(SyntaxErrorCode::UnexpectedEof)),
            Some(c) if c.is_ascii_digit() => self.read_integer(),
            Some(_) if self.scanner.starts_with(STRING_OPEN) => {
                self.read_string().map(Value::String)
            }
            Some(MAPPING_OPEN) => self.read_mapping().map(Value::Mapping),
            Some(EXPR_DELIM) => self.read_expression(),
            Some(c) => Err(self.scanner.error(SyntaxErrorCode::UnexpectedChar(c))),
        }
    }

    /// Maximal run of digits as an `i64`.
    pub(crate) fn read_integer(&mut self) -> Result<Value, ParseError> {
        let at = self.scanner.location();
        self.scanner
            .scan_digits()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| ParseError::syntax(SyntaxErrorCode::IntegerOverflow, at))
    }

    /// `q( ... )` where parentheses in the body nest. No escapes.
    fn read_string(&mut self) -> Result<String, ParseError> {
        self.scanner.eat_str(STRING_OPEN);
        let body = self.scanner.rest();

        let mut depth = 1usize;
        let mut end = None;
        for i in memchr2_iter(b'(', b')', body.as_bytes()) {
            if body.as_bytes()[i] == b'(' {
                depth += 1;
            } else {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
        }

        match end {
            Some(end) => {
                let content = self.scanner.advance_by(end);
                self.scanner.bump();
                Ok(content.to_owned())
            }
            None => {
                self.scanner.advance_by(body.len());
                Err(self.scanner.error(SyntaxErrorCode::UnclosedString))
            }
        }
    }

    /// `( name: value; ... )`. The cursor must be on the opening delimiter.
    pub(crate) fn read_mapping(&mut self) -> Result<Mapping, ParseError> {
        if self.depth >= self.options.max_depth {
            return Err(self.scanner.error(SyntaxErrorCode::NestingTooDeep));
        }
        self.depth += 1;
        let mapping = self.read_entries();
        self.depth -= 1;
        mapping
    }

    fn read_entries(&mut self) -> Result<Mapping, ParseError> {
        self.scanner.bump();
        let mut mapping = Mapping::new();

        loop {
            self.scanner.skip_trivia()?;
            match self.scanner.peek() {
                None => return Err(self.scanner.error(SyntaxErrorCode::UnclosedMapping)),
                Some(MAPPING_CLOSE) => {
                    self.scanner.bump();
                    return Ok(mapping);
                }
                Some(_) => {}
            }

            let name = self
                .scanner
                .scan_identifier()
                .ok_or_else(|| self.scanner.error(SyntaxErrorCode::ExpectedIdentifier))?;

            self.scanner.skip_trivia()?;
            if !self.scanner.eat(KEY_SEPARATOR) {
                return Err(self.scanner.error(SyntaxErrorCode::ExpectedColon));
            }

            let value = self.read_value()?;
            mapping.insert(name, value);

            self.scanner.skip_trivia()?;
            match self.scanner.peek() {
                Some(ENTRY_TERMINATOR) => {
                    self.scanner.bump();
                }
                Some(MAPPING_CLOSE) => {}
                _ => return Err(self.scanner.error(SyntaxErrorCode::ExpectedSemicolon)),
            }
        }
    }
}
