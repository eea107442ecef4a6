//! Error types for parsing and conversion.

use crate::span::Location;

/// Reasons a parse can fail on malformed structure.
///
/// Kept as a small `Copy` enum so the scanner can build errors without
/// allocating; `message` gives the human-readable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorCode {
    /// Input ended where a value was required
    UnexpectedEof,
    /// A value began with a character no value can start with
    UnexpectedChar(char),
    /// `/#` without a matching `#/`
    UnclosedComment,
    /// `q(` without a matching `)` at depth zero
    UnclosedString,
    /// `(` without a matching `)`
    UnclosedMapping,
    /// `$` without a closing `$`
    UnclosedExpression,
    /// Entry name missing or starting with an invalid character
    ExpectedIdentifier,
    /// Entry name not followed by `:`
    ExpectedColon,
    /// Entry value not followed by `;` or `)`
    ExpectedSemicolon,
    /// Top-level input that is neither `define` nor a mapping
    UnrecognizedConstruct(char),
    /// Character inside an expression that is no operand or operator
    UnknownOperator(char),
    /// `+` with nothing to add to
    MissingOperand,
    /// `$$`
    EmptyExpression,
    /// More than one operand left when the expression closed
    DanglingOperands,
    /// Integer literal does not fit in 64 bits
    IntegerOverflow,
    /// Mappings nested deeper than the configured limit
    NestingTooDeep,
}

impl SyntaxErrorCode {
    /// Get a human-readable message for this error code.
    pub fn message(self) -> String {
        match self {
            Self::UnexpectedEof => "unexpected end of input".into(),
            Self::UnexpectedChar(c) => format!("unexpected character '{}'", c),
            Self::UnclosedComment => "unclosed multi-line comment".into(),
            Self::UnclosedString => "unclosed string".into(),
            Self::UnclosedMapping => "unexpected end of input in mapping".into(),
            Self::UnclosedExpression => "expected $ at end of constant expression".into(),
            Self::ExpectedIdentifier => "expected identifier".into(),
            Self::ExpectedColon => "expected : after name".into(),
            Self::ExpectedSemicolon => "expected ; after value".into(),
            Self::UnrecognizedConstruct(c) => format!("unrecognized construct '{}'", c),
            Self::UnknownOperator(c) => format!("unknown operation '{}'", c),
            Self::MissingOperand => "operator + has no left operand".into(),
            Self::EmptyExpression => "empty constant expression".into(),
            Self::DanglingOperands => "constant expression leaves unused operands".into(),
            Self::IntegerOverflow => "integer literal too large".into(),
            Self::NestingTooDeep => "mappings nested too deeply".into(),
        }
    }
}

/// Reasons constant evaluation can fail on well-formed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstantErrorKind {
    /// Expression references a name no earlier `define` bound
    #[error("unknown constant: {0}")]
    Undefined(String),
    /// `+` applied to operands that cannot be added
    #[error("cannot add {left} and {right}")]
    TypeMismatch { left: &'static str, right: &'static str },
    /// Integer sum does not fit in 64 bits
    #[error("integer overflow in constant expression")]
    Overflow,
}

/// Error returned when parsing fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The input does not follow the grammar.
    #[error("{location}: {}", code.message())]
    Syntax {
        code: SyntaxErrorCode,
        location: Location,
    },

    /// The input is well-formed but an expression cannot be evaluated.
    #[error("{location}: {kind}")]
    Constant {
        kind: ConstantErrorKind,
        location: Location,
    },
}

impl ParseError {
    pub(crate) fn syntax(code: SyntaxErrorCode, location: Location) -> Self {
        ParseError::Syntax { code, location }
    }

    pub(crate) fn constant(kind: ConstantErrorKind, location: Location) -> Self {
        ParseError::Constant { kind, location }
    }

    /// Where the error was detected.
    pub fn location(&self) -> Location {
        match self {
            ParseError::Syntax { location, .. } | ParseError::Constant { location, .. } => {
                *location
            }
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, ParseError::Syntax { .. })
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, ParseError::Constant { .. })
    }
}

/// Error returned when a document cannot be written to or read from XML.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("XML conversion failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML conversion failed: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML conversion failed: invalid attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML conversion failed: output is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("XML conversion failed: invalid element name '{0}'")]
    InvalidName(String),

    #[error("XML conversion failed: {0}")]
    Malformed(String),
}

/// Any failure of the parse-then-convert pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display_has_position() {
        let err = ParseError::syntax(SyntaxErrorCode::ExpectedSemicolon, Location::new(4, 12));
        assert_eq!(err.to_string(), "line 4, column 12: expected ; after value");
        assert!(err.is_syntax());
        assert_eq!(err.location(), Location::new(4, 12));
    }

    #[test]
    fn test_constant_error_display_names_constant() {
        let err = ParseError::constant(
            ConstantErrorKind::Undefined("missing".into()),
            Location::new(1, 9),
        );
        assert_eq!(err.to_string(), "line 1, column 9: unknown constant: missing");
        assert!(err.is_constant());
    }

    #[test]
    fn test_constant_error_kind_messages() {
        let mismatch = ConstantErrorKind::TypeMismatch { left: "string", right: "integer" };
        assert_eq!(mismatch.to_string(), "cannot add string and integer");
        assert_eq!(
            ConstantErrorKind::Overflow.to_string(),
            "integer overflow in constant expression"
        );
    }

    #[test]
    fn test_char_codes_name_the_character() {
        assert_eq!(SyntaxErrorCode::UnexpectedChar('!').message(), "unexpected character '!'");
        assert_eq!(SyntaxErrorCode::UnknownOperator('*').message(), "unknown operation '*'");
    }
}
