//! qconf core
//!
//! Parser for the qconf configuration language and its XML serializer.
//!
//! ```text
//! // constants are defined before the document
//! define port 8080
//! /# block comments
//!    span lines #/
//! (
//!     server: (
//!         host: q(localhost);
//!         port: $port 1 +$;
//!     );
//! )
//! ```
//!
//! # Architecture
//!
//! - **span.rs** - Line/column locations
//! - **scanner.rs** - Character cursor, comment and whitespace skipping
//! - **parser.rs** - Recursive-descent reader and document driver
//! - **eval.rs** - Constant table and `$...$` expression evaluation
//! - **value.rs** - Value and Mapping types
//! - **xml.rs** - XML serializer and reader
//! - **error.rs** - Error types

pub mod error;
pub mod eval;
pub mod parser;
mod scanner;
pub mod span;
pub mod value;
pub mod xml;

pub use error::{ConstantErrorKind, ConversionError, Error, ParseError, SyntaxErrorCode};
pub use eval::Constants;
pub use parser::{ParseOptions, Parser};
pub use span::Location;
pub use value::{Mapping, Value};
pub use xml::{from_xml, to_xml, XmlOptions};

/// Parse `src` with default options and return the document mapping.
///
/// ```
/// use qconf_core::Value;
///
/// let doc = qconf_core::parse("(outer: (inner: 42;);)").unwrap();
/// let outer = doc.get("outer").and_then(Value::as_mapping).unwrap();
/// assert_eq!(outer.get("inner"), Some(&Value::Integer(42)));
/// ```
pub fn parse(src: &str) -> Result<Mapping, ParseError> {
    Parser::new(src).parse()
}

/// Parse `src` and render it as XML.
pub fn convert(
    src: &str,
    parse_options: ParseOptions,
    xml_options: &XmlOptions,
) -> Result<String, Error> {
    let doc = Parser::with_options(src, parse_options).parse()?;
    Ok(to_xml(&doc, xml_options)?)
}
