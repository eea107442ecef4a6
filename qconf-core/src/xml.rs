//! XML serialization of parsed documents.
//!
//! Each mapping key becomes an element. Scalars carry a `type` attribute
//! (`number`, `string`, or `boolean` for strings that read as a boolean);
//! nested mappings become elements with children and no attribute.
//!
//! ```text
//! (server: (host: q(localhost); port: 8080;);)
//! ```
//!
//! becomes
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8"?>
//! <config>
//!   <server>
//!     <host type="string">localhost</host>
//!     <port type="number">8080</port>
//!   </server>
//! </config>
//! ```

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::error::ConversionError;
use crate::value::{Mapping, Value};

const TYPE_ATTR: &str = "type";
const TYPE_NUMBER: &str = "number";
const TYPE_STRING: &str = "string";
const TYPE_BOOLEAN: &str = "boolean";

/// Serializer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    /// Name of the element wrapping the whole document.
    pub root_name: String,
    /// Spaces per nesting level; 0 writes everything on one line.
    pub indent: usize,
    /// Emit `<?xml version="1.0" encoding="utf-8"?>` first.
    pub declaration: bool,
    /// Tag strings reading `true`/`false` (any ASCII case) as booleans.
    pub detect_booleans: bool,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            root_name: "config".to_owned(),
            indent: 2,
            declaration: true,
            detect_booleans: true,
        }
    }
}

/// Render `doc` as an XML document.
pub fn to_xml(doc: &Mapping, options: &XmlOptions) -> Result<String, ConversionError> {
    check_name(&options.root_name)?;

    let mut writer = if options.indent > 0 {
        Writer::new_with_indent(Vec::new(), b' ', options.indent)
    } else {
        Writer::new(Vec::new())
    };

    if options.declaration {
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    }
    write_mapping(&mut writer, &options.root_name, doc, options)?;

    let mut xml = String::from_utf8(writer.into_inner())?;
    xml.push('\n');
    debug!(bytes = xml.len(), root = %options.root_name, "serialized document");
    Ok(xml)
}

fn write_mapping<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    mapping: &Mapping,
    options: &XmlOptions,
) -> Result<(), ConversionError> {
    if mapping.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(name)))?;
        return Ok(());
    }

    writer.write_event(Event::Start(BytesStart::new(name)))?;
    for (key, value) in mapping.iter() {
        check_name(key)?;
        match value {
            Value::Mapping(inner) => write_mapping(writer, key, inner, options)?,
            Value::Integer(i) => write_scalar(writer, key, TYPE_NUMBER, &i.to_string())?,
            Value::String(s) => {
                let (type_tag, text) = match boolean_text(s) {
                    Some(b) if options.detect_booleans => (TYPE_BOOLEAN, b),
                    _ => (TYPE_STRING, s.as_str()),
                };
                write_scalar(writer, key, type_tag, text)?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_scalar<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    type_tag: &str,
    text: &str,
) -> Result<(), ConversionError> {
    let mut start = BytesStart::new(name);
    start.push_attribute((TYPE_ATTR, type_tag));

    if text.is_empty() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(BytesText::new(text)))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    }
    Ok(())
}

fn boolean_text(s: &str) -> Option<&'static str> {
    if s.eq_ignore_ascii_case("true") {
        Some("true")
    } else if s.eq_ignore_ascii_case("false") {
        Some("false")
    } else {
        None
    }
}

/// Reject names that cannot be XML element names.
///
/// Follows the XML 1.0 `Name` production without `:`, which is reserved for
/// namespaces.
fn check_name(name: &str) -> Result<(), ConversionError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => is_name_start_char(first) && chars.all(is_name_char),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ConversionError::InvalidName(name.to_owned()))
    }
}

/// XML 1.0 `NameStartChar`, minus `:`.
pub(crate) fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// XML 1.0 `NameChar`, minus `:`.
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

// ============================================================================
// Reading back
// ============================================================================

/// An element being read, before its end tag.
#[derive(Debug)]
struct OpenElement {
    name: String,
    type_tag: Option<String>,
    children: Mapping,
    has_children: bool,
    text: String,
}

impl OpenElement {
    fn open(start: &BytesStart<'_>) -> Result<Self, ConversionError> {
        let name = String::from_utf8(start.name().as_ref().to_vec())?;
        let type_tag = match start.try_get_attribute(TYPE_ATTR)? {
            Some(attr) => Some(String::from_utf8(attr.value.into_owned())?),
            None => None,
        };
        Ok(Self {
            name,
            type_tag,
            children: Mapping::new(),
            has_children: false,
            text: String::new(),
        })
    }

    fn into_value(self) -> Result<(String, Value), ConversionError> {
        let value = match self.type_tag.as_deref() {
            Some(TYPE_NUMBER) => {
                let n = self.text.trim().parse::<i64>().map_err(|_| {
                    ConversionError::Malformed(format!(
                        "element '{}' is not a number: {:?}",
                        self.name, self.text
                    ))
                })?;
                Value::Integer(n)
            }
            Some(_) => Value::String(self.text),
            None if self.has_children || self.text.trim().is_empty() => {
                Value::Mapping(self.children)
            }
            None => Value::String(self.text),
        };
        Ok((self.name, value))
    }
}

/// Read XML produced by [`to_xml`] back into a mapping.
///
/// `type="number"` elements become integers, elements with child elements
/// (or nothing at all) become mappings, and everything else is a string.
/// Booleans come back as their lower-case string form.
pub fn from_xml(xml: &str) -> Result<Mapping, ConversionError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<Mapping> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(OpenElement::open(&start)?),
            Event::Empty(start) => {
                let element = OpenElement::open(&start)?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    ConversionError::Malformed("unbalanced end tag".to_owned())
                })?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8(data.into_inner().into_owned())?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ConversionError::Malformed(format!(
            "element '{}' is never closed",
            open.name
        )));
    }
    root.ok_or_else(|| ConversionError::Malformed("missing root element".to_owned()))
}

fn close_element(
    element: OpenElement,
    stack: &mut [OpenElement],
    root: &mut Option<Mapping>,
) -> Result<(), ConversionError> {
    let (name, value) = element.into_value()?;
    match stack.last_mut() {
        Some(parent) => {
            parent.has_children = true;
            parent.children.insert(name, value);
        }
        None => match value {
            Value::Mapping(mapping) if root.is_none() => *root = Some(mapping),
            Value::Mapping(_) => {
                return Err(ConversionError::Malformed("more than one root element".to_owned()))
            }
            _ => {
                return Err(ConversionError::Malformed(format!(
                    "root element '{}' is not a mapping",
                    name
                )))
            }
        },
    }
    Ok(())
}
