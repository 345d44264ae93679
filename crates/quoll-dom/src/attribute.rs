//! Element attributes with lazily materialized values.
//!
//! An attribute parsed from markup stores only the byte span of its value
//! inside the document source. The string is substringed out (and
//! entity-decoded) the first time it is read, then cached. An attribute
//! whose value was set programmatically bypasses the span entirely.

use std::cell::OnceCell;

use crate::document::EntityDecoder;

/// How an attribute value was quoted in the source markup, and how it
/// should be quoted when written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteStyle {
    /// `name='value'`
    Single,
    /// `name="value"`
    #[default]
    Double,
    /// `name=value`
    Bare,
    /// `name` with no value at all.
    Valueless,
    /// Keep whatever quoting each attribute was parsed with. Only
    /// meaningful as a document-level override, never stored on a
    /// parsed attribute.
    AsParsed,
}

/// A single name/value pair on an element.
///
/// Attributes preserve source order and may repeat; name lookup is
/// case-insensitive and prefers the most recently appended match.
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Lowercased attribute name.
    pub name: String,
    /// The name exactly as it appeared in the source.
    pub original_name: String,
    /// Byte span of the raw value in the document source, if parsed.
    pub value_span: Option<(usize, usize)>,
    /// Programmatically assigned value; wins over the span once set.
    pub assigned_value: Option<String>,
    /// Quoting observed in the source (or requested for output).
    pub quote_style: QuoteStyle,
    /// 1-based line of the attribute name.
    pub line: usize,
    /// 1-based column of the attribute name on its line.
    pub line_position: usize,
    /// Byte offset of the attribute name in the source.
    pub stream_position: usize,
    /// Whether an `=` followed the name in the source.
    pub has_equal: bool,
    /// Whether this attribute came from parsing (as opposed to mutation).
    pub from_parse: bool,
    decoded: OnceCell<String>,
}

impl Attribute {
    /// Create an attribute with a programmatically assigned value.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Attribute {
            name: name.to_ascii_lowercase(),
            original_name: name.to_string(),
            value_span: None,
            assigned_value: Some(value.to_string()),
            quote_style: QuoteStyle::Double,
            line: 0,
            line_position: 0,
            stream_position: 0,
            has_equal: true,
            from_parse: false,
            decoded: OnceCell::new(),
        }
    }

    /// Create a valueless attribute (`<input disabled>` style).
    #[must_use]
    pub fn valueless(name: &str) -> Self {
        Attribute {
            name: name.to_ascii_lowercase(),
            original_name: name.to_string(),
            value_span: None,
            assigned_value: None,
            quote_style: QuoteStyle::Valueless,
            line: 0,
            line_position: 0,
            stream_position: 0,
            has_equal: false,
            from_parse: false,
            decoded: OnceCell::new(),
        }
    }

    /// Create an attribute backed by a span of the document source.
    ///
    /// Used by the parser; the value string is not materialized until the
    /// first read.
    #[must_use]
    pub fn from_source(
        name: &str,
        value_span: Option<(usize, usize)>,
        quote_style: QuoteStyle,
        has_equal: bool,
    ) -> Self {
        Attribute {
            name: name.to_ascii_lowercase(),
            original_name: name.to_string(),
            value_span,
            assigned_value: None,
            quote_style,
            line: 0,
            line_position: 0,
            stream_position: 0,
            has_equal,
            from_parse: true,
            decoded: OnceCell::new(),
        }
    }

    /// The attribute value, materializing and caching it on first read.
    ///
    /// Returns `None` for a valueless attribute, which is distinct from an
    /// empty value (`name=""` reads as `Some("")`).
    pub fn value<'a>(&'a self, source: &str, decoder: Option<EntityDecoder>) -> Option<&'a str> {
        if let Some(v) = &self.assigned_value {
            return Some(v.as_str());
        }
        let (start, len) = self.value_span?;
        let cached = self.decoded.get_or_init(|| {
            let raw = &source[start..start + len];
            decoder.map_or_else(|| raw.to_string(), |decode| decode(raw))
        });
        Some(cached.as_str())
    }

    /// Whether the value has already been materialized from its span.
    ///
    /// Always true for programmatically assigned values, always false for a
    /// valueless attribute.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.assigned_value.is_some() || self.decoded.get().is_some()
    }

    /// Replace the value, detaching the attribute from its source span.
    pub fn set_value(&mut self, value: &str) {
        self.assigned_value = Some(value.to_string());
        if self.quote_style == QuoteStyle::Valueless {
            self.quote_style = QuoteStyle::Double;
        }
        self.has_equal = true;
    }

    /// Record where in the source this attribute starts.
    pub fn set_position(&mut self, line: usize, line_position: usize, stream_position: usize) {
        self.line = line;
        self.line_position = line_position;
        self.stream_position = stream_position;
    }
}

/// Case-insensitive name match helper shared by the lookup paths.
#[must_use]
pub fn name_matches(attr: &Attribute, name: &str) -> bool {
    attr.name.eq_ignore_ascii_case(name)
}
