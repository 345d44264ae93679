//! Lenient HTML parsing for quoll documents.
//!
//! # Scope
//!
//! This crate implements:
//! - **Tokenizing parser**: a single-pass state machine over the raw
//!   source that builds the [`quoll_dom::Document`] arena directly,
//!   recording byte spans instead of copying strings
//!   - tag, attribute, comment, and embedded `<% %>` code states
//!   - raw-text elements (script, style, textarea, title)
//!   - implicit/explicit closing heuristics and nested-tag repair
//!   - declared-encoding scanning of `<meta>` tags
//! - **Entity codec**: named and numeric character reference decoding
//!   and encoding, tolerant of unterminated references
//!
//! Malformed markup never fails a load; the parser recovers and records
//! faults on the document (see [`quoll_dom::ParseError`]).

/// Character reference encoding and decoding.
pub mod entity;
/// The parser state machine and closing heuristics.
pub mod parser;

pub use parser::{HtmlParser, ParseState};

use quoll_dom::{Document, DomError, Options};

/// Parse markup into a document with default options.
///
/// # Errors
/// `DepthExceeded` or `TooManyNestedNodes` when the configured structural
/// limits are hit; ordinary malformed markup is recovered and recorded on
/// the document instead.
pub fn load_html(text: &str) -> Result<Document, DomError> {
    load_html_with_options(text, Options::new())
}

/// Parse markup into a document with the given options.
///
/// # Errors
/// `DepthExceeded` or `TooManyNestedNodes` when the configured structural
/// limits are hit; ordinary malformed markup is recovered and recorded on
/// the document instead.
pub fn load_html_with_options(text: &str, options: Options) -> Result<Document, DomError> {
    HtmlParser::new(text, options, false).parse()
}

/// Scan markup for a `<meta>` declared character set without building a
/// full tree; parsing stops at the first declaration found.
#[must_use]
pub fn detect_encoding(text: &str) -> Option<String> {
    let doc = HtmlParser::new(text, Options::new(), true).parse().ok()?;
    doc.declared_encoding().map(ToString::to_string)
}
