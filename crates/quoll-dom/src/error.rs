//! Error types for DOM operations and parse diagnostics.
//!
//! Malformed markup is never an `Err`: the parser recovers and records a
//! [`ParseError`] on the document instead. [`DomError`] is reserved for
//! operations that cannot proceed at all, such as blowing the configured
//! depth limit.

use strum_macros::Display;
use thiserror::Error;

/// Hard failure of a DOM operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// A traversal or serialization descended past the configured limit.
    #[error("maximum depth of {max} exceeded")]
    DepthExceeded {
        /// The limit that was hit.
        max: usize,
    },
    /// Parsing created more nested open nodes than the configured limit.
    #[error("document has more than {max} nested child nodes")]
    TooManyNestedNodes {
        /// The limit that was hit.
        max: usize,
    },
    /// The given node is not a child of the given parent.
    #[error("node is not a child of the given parent")]
    NotAChild,
    /// Attaching the node would make it its own ancestor.
    #[error("attaching the node would create a cycle")]
    CyclicStructure,
    /// The id index was queried while disabled in the options.
    #[error("the id attribute index is disabled in the document options")]
    IdIndexDisabled,
    /// Attributes were added to a node kind that cannot carry them.
    #[error("{kind} nodes do not support attributes")]
    AttributesNotAllowed {
        /// Name of the offending node kind.
        kind: &'static str,
    },
}

/// Classification of a recovered markup fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ParseErrorKind {
    /// A start tag was never closed before the document (or its parent) ended.
    TagNotClosed,
    /// An end tag appeared with no matching open start tag.
    TagNotOpened,
    /// An end tag appeared for an element that is closed by definition.
    EndTagNotRequired,
    /// An end tag appeared in a position where it cannot match its start tag.
    EndTagInvalidHere,
    /// The declared document encoding contradicts the encoding it was read with.
    CharsetMismatch,
}

/// A recovered markup fault, recorded on the document during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// 1-based line of the offending markup.
    pub line: usize,
    /// 1-based column on that line.
    pub line_position: usize,
    /// Byte offset into the source text.
    pub stream_position: usize,
    /// Excerpt of the offending markup, possibly truncated (see
    /// `Options::extract_error_source_text`).
    pub source_text: String,
    /// Human-readable description.
    pub reason: String,
}

impl ParseError {
    /// Create a new parse error record.
    #[must_use]
    pub fn new(
        kind: ParseErrorKind,
        line: usize,
        line_position: usize,
        stream_position: usize,
        source_text: String,
        reason: String,
    ) -> Self {
        ParseError {
            kind,
            line,
            line_position,
            stream_position,
            source_text,
            reason,
        }
    }
}
