//! Node storage for the arena-based document tree.
//!
//! All relationships are [`NodeId`] indices into the owning
//! [`Document`](crate::Document)'s arena, providing O(1) access and
//! traversal without borrow checker issues. A `NodeId` has no meaning
//! outside the document that produced it, which is what pins every node to
//! a single owning document for its whole lifetime.

use strum_macros::Display;

use crate::attribute::{Attribute, name_matches};

/// A type-safe index into the document's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The document node is always at index 0.
    pub const ROOT: NodeId = NodeId(0);
}

/// The four node kinds of the lenient HTML model.
///
/// This is a closed set: exhaustive matches are expected to stay exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NodeKind {
    /// The document container at the tree root.
    Document,
    /// An element, named and possibly attributed.
    Element,
    /// A run of character data between tags.
    Text,
    /// A `<!-- -->` comment (also `<!doctype >` and other `<!` constructs).
    Comment,
}

impl NodeKind {
    /// The pseudo-name used for non-element kinds (`#document`, `#text`,
    /// `#comment`); elements use their tag name instead.
    #[must_use]
    pub fn pseudo_name(self) -> &'static str {
        match self {
            NodeKind::Document => "#document",
            NodeKind::Element => "",
            NodeKind::Text => "#text",
            NodeKind::Comment => "#comment",
        }
    }
}

/// A node in the arena, with its tree links and source bookkeeping.
///
/// Fields are public in the arena style: the parser and the
/// [`Document`](crate::Document) mutators maintain the invariants, and
/// read-only consumers go through the accessor methods.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is.
    pub kind: NodeKind,
    /// Lowercased node name (tag name for elements, pseudo-name otherwise).
    pub name: String,
    /// The name exactly as it appeared in the source.
    pub original_name: String,
    /// Parent node, `None` only for the root and detached nodes.
    pub parent: Option<NodeId>,
    /// Child nodes in document order.
    pub children: Vec<NodeId>,
    /// Next sibling under the same parent.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling under the same parent.
    pub prev_sibling: Option<NodeId>,
    /// Attributes in source order (elements only).
    pub attributes: Vec<Attribute>,

    /// Byte offset of the node's first character in the source.
    pub outer_start: usize,
    /// Byte length of the node's full markup in the source.
    pub outer_len: usize,
    /// Byte offset of the content between the tags.
    pub inner_start: usize,
    /// Byte length of the content between the tags.
    pub inner_len: usize,
    /// 1-based source line of the node start.
    pub line: usize,
    /// 1-based column on that line.
    pub line_position: usize,
    /// Byte offset of the node start in the source.
    pub stream_position: usize,

    /// Whether an explicit end tag was seen (or the tag self-closed).
    /// Text, comment, and document nodes are closed from birth.
    pub closed: bool,
    /// Whether the node began as a start tag rather than an end tag.
    pub start_tag: bool,
    /// Whether the node was closed by a heuristic rather than markup.
    pub implicit_end: bool,
    /// Exclude this node's text from inner-text collection (script/style).
    pub hide_inner_text: bool,
    /// Content override for text and comment nodes; once set it wins over
    /// the source span permanently.
    pub text: Option<String>,

    /// Set when the node or a descendant was mutated; serialized text is
    /// re-derived instead of substringed while this is set.
    pub changed: bool,
    /// Cached re-serialization of the content, valid until the next change.
    pub inner_html_cache: Option<String>,
    /// Cached re-serialization of the whole node, valid until the next change.
    pub outer_html_cache: Option<String>,

    /// Previous node with the same name, maintained during parsing for
    /// end-tag matching.
    pub prev_with_same_name: Option<NodeId>,
}

impl NodeData {
    /// Create a detached node of the given kind.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        let pseudo = kind.pseudo_name();
        NodeData {
            kind,
            name: pseudo.to_string(),
            original_name: pseudo.to_string(),
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
            attributes: Vec::new(),
            outer_start: 0,
            outer_len: 0,
            inner_start: 0,
            inner_len: 0,
            line: 0,
            line_position: 0,
            stream_position: 0,
            closed: kind != NodeKind::Element,
            start_tag: true,
            implicit_end: false,
            hide_inner_text: false,
            text: None,
            changed: false,
            inner_html_cache: None,
            outer_html_cache: None,
            prev_with_same_name: None,
        }
    }

    /// Whether this node is an element.
    #[must_use]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Set the node name, keeping the lowercased and original forms in sync.
    pub fn set_name(&mut self, name: &str) {
        self.original_name = name.to_string();
        self.name = name.to_ascii_lowercase();
    }

    /// Find an attribute by name (case-insensitive).
    ///
    /// When the name repeats, the most recently appended match wins.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().rev().find(|a| name_matches(a, name))
    }

    /// Mutable variant of [`NodeData::attribute`].
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes
            .iter_mut()
            .rev()
            .find(|a| name_matches(a, name))
    }

    /// Whether an attribute with the given name exists (case-insensitive).
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| name_matches(a, name))
    }
}
