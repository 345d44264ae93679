//! The cursor adapter over a [`quoll_dom::Document`].

use quoll_dom::{Document, NodeId, NodeKind};

use crate::cursor::{CursorKind, QueryCursor};

/// A [`QueryCursor`] over a parsed document.
///
/// Holds a node id plus an optional attribute index; cloning is a copy
/// of the position. Attribute values and element inner text are read
/// through the document's lazy materialization, so an unqueried subtree
/// costs nothing.
#[derive(Debug, Clone)]
pub struct DocumentCursor<'doc> {
    doc: &'doc Document,
    node: NodeId,
    attribute: Option<usize>,
}

impl<'doc> DocumentCursor<'doc> {
    /// A cursor positioned on the given node.
    #[must_use]
    pub fn new(doc: &'doc Document, node: NodeId) -> Self {
        DocumentCursor {
            doc,
            node,
            attribute: None,
        }
    }

    /// The node the cursor sits on (the owning element while on an
    /// attribute).
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The document being navigated.
    #[must_use]
    pub fn document(&self) -> &'doc Document {
        self.doc
    }
}

impl QueryCursor for DocumentCursor<'_> {
    fn move_to_parent(&mut self) -> bool {
        if self.attribute.is_some() {
            self.attribute = None;
            return true;
        }
        match self.doc.node(self.node).parent {
            Some(parent) => {
                self.node = parent;
                true
            }
            None => false,
        }
    }

    fn move_to_first_child(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        match self.doc.node(self.node).children.first() {
            Some(&child) => {
                self.node = child;
                true
            }
            None => false,
        }
    }

    fn move_to_next(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        match self.doc.node(self.node).next_sibling {
            Some(next) => {
                self.node = next;
                true
            }
            None => false,
        }
    }

    fn move_to_previous(&mut self) -> bool {
        if self.attribute.is_some() {
            return false;
        }
        match self.doc.node(self.node).prev_sibling {
            Some(prev) => {
                self.node = prev;
                true
            }
            None => false,
        }
    }

    fn move_to_first_attribute(&mut self) -> bool {
        if self.attribute.is_some() || self.doc.node(self.node).attributes.is_empty() {
            return false;
        }
        self.attribute = Some(0);
        true
    }

    fn move_to_next_attribute(&mut self) -> bool {
        match self.attribute {
            Some(index) if index + 1 < self.doc.node(self.node).attributes.len() => {
                self.attribute = Some(index + 1);
                true
            }
            _ => false,
        }
    }

    fn move_to_id(&mut self, id: &str) -> bool {
        match self.doc.get_element_by_id(id) {
            Ok(Some(node)) => {
                self.node = node;
                self.attribute = None;
                true
            }
            _ => false,
        }
    }

    fn move_to_root(&mut self) {
        self.node = NodeId::ROOT;
        self.attribute = None;
    }

    fn name(&self) -> String {
        match self.attribute {
            Some(index) => self.doc.node(self.node).attributes[index].name.clone(),
            None => self.doc.node(self.node).name.clone(),
        }
    }

    fn value(&self) -> String {
        match self.attribute {
            Some(index) => {
                let attribute = &self.doc.node(self.node).attributes[index];
                attribute
                    .value(self.doc.source(), self.doc.active_decoder())
                    .unwrap_or_default()
                    .to_string()
            }
            None => match self.doc.node(self.node).kind {
                NodeKind::Text => self.doc.decode_text(self.doc.node_text(self.node)),
                NodeKind::Comment => {
                    quoll_dom::serialize::strip_comment_framing(self.doc.node_text(self.node))
                }
                // a depth blowout reads as no text rather than failing
                // the whole query
                NodeKind::Document | NodeKind::Element => {
                    self.doc.inner_text(self.node).unwrap_or_default()
                }
            },
        }
    }

    fn node_kind(&self) -> CursorKind {
        if self.attribute.is_some() {
            return CursorKind::Attribute;
        }
        match self.doc.node(self.node).kind {
            NodeKind::Document => CursorKind::Root,
            NodeKind::Element => CursorKind::Element,
            NodeKind::Text => CursorKind::Text,
            NodeKind::Comment => CursorKind::Comment,
        }
    }

    fn is_same_position(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc)
            && self.node == other.node
            && self.attribute == other.attribute
    }
}
