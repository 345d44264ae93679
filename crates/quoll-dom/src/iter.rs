//! Tree traversal iterators.
//!
//! The descendant walk is iterative with an explicit stack: documents are
//! adversarial input, and recursion depth must never be proportional to
//! markup nesting. The walk is additionally bounded by the document's
//! `max_depth` option and surfaces the overflow as an error item.

use crate::document::Document;
use crate::error::DomError;
use crate::node::NodeId;

/// Iterator over the ancestors of a node, from parent to root.
pub struct Ancestors<'a> {
    document: &'a Document,
    current: Option<NodeId>,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(document: &'a Document, id: NodeId) -> Self {
        Ancestors {
            document,
            current: document.parent(id),
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.document.parent(id);
        Some(id)
    }
}

/// Depth-guarded iterator over all descendants of a node in document order.
///
/// Yields `Err(DomError::DepthExceeded)` once and then ends if the walk
/// crosses the document's depth limit.
pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<(NodeId, usize)>,
    max_depth: usize,
    done: bool,
}

impl<'a> Descendants<'a> {
    pub(crate) fn new(document: &'a Document, id: NodeId) -> Self {
        let mut stack = Vec::new();
        for &child in document.children(id).iter().rev() {
            stack.push((child, 1));
        }
        Descendants {
            document,
            stack,
            max_depth: document.options().max_depth,
            done: false,
        }
    }
}

impl Iterator for Descendants<'_> {
    type Item = Result<NodeId, DomError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (id, depth) = self.stack.pop()?;
        if depth > self.max_depth {
            self.done = true;
            return Some(Err(DomError::DepthExceeded {
                max: self.max_depth,
            }));
        }
        for &child in self.document.children(id).iter().rev() {
            self.stack.push((child, depth + 1));
        }
        Some(Ok(id))
    }
}
