//! The navigation contract the evaluator runs against.
//!
//! The evaluator never sees a concrete tree. Anything that can move a
//! cursor through parents, children, siblings, and attributes can be
//! queried, which keeps the query engine decoupled from the arena layout.

/// The node categories of the query data model.
///
/// Documents map to `Root`; attributes are a virtual, positionally
/// indexed pseudo-axis off their owning element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// The document itself.
    Root,
    /// A named element.
    Element,
    /// A run of character data.
    Text,
    /// A comment.
    Comment,
    /// An attribute of the element the cursor sits on.
    Attribute,
}

/// A movable position in a queryable tree.
///
/// Every `move_to_*` operation returns whether the move happened; a
/// refused move leaves the cursor where it was. Cloning a cursor clones
/// only the position, never the tree.
pub trait QueryCursor: Clone {
    /// Move to the parent node. From an attribute, moves back to the
    /// owning element.
    fn move_to_parent(&mut self) -> bool;

    /// Move to the first child of the current node.
    fn move_to_first_child(&mut self) -> bool;

    /// Move to the next sibling.
    fn move_to_next(&mut self) -> bool;

    /// Move to the previous sibling.
    fn move_to_previous(&mut self) -> bool;

    /// Move onto the current element's first attribute.
    fn move_to_first_attribute(&mut self) -> bool;

    /// Move from one attribute to the next on the same element.
    fn move_to_next_attribute(&mut self) -> bool;

    /// Jump to the element with the given id attribute value.
    fn move_to_id(&mut self, id: &str) -> bool;

    /// Move to the tree root.
    fn move_to_root(&mut self);

    /// The current node or attribute name, lowercased.
    fn name(&self) -> String;

    /// The current value: collected inner text for elements and the root,
    /// literal content for text and comments, the value for attributes.
    fn value(&self) -> String;

    /// What the cursor currently points at.
    fn node_kind(&self) -> CursorKind;

    /// Whether two cursors sit on the same position of the same tree.
    fn is_same_position(&self, other: &Self) -> bool;
}
