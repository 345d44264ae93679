//! The document: arena, source text, options, and all tree mutation.
//!
//! A [`Document`] owns every node it ever allocates. [`NodeId`]s index into
//! its arena and are meaningless anywhere else, so a node can never change
//! its owning document. Removed nodes stay allocated but detached; they are
//! unreachable from the root and die with the document.

use std::collections::HashMap;

use crate::attribute::{Attribute, QuoteStyle};
use crate::error::{DomError, ParseError};
use crate::iter::{Ancestors, Descendants};
use crate::node::{NodeData, NodeId, NodeKind};
use crate::options::Options;
use crate::serialize;

/// Hook used to entity-decode text and attribute values on read.
///
/// Installed by the HTML layer at load time; keeping it a plain function
/// slot keeps this crate free of a dependency on the codec.
pub type EntityDecoder = fn(&str) -> String;

/// An HTML document: immutable source text plus a mutable arena tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    text: String,
    options: Options,
    parse_errors: Vec<ParseError>,
    id_index: HashMap<String, NodeId>,
    declared_encoding: Option<String>,
    stream_encoding: Option<String>,
    remainder: Option<String>,
    remainder_offset: usize,
    entity_decoder: Option<EntityDecoder>,
}

impl Document {
    /// Create an empty document with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::new())
    }

    /// Create an empty document with the given options.
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Document {
            nodes: vec![NodeData::new(NodeKind::Document)],
            text: String::new(),
            options,
            parse_errors: Vec::new(),
            id_index: HashMap::new(),
            declared_encoding: None,
            stream_encoding: None,
            remainder: None,
            remainder_offset: 0,
            entity_decoder: None,
        }
    }

    /// The document options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Mutable access to the options (adjust before loading markup).
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// The backing source text the document was loaded from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.text
    }

    /// Reset the document and install new source text for a fresh load.
    ///
    /// Drops the previous tree, recorded faults, and id index. Used by the
    /// parser; after this only the root node exists.
    pub fn begin_load(&mut self, source: String) {
        self.nodes = vec![NodeData::new(NodeKind::Document)];
        self.nodes[0].inner_len = source.len();
        self.nodes[0].outer_len = source.len();
        self.text = source;
        self.parse_errors.clear();
        self.id_index.clear();
        self.declared_encoding = None;
        self.remainder = None;
        self.remainder_offset = 0;
    }

    /// Install the entity decoding hook used for text and attribute reads.
    pub fn set_entity_decoder(&mut self, decoder: EntityDecoder) {
        self.entity_decoder = Some(decoder);
    }

    /// The decoder applied to raw source runs, honoring
    /// `Options::preserve_raw_values`.
    #[must_use]
    pub fn decode_text(&self, raw: &str) -> String {
        if self.options.preserve_raw_values {
            return raw.to_string();
        }
        match self.entity_decoder {
            Some(decode) => decode(raw),
            None => raw.to_string(),
        }
    }

    /// The entity decoder hook, if installed and not suppressed by the
    /// options.
    #[must_use]
    pub fn active_decoder(&self) -> Option<EntityDecoder> {
        if self.options.preserve_raw_values {
            None
        } else {
            self.entity_decoder
        }
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    /// Get a node by id.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    /// Get a node by id, panicking on a stale id.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    /// Mutable access to a node's raw data.
    ///
    /// Low-level: callers are responsible for the tree invariants. Prefer
    /// the mutation methods on `Document`.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this document.
    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    /// Number of nodes ever allocated, including detached ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (never true: the root always exists).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new detached node of the given kind.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind));
        id
    }

    /// Create a detached element with the given tag name.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let id = self.alloc(NodeKind::Element);
        self.nodes[id.0].set_name(name);
        self.nodes[id.0].closed = true;
        self.nodes[id.0].changed = true;
        id
    }

    /// Create a detached text node with the given content.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Text);
        self.nodes[id.0].text = Some(text.to_string());
        self.nodes[id.0].changed = true;
        id
    }

    /// Create a detached comment node with the given content (the content
    /// includes the `<!--`/`-->` framing when serialized from markup).
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Comment);
        self.nodes[id.0].text = Some(text.to_string());
        self.nodes[id.0].changed = true;
        id
    }

    // ------------------------------------------------------------------
    // Tree reads
    // ------------------------------------------------------------------

    /// The parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// The children of a node, in document order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// The first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.first().copied())
    }

    /// The last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.last().copied())
    }

    /// The next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// The previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Whether `descendant` sits somewhere below `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, descendant: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parent(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Iterate over the ancestors of a node, from parent to root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors::new(self, id)
    }

    /// Iterate over all descendants of a node in document order.
    ///
    /// The walk is iterative and bounded by `Options::max_depth`; crossing
    /// the limit yields a `DomError::DepthExceeded` and ends the iteration.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants::new(self, id)
    }

    /// The first child element with the given tag name (case-insensitive).
    #[must_use]
    pub fn element(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.node(c).is_element() && self.node(c).name.eq_ignore_ascii_case(name))
    }

    /// All child elements with the given tag name (case-insensitive).
    #[must_use]
    pub fn elements(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.node(c).is_element() && self.node(c).name.eq_ignore_ascii_case(name))
            .collect()
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous position first.
    ///
    /// # Errors
    /// `CyclicStructure` if `child` is `parent` or one of its ancestors.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_cycle(parent, child)?;
        self.detach(child);
        let prev_last = self.nodes[parent.0].children.last().copied();
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        if let Some(prev) = prev_last {
            self.nodes[prev.0].next_sibling = Some(child);
            self.nodes[child.0].prev_sibling = Some(prev);
        }
        self.after_attach(parent, child);
        Ok(())
    }

    /// Insert `child` as the first child of `parent`.
    ///
    /// # Errors
    /// `CyclicStructure` if `child` is `parent` or one of its ancestors.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        match self.first_child(parent) {
            Some(first) => self.insert_before(parent, child, first),
            None => self.append_child(parent, child),
        }
    }

    /// Insert `child` under `parent` immediately before `reference`.
    ///
    /// # Errors
    /// `NotAChild` if `reference` is not a child of `parent`;
    /// `CyclicStructure` if the insertion would create a cycle.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        self.check_cycle(parent, child)?;
        let index = self.child_index(parent, reference)?;
        self.detach(child);
        // Re-resolve: detaching may have shifted the reference position.
        let index = self.child_index(parent, reference).unwrap_or(index);
        self.nodes[parent.0].children.insert(index, child);
        self.relink_siblings(parent, index);
        self.nodes[child.0].parent = Some(parent);
        self.after_attach(parent, child);
        Ok(())
    }

    /// Insert `child` under `parent` immediately after `reference`.
    ///
    /// # Errors
    /// `NotAChild` if `reference` is not a child of `parent`;
    /// `CyclicStructure` if the insertion would create a cycle.
    pub fn insert_after(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<(), DomError> {
        match self.next_sibling(reference) {
            Some(next) => self.insert_before(parent, child, next),
            None => self.append_child(parent, child),
        }
    }

    /// Remove `child` from `parent`.
    ///
    /// With `keep_grandchildren`, the removed node's children are grafted
    /// into its place instead of leaving with it.
    ///
    /// # Errors
    /// `NotAChild` if `child` is not a child of `parent`.
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        keep_grandchildren: bool,
    ) -> Result<(), DomError> {
        let index = self.child_index(parent, child)?;
        let grandchildren: Vec<NodeId> = if keep_grandchildren {
            self.nodes[child.0].children.clone()
        } else {
            Vec::new()
        };
        self.detach(child);
        for (offset, grandchild) in grandchildren.into_iter().enumerate() {
            self.detach(grandchild);
            self.nodes[parent.0].children.insert(index + offset, grandchild);
            self.nodes[grandchild.0].parent = Some(parent);
        }
        self.relink_all_siblings(parent);
        self.set_changed(parent);
        Ok(())
    }

    /// Remove every child of a node.
    pub fn remove_all_children(&mut self, id: NodeId) {
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.detach(child);
        }
        self.set_changed(id);
    }

    /// Replace `old` with `new` under `parent`, keeping the position.
    ///
    /// # Errors
    /// `NotAChild` if `old` is not a child of `parent`;
    /// `CyclicStructure` if the replacement would create a cycle.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> Result<(), DomError> {
        self.check_cycle(parent, new)?;
        let index = self.child_index(parent, old)?;
        self.detach(new);
        self.detach(old);
        self.nodes[parent.0].children.insert(index, new);
        self.nodes[new.0].parent = Some(parent);
        self.relink_all_siblings(parent);
        self.after_attach(parent, new);
        Ok(())
    }

    /// Clone a node into a fresh detached node with its own identity.
    ///
    /// A deep clone duplicates the whole subtree; a shallow one omits the
    /// children. Attributes and content come along either way.
    ///
    /// # Errors
    /// `DepthExceeded` if a deep clone descends past `Options::max_depth`.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> Result<NodeId, DomError> {
        self.clone_node_at_depth(id, deep, 0)
    }

    fn clone_node_at_depth(
        &mut self,
        id: NodeId,
        deep: bool,
        depth: usize,
    ) -> Result<NodeId, DomError> {
        if depth > self.options.max_depth {
            return Err(DomError::DepthExceeded {
                max: self.options.max_depth,
            });
        }
        let source = self.nodes[id.0].clone();
        let copy = self.alloc(source.kind);
        {
            let node = &mut self.nodes[copy.0];
            node.name = source.name.clone();
            node.original_name = source.original_name.clone();
            node.attributes = source.attributes.clone();
            node.outer_start = source.outer_start;
            node.outer_len = source.outer_len;
            node.inner_start = source.inner_start;
            node.inner_len = source.inner_len;
            node.closed = source.closed;
            node.start_tag = source.start_tag;
            node.implicit_end = source.implicit_end;
            node.hide_inner_text = source.hide_inner_text;
            node.text = source.text.clone();
            node.changed = true;
        }
        if deep {
            for child in source.children {
                let child_copy = self.clone_node_at_depth(child, true, depth + 1)?;
                self.append_raw(copy, child_copy);
            }
        }
        Ok(copy)
    }

    /// Rename a node.
    pub fn set_node_name(&mut self, id: NodeId, name: &str) {
        self.nodes[id.0].set_name(name);
        self.set_changed(id);
    }

    /// Override the content of a text or comment node.
    ///
    /// Once set, the override wins over the node's source span for good.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].text = Some(text.to_string());
        self.set_changed(id);
    }

    /// Mark a node (and every ancestor) as changed, invalidating the
    /// serialized-text caches along the way.
    pub fn set_changed(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &mut self.nodes[node_id.0];
            node.changed = true;
            node.inner_html_cache = None;
            node.outer_html_cache = None;
            current = node.parent;
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Read an attribute value (case-insensitive), materializing it lazily.
    #[must_use]
    pub fn attribute_value(&self, id: NodeId, name: &str) -> Option<String> {
        let node = self.get(id)?;
        let attr = node.attribute(name)?;
        attr.value(&self.text, self.active_decoder())
            .map(ToString::to_string)
    }

    /// Set an attribute value, appending the attribute if absent.
    ///
    /// # Errors
    /// `AttributesNotAllowed` for text and comment nodes.
    pub fn set_attribute_value(
        &mut self,
        id: NodeId,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        self.check_attributes_allowed(id)?;
        if name.eq_ignore_ascii_case("id") {
            self.reindex_id(id, Some(value));
        }
        let node = &mut self.nodes[id.0];
        if let Some(attr) = node.attribute_mut(name) {
            attr.set_value(value);
        } else {
            node.attributes.push(Attribute::new(name, value));
        }
        self.set_changed(id);
        Ok(())
    }

    /// Append a parsed or prebuilt attribute verbatim, allowing duplicates.
    ///
    /// # Errors
    /// `AttributesNotAllowed` for text and comment nodes.
    pub fn append_attribute(&mut self, id: NodeId, attribute: Attribute) -> Result<(), DomError> {
        self.check_attributes_allowed(id)?;
        self.nodes[id.0].attributes.push(attribute);
        self.set_changed(id);
        Ok(())
    }

    /// Remove every attribute with the given name (case-insensitive).
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if name.eq_ignore_ascii_case("id") {
            self.reindex_id(id, None);
        }
        self.nodes[id.0]
            .attributes
            .retain(|a| !a.name.eq_ignore_ascii_case(name));
        self.set_changed(id);
    }

    /// Remove the attribute at the given index, leaving duplicates alone.
    pub fn remove_attribute_at(&mut self, id: NodeId, index: usize) {
        if index < self.nodes[id.0].attributes.len() {
            let removed = self.nodes[id.0].attributes.remove(index);
            if removed.name.eq_ignore_ascii_case("id") {
                if let Some(value) = removed.value(&self.text, self.active_decoder()) {
                    let value = value.to_string();
                    self.unregister_id(&value, id);
                }
                // A surviving duplicate id attribute re-registers the node.
                if let Some(current) = self.id_of(id) {
                    self.register_id(&current, id);
                }
            }
            self.set_changed(id);
        }
    }

    fn check_attributes_allowed(&self, id: NodeId) -> Result<(), DomError> {
        match self.nodes[id.0].kind {
            NodeKind::Text => Err(DomError::AttributesNotAllowed { kind: "text" }),
            NodeKind::Comment => Err(DomError::AttributesNotAllowed { kind: "comment" }),
            NodeKind::Document | NodeKind::Element => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    /// The space-separated class names on an element.
    #[must_use]
    pub fn get_classes(&self, id: NodeId) -> Vec<String> {
        self.attribute_value(id, "class")
            .map(|v| {
                v.split_ascii_whitespace()
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the element carries the given class name.
    #[must_use]
    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.get_classes(id).iter().any(|c| c == class)
    }

    /// Add a class name if not already present.
    ///
    /// # Errors
    /// `AttributesNotAllowed` for text and comment nodes.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let mut classes = self.get_classes(id);
        if classes.iter().any(|c| c == class) {
            return Ok(());
        }
        classes.push(class.to_string());
        self.set_attribute_value(id, "class", &classes.join(" "))
    }

    /// Remove a class name; drops the class attribute when none remain.
    ///
    /// # Errors
    /// `AttributesNotAllowed` for text and comment nodes.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        let mut classes = self.get_classes(id);
        classes.retain(|c| c != class);
        if classes.is_empty() {
            self.remove_attribute(id, "class");
            Ok(())
        } else {
            self.set_attribute_value(id, "class", &classes.join(" "))
        }
    }

    // ------------------------------------------------------------------
    // Id index
    // ------------------------------------------------------------------

    /// The element's id attribute value, if any.
    #[must_use]
    pub fn id_of(&self, id: NodeId) -> Option<String> {
        self.attribute_value(id, "id")
    }

    /// Set the element's id attribute, updating the index.
    ///
    /// # Errors
    /// `AttributesNotAllowed` for text and comment nodes.
    pub fn set_id(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        self.set_attribute_value(id, "id", value)
    }

    /// Look up an element by its id attribute (case-insensitive, O(1)).
    ///
    /// # Errors
    /// `IdIndexDisabled` when `Options::use_id_attribute` is off.
    pub fn get_element_by_id(&self, id: &str) -> Result<Option<NodeId>, DomError> {
        if !self.options.use_id_attribute {
            return Err(DomError::IdIndexDisabled);
        }
        Ok(self.id_index.get(&id.to_ascii_lowercase()).copied())
    }

    /// Register a node under an id key. Used by the parser and the
    /// attribute mutators; last registration wins.
    pub fn register_id(&mut self, key: &str, id: NodeId) {
        if self.options.use_id_attribute && !key.is_empty() {
            let _ = self.id_index.insert(key.to_ascii_lowercase(), id);
        }
    }

    fn unregister_id(&mut self, key: &str, id: NodeId) {
        let lowered = key.to_ascii_lowercase();
        if self.id_index.get(&lowered) == Some(&id) {
            let _ = self.id_index.remove(&lowered);
        }
    }

    fn reindex_id(&mut self, id: NodeId, new_value: Option<&str>) {
        if let Some(old) = self.id_of(id) {
            self.unregister_id(&old, id);
        }
        if let Some(value) = new_value {
            self.register_id(value, id);
        }
    }

    // ------------------------------------------------------------------
    // Text and serialization
    // ------------------------------------------------------------------

    /// The raw source markup a node spans, without re-serialization.
    ///
    /// Empty for programmatically created nodes.
    #[must_use]
    pub fn source_span(&self, id: NodeId) -> &str {
        let node = self.node(id);
        &self.text[node.outer_start..node.outer_start + node.outer_len]
    }

    /// The content of a text or comment node.
    ///
    /// The explicit override wins when present; otherwise the source span
    /// is substringed out.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> &str {
        let node = self.node(id);
        match &node.text {
            Some(text) => text.as_str(),
            None => &self.text[node.outer_start..node.outer_start + node.outer_len],
        }
    }

    /// Collected descendant text, entity-decoded unless raw values are
    /// preserved. Comments and hidden raw-text runs are skipped.
    ///
    /// # Errors
    /// `DepthExceeded` when the walk crosses `Options::max_depth`.
    pub fn inner_text(&self, id: NodeId) -> Result<String, DomError> {
        let mut out = String::new();
        if self.node(id).kind == NodeKind::Text {
            out.push_str(&self.decode_text(self.node_text(id)));
            return Ok(out);
        }
        for step in self.descendants(id) {
            let child = step?;
            let node = self.node(child);
            if node.kind == NodeKind::Text && !node.hide_inner_text {
                out.push_str(&self.decode_text(self.node_text(child)));
            }
        }
        Ok(out)
    }

    /// The node's markup including its own tags, re-serializing (and
    /// caching) only when the node changed since parsing.
    ///
    /// # Errors
    /// `DepthExceeded` when serialization crosses `Options::max_depth`.
    pub fn outer_html(&mut self, id: NodeId) -> Result<String, DomError> {
        if !self.nodes[id.0].changed {
            return Ok(self.source_span(id).to_string());
        }
        if let Some(cached) = &self.nodes[id.0].outer_html_cache {
            return Ok(cached.clone());
        }
        let html = serialize::outer_html(self, id)?;
        self.nodes[id.0].outer_html_cache = Some(html.clone());
        Ok(html)
    }

    /// The markup between the node's tags, re-serializing (and caching)
    /// only when the node changed since parsing.
    ///
    /// # Errors
    /// `DepthExceeded` when serialization crosses `Options::max_depth`.
    pub fn inner_html(&mut self, id: NodeId) -> Result<String, DomError> {
        if !self.nodes[id.0].changed {
            let node = self.node(id);
            return Ok(self.text[node.inner_start..node.inner_start + node.inner_len].to_string());
        }
        if let Some(cached) = &self.nodes[id.0].inner_html_cache {
            return Ok(cached.clone());
        }
        let html = serialize::inner_html(self, id)?;
        self.nodes[id.0].inner_html_cache = Some(html.clone());
        Ok(html)
    }

    /// Replace a node's content by parsing nothing: removes all children.
    /// (Parsing replacement markup belongs to the HTML layer.)
    pub fn clear_inner(&mut self, id: NodeId) {
        self.remove_all_children(id);
    }

    /// Serialize the whole document, honoring `Options::output_as_xml`.
    ///
    /// # Errors
    /// `DepthExceeded` when the tree is deeper than the document allows.
    pub fn to_html(&self) -> Result<String, DomError> {
        serialize::write_document(self)
    }

    /// A positional locator path for the node, e.g. `/html[1]/body[1]/div[2]`.
    #[must_use]
    pub fn node_path(&self, id: NodeId) -> String {
        if id == NodeId::ROOT {
            return "/".to_string();
        }
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == NodeId::ROOT {
                break;
            }
            segments.push(self.path_segment(node_id));
            current = self.parent(node_id);
        }
        segments.reverse();
        let mut path = String::new();
        for segment in segments {
            path.push('/');
            path.push_str(&segment);
        }
        path
    }

    fn path_segment(&self, id: NodeId) -> String {
        let node = self.node(id);
        let label = match node.kind {
            NodeKind::Element => node.name.clone(),
            NodeKind::Text => "text()".to_string(),
            NodeKind::Comment => "comment()".to_string(),
            NodeKind::Document => "#document".to_string(),
        };
        let mut position = 1;
        if let Some(parent) = node.parent {
            for &sibling in self.children(parent) {
                if sibling == id {
                    break;
                }
                let other = self.node(sibling);
                if other.kind == node.kind && other.name == node.name {
                    position += 1;
                }
            }
        }
        format!("{label}[{position}]")
    }

    // ------------------------------------------------------------------
    // Parse bookkeeping
    // ------------------------------------------------------------------

    /// The faults recovered from during parsing, in source order.
    #[must_use]
    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    /// Record a recovered markup fault.
    pub fn push_parse_error(&mut self, error: ParseError) {
        self.parse_errors.push(error);
    }

    /// The character set declared by the document's `<meta>` tags, if any.
    #[must_use]
    pub fn declared_encoding(&self) -> Option<&str> {
        self.declared_encoding.as_deref()
    }

    /// Record the declared character set label.
    pub fn set_declared_encoding(&mut self, label: String) {
        self.declared_encoding = Some(label);
    }

    /// The character set label the source was read with, if the caller
    /// supplied one.
    #[must_use]
    pub fn stream_encoding(&self) -> Option<&str> {
        self.stream_encoding.as_deref()
    }

    /// Record the label the source was read with, for mismatch detection.
    pub fn set_stream_encoding(&mut self, label: String) {
        self.stream_encoding = Some(label);
    }

    /// The unparsed tail after the stopper node, if a stopper was set and
    /// reached.
    #[must_use]
    pub fn remainder(&self) -> Option<&str> {
        self.remainder.as_deref()
    }

    /// Byte offset of the remainder in the source text.
    #[must_use]
    pub fn remainder_offset(&self) -> usize {
        self.remainder_offset
    }

    /// Record the unparsed tail after the stopper node.
    pub fn set_remainder(&mut self, offset: usize) {
        self.remainder_offset = offset;
        self.remainder = Some(self.text[offset..].to_string());
    }

    // ------------------------------------------------------------------
    // Internal link maintenance
    // ------------------------------------------------------------------

    fn check_cycle(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if parent == child || self.is_descendant_of(parent, child) {
            return Err(DomError::CyclicStructure);
        }
        Ok(())
    }

    fn child_index(&self, parent: NodeId, child: NodeId) -> Result<usize, DomError> {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(DomError::NotAChild)
    }

    /// Detach a node from its parent, fixing the sibling links. No-op for
    /// already-detached nodes.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.0].parent else {
            return;
        };
        let prev = self.nodes[id.0].prev_sibling;
        let next = self.nodes[id.0].next_sibling;
        self.nodes[parent.0].children.retain(|&c| c != id);
        if let Some(p) = prev {
            self.nodes[p.0].next_sibling = next;
        }
        if let Some(n) = next {
            self.nodes[n.0].prev_sibling = prev;
        }
        let node = &mut self.nodes[id.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        if let Some(key) = self.id_of(id) {
            self.unregister_id(&key, id);
        }
    }

    /// Append without cycle checks or changed-flag propagation. Used where
    /// the caller has just allocated the child.
    pub fn append_raw(&mut self, parent: NodeId, child: NodeId) {
        let prev_last = self.nodes[parent.0].children.last().copied();
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        if let Some(prev) = prev_last {
            self.nodes[prev.0].next_sibling = Some(child);
            self.nodes[child.0].prev_sibling = Some(prev);
        }
    }

    fn after_attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(key) = self.id_of(child) {
            self.register_id(&key, child);
        }
        self.set_changed(child);
        self.set_changed(parent);
    }

    fn relink_siblings(&mut self, parent: NodeId, around: usize) {
        let children = self.nodes[parent.0].children.clone();
        let from = around.saturating_sub(1);
        for i in from..children.len().min(around + 2) {
            let id = children[i];
            self.nodes[id.0].prev_sibling = if i > 0 { Some(children[i - 1]) } else { None };
            self.nodes[id.0].next_sibling = children.get(i + 1).copied();
        }
    }

    fn relink_all_siblings(&mut self, parent: NodeId) {
        let children = self.nodes[parent.0].children.clone();
        for (i, &id) in children.iter().enumerate() {
            self.nodes[id.0].prev_sibling = if i > 0 { Some(children[i - 1]) } else { None };
            self.nodes[id.0].next_sibling = children.get(i + 1).copied();
        }
    }

    /// The quote style to write an attribute with, honoring the global
    /// override.
    #[must_use]
    pub fn effective_quote_style(&self, attribute: &Attribute) -> QuoteStyle {
        match self.options.global_quote_style {
            Some(QuoteStyle::AsParsed) | None => attribute.quote_style,
            Some(style) => style,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
