//! The tag-closing engine: end-tag matching, implicit and explicit
//! auto-closing, and nested-tag repair.
//!
//! The heuristics here are order-sensitive and deliberately mirror how
//! browsers recover from real-world markup: a new sibling-incompatible
//! tag closes its open ancestor, a stray end tag for a void element is a
//! recorded fault rather than a structure change, and mis-nested
//! list/table markup is repaired against a resetter table.

use quoll_dom::{DomError, NodeId, NodeKind, Options, ParseErrorKind};

use super::core::HtmlParser;

/// What closes a node: its own start tag (self-closing and synthetic
/// cases keep their span) or a located end position in the source.
#[derive(Debug, Clone, Copy)]
pub(crate) enum EndTag {
    /// The node is its own end; spans stay as scanned.
    Own,
    /// An end tag (or a synthetic zero-length close) at this span.
    Span {
        /// Byte offset where the end begins.
        start: usize,
        /// Byte length of the end tag markup; zero for synthetic closes.
        len: usize,
    },
}

impl HtmlParser {
    /// Resolve the node that just finished scanning against the stack of
    /// open elements.
    pub(crate) fn close_current_node(&mut self) -> Result<(), DomError> {
        let current = self.current;
        if self.doc.node(current).closed {
            // text and comments are closed from birth
            return Ok(());
        }
        let name = self.doc.node(current).name.clone();
        let flags = self.doc.options().flags.get(&name);
        let mut error = false;
        let prev = self.last_nodes.get(&name).copied();
        match prev {
            None => {
                if flags.closed {
                    // a stray end tag for a closed-by-definition element
                    // synthesizes an empty element instead of erroring
                    self.close_node(current, EndTag::Own, 0)?;
                    if let Some(parent) = self.last_parent {
                        self.place_synthetic_empty(parent, current, &name)?;
                    }
                } else if flags.can_overlap {
                    self.degrade_to_text(current)?;
                } else if flags.empty {
                    let excerpt = self.node_excerpt(current);
                    let (line, line_position, stream_position) = self.node_position(current);
                    self.add_error(
                        ParseErrorKind::EndTagNotRequired,
                        line,
                        line_position,
                        stream_position,
                        excerpt,
                        format!("End tag </{name}> is not required"),
                    );
                } else {
                    let excerpt = self.node_excerpt(current);
                    let (line, line_position, stream_position) = self.node_position(current);
                    self.add_error(
                        ParseErrorKind::TagNotOpened,
                        line,
                        line_position,
                        stream_position,
                        excerpt,
                        format!("Start tag <{name}> was not found"),
                    );
                    error = true;
                }
            }
            Some(prev) => {
                if self.doc.options().fix_nested_tags
                    && self.find_resetter_nodes(prev, Options::resetters(&name))
                {
                    let excerpt = self.node_excerpt(current);
                    let (line, line_position, stream_position) = self.node_position(current);
                    self.add_error(
                        ParseErrorKind::EndTagInvalidHere,
                        line,
                        line_position,
                        stream_position,
                        excerpt,
                        format!("End tag </{name}> invalid here"),
                    );
                    error = true;
                }
                if !error {
                    match self.doc.node(prev).prev_with_same_name {
                        Some(older) => {
                            let _ = self.last_nodes.insert(name.clone(), older);
                        }
                        None => {
                            let _ = self.last_nodes.remove(&name);
                        }
                    }
                    if prev == current {
                        self.close_node(prev, EndTag::Own, 0)?;
                    } else {
                        let (start, len) = {
                            let node = self.doc.node(current);
                            (node.outer_start, node.outer_len)
                        };
                        self.close_node(prev, EndTag::Span { start, len }, 0)?;
                    }
                }
            }
        }
        if !error
            && self.last_parent.is_some()
            && (!flags.closed || self.doc.node(current).start_tag)
        {
            self.update_last_parent_node();
        }
        // The end-tag node itself is spent; the end-of-input sweep must
        // not resolve it a second time.
        if !self.doc.node(current).start_tag {
            self.doc.node_mut(current).closed = true;
        }
        Ok(())
    }

    /// A stray `</br>`-style end tag becomes an empty element. If an
    /// earlier childless same-named sibling exists, the nodes scanned
    /// since it are grafted under that sibling instead; `br` never grafts.
    fn place_synthetic_empty(
        &mut self,
        parent: NodeId,
        current: NodeId,
        name: &str,
    ) -> Result<(), DomError> {
        let mut found: Option<NodeId> = None;
        let mut passed: Vec<NodeId> = Vec::new();
        if name != "br" {
            let mut cursor = self.doc.node(parent).children.last().copied();
            while let Some(id) = cursor {
                let node = self.doc.node(id);
                if node.name == name && node.children.is_empty() {
                    found = Some(id);
                    break;
                }
                cursor = node.prev_sibling;
                passed.push(id);
            }
        }
        if let Some(found) = found {
            while let Some(id) = passed.pop() {
                self.doc.detach(id);
                self.doc.append_raw(found, id);
            }
        } else {
            self.append_during_parse(parent, current)?;
        }
        Ok(())
    }

    /// Overlap-tolerant elements (form): a mismatched end tag degrades to
    /// a lowercased text node instead of forcing closures.
    fn degrade_to_text(&mut self, current: NodeId) -> Result<(), DomError> {
        let (start, len, line, line_position) = {
            let node = self.doc.node(current);
            (node.outer_start, node.outer_len, node.line, node.line_position)
        };
        let lowered = {
            let end = (start + len).min(self.text.len());
            let start = start.min(end);
            String::from_utf8_lossy(&self.text[start..end]).to_lowercase()
        };
        let text = self.doc.alloc(NodeKind::Text);
        {
            let node = self.doc.node_mut(text);
            node.outer_start = start;
            node.outer_len = len;
            node.inner_start = start;
            node.inner_len = len;
            node.stream_position = start;
            node.line = line;
            node.line_position = line_position;
            node.text = Some(lowered);
        }
        if let Some(parent) = self.last_parent {
            self.append_during_parse(parent, text)?;
        }
        // Serialization must read the lowered override, not the
        // original-cased source span.
        self.doc.set_changed(text);
        Ok(())
    }

    /// Close a node, force-closing any still-open children first so the
    /// subtree ends well-formed, then fix the span arithmetic.
    pub(crate) fn close_node(
        &mut self,
        id: NodeId,
        end: EndTag,
        level: usize,
    ) -> Result<(), DomError> {
        let max = self.doc.options().max_depth;
        if level > max {
            return Err(DomError::DepthExceeded { max });
        }
        if !self.doc.options().auto_close_on_end {
            let children = self.doc.node(id).children.clone();
            if !children.is_empty() {
                let close_at = match end {
                    EndTag::Own => {
                        let node = self.doc.node(id);
                        node.outer_start + node.outer_len
                    }
                    EndTag::Span { start, .. } => start,
                };
                for child in children {
                    if self.doc.node(child).closed {
                        continue;
                    }
                    self.close_node(
                        child,
                        EndTag::Span {
                            start: close_at,
                            len: 0,
                        },
                        level + 1,
                    )?;
                }
            }
        }
        if self.doc.node(id).closed {
            return Ok(());
        }
        self.doc.node_mut(id).closed = true;
        let outer_start = self.doc.node(id).outer_start;
        if self.doc.options().check_syntax {
            let _ = self.opened_nodes.remove(&outer_start);
        }
        let name = self.doc.node(id).name.clone();
        if self.last_nodes.get(&name) == Some(&id) {
            let _ = self.last_nodes.remove(&name);
            self.update_last_parent_node();
            if self.doc.node(id).start_tag && !name.is_empty() {
                self.update_last_node(id);
            }
        }
        if let EndTag::Span { start, len } = end {
            let node = self.doc.node_mut(id);
            node.inner_start = node.outer_start + node.outer_len;
            node.inner_len = start.saturating_sub(node.inner_start);
            node.outer_len = (start + len).saturating_sub(node.outer_start);
        }
        Ok(())
    }

    /// Walk the last-open-parent pointer up past closed ancestors,
    /// falling back to the root.
    pub(crate) fn update_last_parent_node(&mut self) {
        loop {
            match self.last_parent {
                Some(id) if self.doc.node(id).closed => {
                    self.last_parent = self.doc.node(id).parent;
                }
                _ => break,
            }
        }
        if self.last_parent.is_none() {
            self.last_parent = Some(NodeId::ROOT);
        }
    }

    /// After closing a node that was the name's last-open entry, restore
    /// the entry to the previous same-named start tag still open.
    fn update_last_node(&mut self, id: NodeId) {
        let (name, outer_start, outer_end, prev) = {
            let node = self.doc.node(id);
            (
                node.name.clone(),
                node.outer_start,
                node.outer_start + node.outer_len,
                node.prev_with_same_name,
            )
        };
        let new_last = if let Some(prev_id) = prev
            && self.doc.node(prev_id).start_tag
        {
            Some(prev_id)
        } else {
            let mut best: Option<(usize, NodeId)> = None;
            for (&key, &open) in &self.opened_nodes {
                if key >= outer_start && key <= outer_end {
                    continue;
                }
                let candidate = self.doc.node(open);
                if candidate.name == name
                    && candidate.start_tag
                    && best.is_none_or(|(best_key, _)| best_key < key)
                {
                    best = Some((key, open));
                }
            }
            best.map(|(_, open)| open)
        };
        if let Some(last) = new_last {
            let _ = self.last_nodes.insert(name, last);
        }
    }

    // ------------------------------------------------------------------
    // Implicit and explicit auto-closing
    // ------------------------------------------------------------------

    /// Run the auto-closing rules against the last open parent, repeating
    /// until no rule fires. Called while a new tag name is being scanned.
    pub(crate) fn close_parent_implicit_explicit_node(&mut self) -> Result<(), DomError> {
        loop {
            let Some(parent) = self.last_parent else {
                break;
            };
            if self.doc.node(parent).closed {
                break;
            }
            let mut fired = false;
            let mut force_explicit = false;
            if self.is_parent_implicit_end(parent) {
                if self.doc.options().output_as_xml || self.doc.options().disable_implicit_end {
                    force_explicit = true;
                } else {
                    self.close_parent_end(parent, true)?;
                    fired = true;
                }
            }
            if force_explicit || self.is_parent_explicit_end(parent) {
                if force_explicit {
                    // strict mode records what lenient mode would repair
                    let parent_name = self.doc.node(parent).name.clone();
                    let child = self.scanned_name();
                    let (line, line_position, stream_position) = self.node_position(parent);
                    let excerpt = self.node_excerpt(parent);
                    self.add_error(
                        ParseErrorKind::TagNotClosed,
                        line,
                        line_position,
                        stream_position,
                        excerpt,
                        format!("End tag </{parent_name}> was not found before <{child}> began"),
                    );
                }
                self.close_parent_end(parent, false)?;
                fired = true;
            }
            if !fired {
                break;
            }
        }
        Ok(())
    }

    fn is_parent_implicit_end(&self, parent: NodeId) -> bool {
        if !self.doc.node(self.current).start_tag {
            return false;
        }
        let node_name = self.scanned_name();
        match self.doc.node(parent).name.as_str() {
            "a" => node_name == "a",
            "dd" | "dt" => node_name == "dt" || node_name == "dd",
            "li" => node_name == "li",
            "p" => {
                if self.doc.options().behavior_tag_p {
                    matches!(
                        node_name.as_str(),
                        "address"
                            | "article"
                            | "aside"
                            | "blockquote"
                            | "dir"
                            | "div"
                            | "dl"
                            | "fieldset"
                            | "footer"
                            | "form"
                            | "h1"
                            | "h2"
                            | "h3"
                            | "h4"
                            | "h5"
                            | "h6"
                            | "header"
                            | "hr"
                            | "li"
                            | "menu"
                            | "nav"
                            | "ol"
                            | "p"
                            | "pre"
                            | "section"
                            | "table"
                            | "ul"
                    )
                } else {
                    node_name == "p"
                }
            }
            "option" => node_name == "option",
            _ => false,
        }
    }

    fn is_parent_explicit_end(&self, parent: NodeId) -> bool {
        if !self.doc.node(self.current).start_tag {
            return false;
        }
        let node_name = self.scanned_name();
        let node_name = node_name.as_str();
        match self.doc.node(parent).name.as_str() {
            "title" => node_name == "title",
            "p" => node_name == "div",
            "table" => node_name == "table",
            "tr" => node_name == "tr" || node_name == "tbody",
            "thead" | "tbody" => node_name == "tbody",
            "td" | "th" => matches!(node_name, "td" | "th" | "tr" | "tbody"),
            "h1" => matches!(node_name, "h2" | "h3" | "h4" | "h5"),
            "h2" => matches!(node_name, "h1" | "h3" | "h4" | "h5"),
            "h3" => matches!(node_name, "h1" | "h2" | "h4" | "h5"),
            "h4" => matches!(node_name, "h1" | "h2" | "h3" | "h5"),
            "h5" => matches!(node_name, "h1" | "h2" | "h3" | "h4"),
            _ => false,
        }
    }

    /// Close the last open parent with a synthetic zero-length end at the
    /// position where the triggering tag begins.
    fn close_parent_end(&mut self, parent: NodeId, implicit: bool) -> Result<(), DomError> {
        let trigger = self.doc.node(self.current).outer_start;
        if implicit {
            self.doc.node_mut(parent).implicit_end = true;
        }
        self.close_node(
            parent,
            EndTag::Span {
                start: trigger,
                len: 0,
            },
            0,
        )
    }

    // ------------------------------------------------------------------
    // Nested-tag repair
    // ------------------------------------------------------------------

    /// On a new start tag whose name has a resetter table entry: close the
    /// previous same-named open node, unless a resetter container opened
    /// in between (then the nesting is legitimate).
    pub(crate) fn fix_nested_tags(&mut self) -> Result<(), DomError> {
        if !self.doc.node(self.current).start_tag {
            return Ok(());
        }
        let name = self.doc.node(self.current).name.clone();
        let Some(resetters) = Options::resetters(&name) else {
            return Ok(());
        };
        let Some(prev) = self.last_nodes.get(&name).copied() else {
            return Ok(());
        };
        if self.doc.node(prev).closed {
            return Ok(());
        }
        if self.find_resetter_nodes(prev, Some(resetters)) {
            return Ok(());
        }
        let trigger = self.doc.node(self.current).outer_start;
        self.close_node(
            prev,
            EndTag::Span {
                start: trigger,
                len: 0,
            },
            0,
        )
    }

    fn find_resetter_node(&self, node: NodeId, name: &str) -> Option<NodeId> {
        let resetter = self.last_nodes.get(name).copied()?;
        if self.doc.node(resetter).closed {
            return None;
        }
        if self.doc.node(resetter).stream_position < self.doc.node(node).stream_position {
            return None;
        }
        Some(resetter)
    }

    /// Whether any resetter container for this name opened at or after
    /// the given node.
    pub(crate) fn find_resetter_nodes(
        &self,
        node: NodeId,
        names: Option<&'static [&'static str]>,
    ) -> bool {
        let Some(names) = names else {
            return false;
        };
        names
            .iter()
            .any(|name| self.find_resetter_node(node, name).is_some())
    }

    fn node_position(&self, id: NodeId) -> (usize, usize, usize) {
        let node = self.doc.node(id);
        (node.line, node.line_position, node.stream_position)
    }
}
