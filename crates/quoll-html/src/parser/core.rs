//! The single-pass tokenizing parser.
//!
//! One scan over the source bytes drives a flat state machine; nodes and
//! attributes are recorded as byte spans into the source and attached to
//! the arena as they complete. There is no separate token stream: tag
//! boundaries feed the tree builder directly, and the closing engine in
//! [`closing`](super::closing) decides what each boundary does to the
//! stack of open elements.

use std::collections::HashMap;

use quoll_common::warning::warn_once;
use quoll_dom::{
    Attribute, Document, DomError, NodeId, NodeKind, Options, ParseError, ParseErrorKind,
    QuoteStyle, TagFlags,
};
use strum_macros::Display;

/// States of the tokenizing scan.
///
/// The machine is deliberately flat: every state inspects one byte and
/// either stays, switches, or re-enters the tag-open check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ParseState {
    /// Character data between tags.
    Text,
    /// Just after `<`, deciding what kind of construct follows.
    WhichTag,
    /// Scanning a tag name.
    Tag,
    /// Inside a tag, between attributes.
    BetweenAttributes,
    /// After a `/` inside a tag, expecting `>`.
    EmptyTag,
    /// Scanning an attribute name.
    AttributeName,
    /// After an attribute name, before a possible `=`.
    AttributeBeforeEquals,
    /// After `=`, before the value.
    AttributeAfterEquals,
    /// Scanning an unquoted attribute value.
    AttributeValue,
    /// Scanning a quoted attribute value.
    QuotedAttributeValue,
    /// Inside `<!` or `<?` markup, scanned as a comment.
    Comment,
    /// Inside `<% %>` embedded code.
    EmbeddedCode,
    /// Inside a raw-text element, scanning for its own end tag only.
    RawTextData,
}

/// An attribute being scanned, committed to the current node once its
/// extent is known. Names that are a lone quote character are discarded.
struct PendingAttribute {
    name_start: usize,
    name_len: Option<usize>,
    value_start: Option<usize>,
    value_len: Option<usize>,
    quote: u8,
    has_equal: bool,
    line: usize,
    line_position: usize,
    stream_position: usize,
}

/// The parser. Owns the document it is building; [`HtmlParser::parse`]
/// consumes the parser and yields the finished document.
pub struct HtmlParser {
    pub(crate) doc: Document,
    pub(crate) text: Box<[u8]>,
    pub(crate) index: usize,
    pub(crate) c: u8,
    pub(crate) line: usize,
    pub(crate) line_position: usize,
    max_line_position: usize,
    pub(crate) state: ParseState,
    old_state: ParseState,
    full_comment: bool,
    last_quote: u8,
    pub(crate) current: NodeId,
    pub(crate) name_start: usize,
    name_pending: bool,
    pending_attr: Option<PendingAttribute>,
    halted: bool,
    pub(crate) last_parent: Option<NodeId>,
    pub(crate) last_nodes: HashMap<String, NodeId>,
    pub(crate) opened_nodes: HashMap<usize, NodeId>,
    detect_only: bool,
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n')
}

impl HtmlParser {
    /// Set up a parser over the given source.
    ///
    /// `detect_only` makes [`HtmlParser::parse`] stop at the first
    /// declared-encoding hit instead of building the whole tree.
    #[must_use]
    pub fn new(text: &str, options: Options, detect_only: bool) -> Self {
        let mut doc = Document::with_options(options);
        if !doc.options().behavior_tag_p {
            doc.options_mut().flags.set("p", TagFlags::EMPTY_CLOSED);
        }
        doc.set_entity_decoder(crate::entity::decode);
        doc.begin_load(text.to_string());
        HtmlParser {
            doc,
            text: text.as_bytes().to_vec().into_boxed_slice(),
            index: 0,
            c: 0,
            line: 1,
            line_position: 0,
            max_line_position: 0,
            state: ParseState::Text,
            old_state: ParseState::Text,
            full_comment: false,
            last_quote: 0,
            current: NodeId::ROOT,
            name_start: 0,
            name_pending: false,
            pending_attr: None,
            halted: false,
            last_parent: Some(NodeId::ROOT),
            last_nodes: HashMap::new(),
            opened_nodes: HashMap::new(),
            detect_only,
        }
    }

    /// Record the character set the source bytes were decoded with, so a
    /// conflicting `<meta>` declaration is reported as a fault.
    #[must_use]
    pub fn with_stream_encoding(mut self, label: &str) -> Self {
        self.doc.set_stream_encoding(label.to_string());
        self
    }

    /// Run the scan to completion and return the document.
    ///
    /// # Errors
    /// `DepthExceeded` or `TooManyNestedNodes` when a structural limit is
    /// hit; recovered markup faults land on the document instead.
    pub fn parse(mut self) -> Result<Document, DomError> {
        self.push_node_start(NodeKind::Text, 0, self.line_position);
        while self.index < self.text.len() {
            self.c = self.text[self.index];
            self.increment_position();
            match self.state {
                ParseState::Text => {
                    if self.new_check()? {
                        continue;
                    }
                }
                ParseState::WhichTag => {
                    if self.new_check()? {
                        continue;
                    }
                    if self.c == b'/' {
                        self.push_node_name_start(false, self.index);
                    } else {
                        self.push_node_name_start(true, self.index - 1);
                        self.decrement_position();
                    }
                    self.state = ParseState::Tag;
                }
                ParseState::Tag => {
                    if self.new_check()? {
                        continue;
                    }
                    if is_whitespace(self.c) {
                        self.close_parent_implicit_explicit_node()?;
                        self.push_node_name_end(self.index - 1)?;
                        if self.state != ParseState::Tag {
                            continue;
                        }
                        self.state = ParseState::BetweenAttributes;
                        continue;
                    }
                    if self.c == b'/' {
                        self.close_parent_implicit_explicit_node()?;
                        self.push_node_name_end(self.index - 1)?;
                        if self.state != ParseState::Tag {
                            continue;
                        }
                        self.state = ParseState::EmptyTag;
                        continue;
                    }
                    if self.c == b'>' {
                        self.close_parent_implicit_explicit_node()?;
                        self.push_node_name_end(self.index - 1)?;
                        if self.state != ParseState::Tag {
                            continue;
                        }
                        if !self.push_node_end(self.index, false)? {
                            self.index = self.text.len();
                            continue;
                        }
                        if self.state != ParseState::Tag {
                            continue;
                        }
                        self.state = ParseState::Text;
                        self.push_node_start(NodeKind::Text, self.index, self.line_position);
                    }
                }
                ParseState::BetweenAttributes => {
                    if self.new_check()? {
                        continue;
                    }
                    if is_whitespace(self.c) {
                        continue;
                    }
                    if self.c == b'/' || self.c == b'?' {
                        self.state = ParseState::EmptyTag;
                        continue;
                    }
                    if self.c == b'>' {
                        if !self.push_node_end(self.index, false)? {
                            self.index = self.text.len();
                            continue;
                        }
                        if self.state != ParseState::BetweenAttributes {
                            continue;
                        }
                        self.state = ParseState::Text;
                        self.push_node_start(NodeKind::Text, self.index, self.line_position);
                        continue;
                    }
                    self.push_attribute_name_start(
                        self.index - 1,
                        self.line_position.saturating_sub(1),
                    );
                    self.state = ParseState::AttributeName;
                }
                ParseState::EmptyTag => {
                    if self.new_check()? {
                        continue;
                    }
                    if self.c == b'>' {
                        if !self.push_node_end(self.index, true)? {
                            self.index = self.text.len();
                            continue;
                        }
                        if self.state != ParseState::EmptyTag {
                            continue;
                        }
                        self.state = ParseState::Text;
                        self.push_node_start(NodeKind::Text, self.index, self.line_position);
                        continue;
                    }
                    // `<a/b>` style junk: back up and treat it as attributes
                    if is_whitespace(self.c) {
                        self.state = ParseState::BetweenAttributes;
                    } else {
                        self.decrement_position();
                        self.state = ParseState::BetweenAttributes;
                    }
                }
                ParseState::AttributeName => {
                    if self.new_check()? {
                        continue;
                    }
                    if self.c == b'/' {
                        self.push_attribute_name_end(self.index - 1);
                        self.state = ParseState::AttributeBeforeEquals;
                        continue;
                    }
                    if is_whitespace(self.c) {
                        self.push_attribute_name_end(self.index - 1);
                        self.state = ParseState::AttributeBeforeEquals;
                        continue;
                    }
                    if self.c == b'=' {
                        self.push_attribute_name_end(self.index - 1);
                        self.set_pending_has_equal();
                        self.state = ParseState::AttributeAfterEquals;
                        continue;
                    }
                    if self.c == b'>' {
                        self.push_attribute_name_end(self.index - 1);
                        if !self.push_node_end(self.index, false)? {
                            self.index = self.text.len();
                            continue;
                        }
                        if self.state != ParseState::AttributeName {
                            continue;
                        }
                        self.state = ParseState::Text;
                        self.push_node_start(NodeKind::Text, self.index, self.line_position);
                        continue;
                    }
                }
                ParseState::AttributeBeforeEquals => {
                    if self.new_check()? {
                        continue;
                    }
                    if is_whitespace(self.c) {
                        continue;
                    }
                    if self.c == b'>' {
                        if !self.push_node_end(self.index, false)? {
                            self.index = self.text.len();
                            continue;
                        }
                        if self.state != ParseState::AttributeBeforeEquals {
                            continue;
                        }
                        self.state = ParseState::Text;
                        self.push_node_start(NodeKind::Text, self.index, self.line_position);
                        continue;
                    }
                    if self.c == b'=' {
                        self.set_pending_has_equal();
                        self.state = ParseState::AttributeAfterEquals;
                        continue;
                    }
                    // valueless attribute followed by another name
                    self.state = ParseState::BetweenAttributes;
                    self.decrement_position();
                }
                ParseState::AttributeAfterEquals => {
                    if self.new_check()? {
                        continue;
                    }
                    if is_whitespace(self.c) {
                        continue;
                    }
                    if self.c == b'\'' || self.c == b'"' {
                        self.state = ParseState::QuotedAttributeValue;
                        self.push_attribute_value_start(self.index, self.c);
                        self.last_quote = self.c;
                        continue;
                    }
                    if self.c == b'>' {
                        if !self.push_node_end(self.index, false)? {
                            self.index = self.text.len();
                            continue;
                        }
                        if self.state != ParseState::AttributeAfterEquals {
                            continue;
                        }
                        self.state = ParseState::Text;
                        self.push_node_start(NodeKind::Text, self.index, self.line_position);
                        continue;
                    }
                    self.push_attribute_value_start(self.index - 1, 0);
                    self.state = ParseState::AttributeValue;
                }
                ParseState::AttributeValue => {
                    if self.new_check()? {
                        continue;
                    }
                    if is_whitespace(self.c) {
                        self.push_attribute_value_end(self.index - 1);
                        self.state = ParseState::BetweenAttributes;
                        continue;
                    }
                    if self.c == b'>' {
                        self.push_attribute_value_end(self.index - 1);
                        if !self.push_node_end(self.index, false)? {
                            self.index = self.text.len();
                            continue;
                        }
                        if self.state != ParseState::AttributeValue {
                            continue;
                        }
                        self.state = ParseState::Text;
                        self.push_node_start(NodeKind::Text, self.index, self.line_position);
                        continue;
                    }
                }
                ParseState::QuotedAttributeValue => {
                    if self.c == self.last_quote {
                        self.push_attribute_value_end(self.index - 1);
                        self.state = ParseState::BetweenAttributes;
                        continue;
                    }
                    if self.c == b'<'
                        && self.index < self.text.len()
                        && self.text[self.index] == b'%'
                    {
                        self.old_state = self.state;
                        self.state = ParseState::EmbeddedCode;
                        continue;
                    }
                }
                ParseState::Comment => {
                    if self.c == b'>' {
                        if self.full_comment && !self.comment_terminated() {
                            continue;
                        }
                        if !self.push_node_end(self.index, false)? {
                            self.index = self.text.len();
                            continue;
                        }
                        self.state = ParseState::Text;
                        self.push_node_start(NodeKind::Text, self.index, self.line_position);
                        continue;
                    }
                }
                ParseState::EmbeddedCode => {
                    if self.c == b'%' {
                        if self.index < self.text.len() && self.text[self.index] == b'>' {
                            match self.old_state {
                                ParseState::AttributeAfterEquals => {
                                    self.state = ParseState::AttributeValue;
                                }
                                ParseState::BetweenAttributes => {
                                    self.push_attribute_name_end(self.index + 1);
                                    self.state = ParseState::BetweenAttributes;
                                }
                                _ => self.state = self.old_state,
                            }
                            self.increment_position();
                        }
                    } else if self.old_state == ParseState::QuotedAttributeValue
                        && self.c == self.last_quote
                    {
                        // quote ends the attribute even inside embedded code
                        self.state = self.old_state;
                        self.decrement_position();
                    }
                }
                ParseState::RawTextData => self.scan_raw_text()?,
            }
        }
        // A halted scan (stopper reached, encoding detected) already
        // resolved its last node.
        if !self.halted {
            if self.name_pending && self.name_start > 0 {
                self.push_node_name_end(self.index)?;
            }
            let _ = self.push_node_end(self.index, false)?;
        }
        self.last_nodes.clear();
        self.finish()?;
        Ok(self.doc)
    }

    // ------------------------------------------------------------------
    // Position tracking
    // ------------------------------------------------------------------

    fn increment_position(&mut self) {
        self.index += 1;
        self.max_line_position = self.line_position;
        if self.c == b'\n' {
            self.line_position = 0;
            self.line += 1;
        } else {
            self.line_position += 1;
        }
    }

    fn decrement_position(&mut self) {
        self.index -= 1;
        if self.line_position == 0 {
            self.line_position = self.max_line_position;
            self.line = self.line.saturating_sub(1);
        } else {
            self.line_position -= 1;
        }
    }

    // ------------------------------------------------------------------
    // Tag-open check
    // ------------------------------------------------------------------

    fn is_valid_tag(&self) -> bool {
        self.c == b'<' && self.index < self.text.len() && {
            let next = self.text[self.index];
            next.is_ascii_alphabetic()
                || next == b'/'
                || next == b'?'
                || next == b'!'
                || next == b'%'
        }
    }

    /// Re-entry point shared by every state: a `<` that starts a plausible
    /// tag ends the current node and opens a new one, no matter what was
    /// being scanned.
    fn new_check(&mut self) -> Result<bool, DomError> {
        if self.c != b'<' || !self.is_valid_tag() {
            return Ok(false);
        }
        if self.index < self.text.len() && self.text[self.index] == b'%' {
            match self.state {
                ParseState::AttributeAfterEquals => {
                    self.push_attribute_value_start(self.index - 1, 0);
                }
                ParseState::BetweenAttributes => {
                    self.push_attribute_name_start(
                        self.index - 1,
                        self.line_position.saturating_sub(1),
                    );
                }
                ParseState::WhichTag => {
                    self.push_node_name_start(true, self.index - 1);
                    self.state = ParseState::Tag;
                }
                _ => {}
            }
            self.old_state = self.state;
            self.state = ParseState::EmbeddedCode;
            return Ok(true);
        }
        if !self.push_node_end(self.index - 1, true)? {
            self.index = self.text.len();
            return Ok(true);
        }
        self.state = ParseState::WhichTag;
        if self.index < self.text.len() && (self.text[self.index] == b'!' || self.text[self.index] == b'?') {
            self.push_node_start(
                NodeKind::Comment,
                self.index - 1,
                self.line_position.saturating_sub(1),
            );
            self.push_node_name_start(true, self.index);
            self.push_node_name_end(self.index + 1)?;
            self.state = ParseState::Comment;
            if self.index + 2 < self.text.len() {
                self.full_comment =
                    self.text[self.index + 1] == b'-' && self.text[self.index + 2] == b'-';
            }
            return Ok(true);
        }
        self.push_node_start(
            NodeKind::Element,
            self.index - 1,
            self.line_position.saturating_sub(1),
        );
        Ok(true)
    }

    /// Full comments (`<!-- -->`) only end at a `>` preceded by `--` or
    /// `--!`; a bare `>` inside them is content.
    fn comment_terminated(&self) -> bool {
        let at = |back: usize| self.index.checked_sub(back).map(|i| self.text[i]);
        let dashes = at(2) == Some(b'-') && at(3) == Some(b'-');
        let bang = at(2) == Some(b'!') && at(3) == Some(b'-') && at(4) == Some(b'-');
        dashes || bang
    }

    // ------------------------------------------------------------------
    // Node pushes
    // ------------------------------------------------------------------

    fn push_node_start(&mut self, kind: NodeKind, index: usize, line_position: usize) {
        let check_syntax = self.doc.options().check_syntax;
        let id = self.doc.alloc(kind);
        {
            let node = self.doc.node_mut(id);
            node.outer_start = index;
            node.line = self.line;
            node.line_position = line_position;
            node.stream_position = index;
        }
        if check_syntax && kind == NodeKind::Element {
            let _ = self.opened_nodes.insert(index, id);
        }
        self.current = id;
        self.name_start = 0;
        self.name_pending = false;
        self.pending_attr = None;
    }

    fn push_node_name_start(&mut self, start_tag: bool, index: usize) {
        self.doc.node_mut(self.current).start_tag = start_tag;
        self.name_start = index;
        self.name_pending = true;
    }

    fn push_node_name_end(&mut self, index: usize) -> Result<(), DomError> {
        let len = index.saturating_sub(self.name_start);
        self.name_pending = false;
        if self.doc.node(self.current).kind == NodeKind::Element {
            let raw = String::from_utf8_lossy(&self.text[self.name_start..self.name_start + len])
                .into_owned();
            self.doc.node_mut(self.current).set_name(&raw);
        }
        if self.doc.options().fix_nested_tags {
            self.fix_nested_tags()?;
        }
        Ok(())
    }

    /// The tag name scanned so far, before the name has been pushed. The
    /// closing heuristics run on this while the terminator byte is current.
    pub(crate) fn scanned_name(&self) -> String {
        let end = (self.index - 1).max(self.name_start);
        String::from_utf8_lossy(&self.text[self.name_start..end]).to_ascii_lowercase()
    }

    /// Seal the current node at `index` and decide what it does to the
    /// tree. Returns `Ok(false)` when parsing should stop (stopper node
    /// reached, or encoding detected in detect-only mode).
    fn push_node_end(&mut self, index: usize, mut close: bool) -> Result<bool, DomError> {
        self.commit_pending_attribute();
        let current = self.current;
        {
            let node = self.doc.node_mut(current);
            node.outer_len = index.saturating_sub(node.outer_start);
        }
        let kind = self.doc.node(current).kind;
        if kind == NodeKind::Text || kind == NodeKind::Comment {
            if self.doc.node(current).outer_len > 0 {
                {
                    let node = self.doc.node_mut(current);
                    node.inner_len = node.outer_len;
                    node.inner_start = node.outer_start;
                }
                if let Some(parent) = self.last_parent {
                    self.append_during_parse(parent, current)?;
                }
            }
        } else if self.doc.node(current).start_tag && self.last_parent != Some(current) {
            if let Some(parent) = self.last_parent {
                self.append_during_parse(parent, current)?;
            }
            if !self.read_document_encoding(current) {
                self.halted = true;
                return Ok(false);
            }
            let name = self.doc.node(current).name.clone();
            let prev = self.last_nodes.get(&name).copied();
            self.doc.node_mut(current).prev_with_same_name = prev;
            let _ = self.last_nodes.insert(name.clone(), current);
            if kind == NodeKind::Document || kind == NodeKind::Element {
                self.last_parent = Some(current);
            }
            if self.doc.options().flags.is_cdata(&name) {
                self.state = ParseState::RawTextData;
                return Ok(true);
            }
            if self.doc.options().flags.is_closed(&name) || self.doc.options().flags.is_empty(&name)
            {
                close = true;
            }
        }
        if close || !self.doc.node(current).start_tag {
            let name = self.doc.node(current).name.clone();
            let stopper_hit = self.doc.remainder().is_none()
                && self
                    .doc
                    .options()
                    .stopper_node_name
                    .as_deref()
                    .is_some_and(|stopper| stopper.eq_ignore_ascii_case(&name));
            if stopper_hit {
                self.doc.set_remainder(index);
                self.close_current_node()?;
                self.halted = true;
                return Ok(false);
            }
            self.close_current_node()?;
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Attribute pushes
    // ------------------------------------------------------------------

    fn push_attribute_name_start(&mut self, index: usize, line_position: usize) {
        self.commit_pending_attribute();
        self.pending_attr = Some(PendingAttribute {
            name_start: index,
            name_len: None,
            value_start: None,
            value_len: None,
            quote: 0,
            has_equal: false,
            line: self.line,
            line_position,
            stream_position: index,
        });
    }

    fn push_attribute_name_end(&mut self, index: usize) {
        if let Some(pending) = self.pending_attr.as_mut() {
            pending.name_len = Some(index.saturating_sub(pending.name_start));
        }
    }

    fn push_attribute_value_start(&mut self, index: usize, quote: u8) {
        if let Some(pending) = self.pending_attr.as_mut() {
            pending.value_start = Some(index);
            pending.quote = quote;
        }
    }

    fn push_attribute_value_end(&mut self, index: usize) {
        if let Some(pending) = self.pending_attr.as_mut()
            && let Some(start) = pending.value_start
        {
            pending.value_len = Some(index.saturating_sub(start));
        }
    }

    fn set_pending_has_equal(&mut self) {
        if let Some(pending) = self.pending_attr.as_mut() {
            pending.has_equal = true;
        }
    }

    fn commit_pending_attribute(&mut self) {
        let Some(pending) = self.pending_attr.take() else {
            return;
        };
        let Some(name_len) = pending.name_len else {
            return;
        };
        let raw =
            String::from_utf8_lossy(&self.text[pending.name_start..pending.name_start + name_len])
                .into_owned();
        // a stray quote scanned as a name is parser noise, not an attribute
        if raw == "\"" || raw == "'" {
            return;
        }
        let span = pending
            .value_start
            .map(|start| (start, pending.value_len.unwrap_or(0)));
        let style = match (span, pending.quote) {
            (None, _) => QuoteStyle::Valueless,
            (Some(_), b'\'') => QuoteStyle::Single,
            (Some(_), b'"') => QuoteStyle::Double,
            (Some(_), _) => QuoteStyle::Bare,
        };
        let mut attribute = Attribute::from_source(&raw, span, style, pending.has_equal);
        attribute.set_position(pending.line, pending.line_position, pending.stream_position);
        self.doc.node_mut(self.current).attributes.push(attribute);
    }

    // ------------------------------------------------------------------
    // Raw-text elements
    // ------------------------------------------------------------------

    /// Inside script/style/textarea/title: everything is text until the
    /// element's own end tag (case-insensitive, followed by `>` or space).
    fn scan_raw_text(&mut self) -> Result<(), DomError> {
        let name = self.doc.node(self.current).name.clone();
        let name_len = name.len();
        if name_len + 3 > self.text.len() - (self.index - 1) {
            return Ok(());
        }
        let p = self.index - 1;
        let start_matching = self.text[p] == b'<' && self.text[p + 1] == b'/';
        let matching = start_matching
            && self.text[p + 2..p + 2 + name_len].eq_ignore_ascii_case(name.as_bytes());
        if !matching {
            return Ok(());
        }
        let after = self.text[p + 2 + name_len];
        if after != b'>' && !is_whitespace(after) {
            return Ok(());
        }
        let (raw_start, node_line, node_line_position) = {
            let node = self.doc.node(self.current);
            (
                node.outer_start + node.outer_len,
                node.line,
                node.line_position,
            )
        };
        let hide = name == "script" || name == "style";
        let raw = self.doc.alloc(NodeKind::Text);
        {
            let node = self.doc.node_mut(raw);
            node.outer_start = raw_start;
            node.outer_len = p.saturating_sub(raw_start);
            node.inner_start = node.outer_start;
            node.inner_len = node.outer_len;
            node.stream_position = raw_start;
            node.line = node_line;
            node.line_position = node_line_position + name_len + 2;
            node.hide_inner_text = hide;
        }
        self.append_during_parse(self.current, raw)?;
        // hand the end tag back to the normal tag scanner
        self.push_node_start(
            NodeKind::Element,
            p,
            self.line_position.saturating_sub(1),
        );
        self.push_node_name_start(false, p + 2);
        self.state = ParseState::Tag;
        self.increment_position();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tree attachment and diagnostics
    // ------------------------------------------------------------------

    /// Attach without marking the tree changed, so unchanged nodes keep
    /// serializing straight from their source spans.
    pub(crate) fn append_during_parse(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<(), DomError> {
        let max = self.doc.options().max_nested_child_nodes;
        if max > 0 {
            let depth = self.doc.ancestors(parent).count() + 1;
            if depth > max {
                return Err(DomError::TooManyNestedNodes { max });
            }
        }
        self.doc.append_raw(parent, child);
        if let Some(id_value) = self.doc.id_of(child) {
            self.doc.register_id(&id_value, child);
        }
        Ok(())
    }

    pub(crate) fn add_error(
        &mut self,
        kind: ParseErrorKind,
        line: usize,
        line_position: usize,
        stream_position: usize,
        source_text: String,
        reason: String,
    ) {
        warn_once("HTML Parser", &reason);
        self.doc.push_parse_error(ParseError::new(
            kind,
            line,
            line_position,
            stream_position,
            source_text,
            reason,
        ));
    }

    /// The markup a node spans, clipped to the buffer.
    pub(crate) fn node_excerpt(&self, id: NodeId) -> String {
        let node = self.doc.node(id);
        let start = node.outer_start.min(self.text.len());
        let len = node.outer_len.min(self.text.len() - start);
        String::from_utf8_lossy(&self.text[start..start + len]).into_owned()
    }

    // ------------------------------------------------------------------
    // Encoding scan
    // ------------------------------------------------------------------

    /// Scan a just-completed `<meta>` for a declared character set.
    /// Returns false when detect-only mode should stop the parse.
    fn read_document_encoding(&mut self, id: NodeId) -> bool {
        if !self.doc.options().read_encoding {
            return true;
        }
        if self.doc.node(id).name != "meta" {
            return true;
        }
        let charset = if let Some(http_equiv) = self.doc.attribute_value(id, "http-equiv") {
            if !http_equiv.eq_ignore_ascii_case("content-type") {
                return true;
            }
            self.doc
                .attribute_value(id, "content")
                .and_then(|content| charset_from_content(&content))
        } else {
            self.doc.attribute_value(id, "charset")
        };
        let Some(mut label) = charset else {
            return true;
        };
        if label.is_empty() {
            return true;
        }
        if label.eq_ignore_ascii_case("utf8") {
            label = "utf-8".to_string();
        }
        self.doc.set_declared_encoding(label.clone());
        if self.detect_only {
            return false;
        }
        if let Some(stream) = self.doc.stream_encoding().map(ToString::to_string)
            && !stream.eq_ignore_ascii_case(&label)
        {
            let excerpt = self.node_excerpt(id);
            self.add_error(
                ParseErrorKind::CharsetMismatch,
                self.line,
                self.line_position,
                self.index,
                excerpt,
                format!(
                    "Encoding mismatch between stream encoding {stream} and declared encoding {label}"
                ),
            );
        }
        true
    }

    // ------------------------------------------------------------------
    // End of input
    // ------------------------------------------------------------------

    /// Record every start tag left open, then force the tree closed so it
    /// is well-formed down from the root.
    fn finish(&mut self) -> Result<(), DomError> {
        if !self.doc.options().check_syntax {
            return Ok(());
        }
        let mut open: Vec<(usize, NodeId)> =
            self.opened_nodes.iter().map(|(&k, &v)| (k, v)).collect();
        open.sort_unstable_by_key(|&(position, _)| position);
        let extract = self.doc.options().extract_error_source_text;
        let max_len = self.doc.options().extract_error_source_text_max_length;
        for &(_, id) in &open {
            if !self.doc.node(id).start_tag {
                continue;
            }
            let name = self.doc.node(id).name.clone();
            let excerpt = if extract {
                let mut html = self.node_excerpt(id);
                html.truncate(max_len);
                html
            } else {
                String::new()
            };
            let (line, line_position, stream_position) = {
                let node = self.doc.node(id);
                (node.line, node.line_position, node.stream_position)
            };
            self.add_error(
                ParseErrorKind::TagNotClosed,
                line,
                line_position,
                stream_position,
                excerpt,
                format!("End tag </{name}> was not found"),
            );
        }
        let end = self.text.len();
        for (_, id) in open.into_iter().rev() {
            if self.doc.node(id).closed {
                continue;
            }
            self.close_node(id, super::closing::EndTag::Span { start: end, len: 0 }, 0)?;
            self.doc.node_mut(id).implicit_end = true;
        }
        self.opened_nodes.clear();
        Ok(())
    }
}

/// Pull a `charset=` pair out of a content-type value such as
/// `text/html; charset=utf-8`.
fn charset_from_content(content: &str) -> Option<String> {
    for part in content.split(';') {
        let part = part.trim();
        if part.len() < 7 || !part.as_bytes()[..7].eq_ignore_ascii_case(b"charset") {
            continue;
        }
        let Some(rest) = part.get(7..) else { continue };
        if let Some(value) = rest.trim_start().strip_prefix('=') {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}
