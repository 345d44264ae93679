//! Per-document parsing and serialization options.
//!
//! Everything here is a plain value carried by the document, including the
//! tag flag table. Two documents parsed concurrently can therefore use
//! different flag tables without seeing each other's changes.

use std::collections::HashMap;

/// Behavior flags attached to a tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagFlags {
    /// The element's content is raw text, scanned only for its own end tag
    /// (script, style, textarea, title).
    pub cdata: bool,
    /// The element never has content; its start tag is the whole node
    /// (the void elements: br, img, meta, ...).
    pub empty: bool,
    /// The element counts as closed even without an end tag; a stray end
    /// tag for it synthesizes an empty element instead of erroring.
    pub closed: bool,
    /// Mis-nested markup for this element degrades to text rather than
    /// forcing closures (form).
    pub can_overlap: bool,
}

impl TagFlags {
    /// Raw-text content flag only.
    pub const CDATA: TagFlags = TagFlags {
        cdata: true,
        empty: false,
        closed: false,
        can_overlap: false,
    };
    /// Void element flag only.
    pub const EMPTY: TagFlags = TagFlags {
        cdata: false,
        empty: true,
        closed: false,
        can_overlap: false,
    };
    /// Void and closed-by-definition (br).
    pub const EMPTY_CLOSED: TagFlags = TagFlags {
        cdata: false,
        empty: true,
        closed: true,
        can_overlap: false,
    };
    /// Overlap-tolerant flag only (form).
    pub const CAN_OVERLAP: TagFlags = TagFlags {
        cdata: false,
        empty: false,
        closed: false,
        can_overlap: true,
    };
}

/// Tag name to [`TagFlags`] table, consulted by the parser and serializer.
///
/// Each document owns its own copy; mutate it through the document options
/// before loading markup.
#[derive(Debug, Clone)]
pub struct TagFlagTable {
    map: HashMap<String, TagFlags>,
}

impl TagFlagTable {
    /// The classic default table.
    #[must_use]
    pub fn new() -> Self {
        let mut map = HashMap::new();
        for name in ["script", "style", "noxhtml", "textarea", "title"] {
            let _ = map.insert(name.to_string(), TagFlags::CDATA);
        }
        for name in [
            "base", "link", "meta", "isindex", "hr", "col", "img", "param", "embed", "frame",
            "wbr", "bgsound", "spacer", "keygen", "area", "input", "basefont", "source",
        ] {
            let _ = map.insert(name.to_string(), TagFlags::EMPTY);
        }
        let _ = map.insert("br".to_string(), TagFlags::EMPTY_CLOSED);
        let _ = map.insert("form".to_string(), TagFlags::CAN_OVERLAP);
        TagFlagTable { map }
    }

    /// Set (or replace) the flags for a tag name.
    pub fn set(&mut self, name: &str, flags: TagFlags) {
        let _ = self.map.insert(name.to_ascii_lowercase(), flags);
    }

    /// Remove any flags for a tag name.
    pub fn remove(&mut self, name: &str) {
        let _ = self.map.remove(&name.to_ascii_lowercase());
    }

    /// The flags for a tag name, defaulting to all-clear.
    #[must_use]
    pub fn get(&self, name: &str) -> TagFlags {
        self.map
            .get(&name.to_ascii_lowercase())
            .copied()
            .unwrap_or_default()
    }

    /// Whether the named element has raw-text content.
    #[must_use]
    pub fn is_cdata(&self, name: &str) -> bool {
        self.get(name).cdata
    }

    /// Whether the named element is a void element.
    #[must_use]
    pub fn is_empty(&self, name: &str) -> bool {
        self.get(name).empty
    }

    /// Whether the named element is closed by definition.
    #[must_use]
    pub fn is_closed(&self, name: &str) -> bool {
        self.get(name).closed
    }

    /// Whether the named element tolerates overlapped markup.
    #[must_use]
    pub fn can_overlap(&self, name: &str) -> bool {
        self.get(name).can_overlap
    }
}

impl Default for TagFlagTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Tunable parsing and output behavior, owned by the document.
#[derive(Debug, Clone)]
pub struct Options {
    /// Tag behavior flags (raw text, void, closed, overlap).
    pub flags: TagFlagTable,
    /// Track open nodes and record `TagNotClosed` faults (default true).
    pub check_syntax: bool,
    /// Disable the implicit-end heuristics; implicit-end situations become
    /// recorded faults with a forced explicit closure instead.
    pub disable_implicit_end: bool,
    /// Shape output as XML: declaration header, sanitized names, encoded
    /// text, forced end tags. Also escalates implicit-end situations like
    /// [`Options::disable_implicit_end`].
    pub output_as_xml: bool,
    /// Skip entity decoding when reading text and attribute values.
    pub preserve_raw_values: bool,
    /// Repair mis-nested li/tr/td/th via the resetter table, recording
    /// `EndTagInvalidHere` when an end tag crosses a reset boundary.
    pub fix_nested_tags: bool,
    /// Defer force-closing open descendants until end of document instead
    /// of closing them when their ancestor's end tag arrives.
    pub auto_close_on_end: bool,
    /// Depth limit for traversal, serialization, and deep clones.
    pub max_depth: usize,
    /// Parse-time limit on nested open nodes; 0 means unlimited.
    pub max_nested_child_nodes: usize,
    /// Maintain the id attribute index (default true).
    pub use_id_attribute: bool,
    /// When true (default), `p` participates in the implicit-end
    /// heuristics; when false, `p` is flagged void-and-closed instead and
    /// never nests.
    pub behavior_tag_p: bool,
    /// Stop parsing once the named element closes; the unparsed tail is
    /// kept as the document remainder.
    pub stopper_node_name: Option<String>,
    /// Write childless void elements as `<name />` instead of `<name>`.
    pub write_empty_nodes: bool,
    /// Write tag and attribute names with their original casing.
    pub output_original_case: bool,
    /// Prefer original names even outside of original-case output.
    pub default_use_original_name: bool,
    /// Drop quotes around attribute values that need none.
    pub optimize_attribute_values: bool,
    /// Quote style forced on all written attributes; `None` keeps each
    /// attribute's own style.
    pub global_quote_style: Option<crate::attribute::QuoteStyle>,
    /// Scan `<meta>` tags for a declared character set (default true).
    pub read_encoding: bool,
    /// Attach a markup excerpt to recorded parse faults.
    pub extract_error_source_text: bool,
    /// Maximum excerpt length for [`Options::extract_error_source_text`].
    pub extract_error_source_text_max_length: usize,
}

impl Options {
    /// The default option set.
    #[must_use]
    pub fn new() -> Self {
        Options {
            flags: TagFlagTable::new(),
            check_syntax: true,
            disable_implicit_end: false,
            output_as_xml: false,
            preserve_raw_values: false,
            fix_nested_tags: false,
            auto_close_on_end: false,
            max_depth: 4096,
            max_nested_child_nodes: 0,
            use_id_attribute: true,
            behavior_tag_p: true,
            stopper_node_name: None,
            write_empty_nodes: false,
            output_original_case: false,
            default_use_original_name: false,
            optimize_attribute_values: false,
            global_quote_style: None,
            read_encoding: true,
            extract_error_source_text: false,
            extract_error_source_text_max_length: 100,
        }
    }

    /// The resetter table for nested-tag repair: elements whose reappearance
    /// implies their previous instance ended, bounded by container names.
    #[must_use]
    pub fn resetters(name: &str) -> Option<&'static [&'static str]> {
        match name {
            "li" => Some(&["ul", "ol"]),
            "tr" => Some(&["table"]),
            "th" | "td" => Some(&["tr", "table"]),
            _ => None,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}
