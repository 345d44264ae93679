//! Re-serialization of mutated nodes and structured (XML-shaped) output.
//!
//! Nodes that still match their source span are substringed out verbatim;
//! only changed subtrees are rebuilt here. All recursion carries a depth
//! counter checked against the document's `max_depth`, so hostile nesting
//! fails fast instead of overflowing the stack.

use crate::attribute::{Attribute, QuoteStyle};
use crate::document::Document;
use crate::error::DomError;
use crate::node::{NodeId, NodeKind};

/// Serialize a node including its own tags.
///
/// # Errors
/// `DepthExceeded` when the subtree is deeper than the document allows.
pub fn outer_html(doc: &Document, id: NodeId) -> Result<String, DomError> {
    let mut out = String::new();
    write_node(doc, id, &mut out, 0)?;
    Ok(out)
}

/// Serialize the content between a node's tags.
///
/// # Errors
/// `DepthExceeded` when the subtree is deeper than the document allows.
pub fn inner_html(doc: &Document, id: NodeId) -> Result<String, DomError> {
    let mut out = String::new();
    for &child in doc.children(id) {
        write_node(doc, child, &mut out, 1)?;
    }
    Ok(out)
}

/// Serialize the whole document, honoring `Options::output_as_xml`.
///
/// # Errors
/// `DepthExceeded` when the tree is deeper than the document allows.
pub fn write_document(doc: &Document) -> Result<String, DomError> {
    let mut out = String::new();
    if doc.options().output_as_xml {
        let encoding = doc.declared_encoding().unwrap_or("utf-8");
        out.push_str(&format!("<?xml version=\"1.0\" encoding=\"{encoding}\"?>\n"));
    }
    for &child in doc.children(NodeId::ROOT) {
        write_node(doc, child, &mut out, 1)?;
    }
    Ok(out)
}

fn check_depth(doc: &Document, depth: usize) -> Result<(), DomError> {
    let max = doc.options().max_depth;
    if depth > max {
        return Err(DomError::DepthExceeded { max });
    }
    Ok(())
}

fn write_node(doc: &Document, id: NodeId, out: &mut String, depth: usize) -> Result<(), DomError> {
    check_depth(doc, depth)?;
    let node = doc.node(id);
    let xml = doc.options().output_as_xml;

    // Unchanged subtrees keep their original markup untouched.
    if !node.changed && !xml {
        out.push_str(doc.source_span(id));
        return Ok(());
    }
    if !xml && let Some(cached) = &node.outer_html_cache {
        out.push_str(cached);
        return Ok(());
    }

    match node.kind {
        NodeKind::Document => {
            for &child in doc.children(id) {
                write_node(doc, child, out, depth + 1)?;
            }
        }
        NodeKind::Text => {
            let text = doc.node_text(id);
            if xml {
                out.push_str(&xml_escape(text, false));
            } else {
                out.push_str(text);
            }
        }
        NodeKind::Comment => {
            // Parsed comment content includes its own framing.
            let text = doc.node_text(id);
            if xml {
                out.push_str("<!--");
                out.push_str(&strip_comment_framing(text));
                out.push_str("-->");
            } else {
                out.push_str(text);
            }
        }
        NodeKind::Element => write_element(doc, id, out, depth)?,
    }
    Ok(())
}

fn write_element(
    doc: &Document,
    id: NodeId,
    out: &mut String,
    depth: usize,
) -> Result<(), DomError> {
    let node = doc.node(id);
    let options = doc.options();
    let xml = options.output_as_xml;
    let name = if xml {
        sanitize_xml_name(&element_name(doc, id))
    } else {
        element_name(doc, id)
    };

    out.push('<');
    out.push_str(&name);
    for attr in &node.attributes {
        write_attribute(doc, attr, out);
    }

    if node.children.is_empty() {
        if options.flags.is_empty(&node.name) {
            if options.write_empty_nodes || xml {
                out.push_str(" />");
            } else {
                out.push('>');
            }
        } else {
            out.push_str("></");
            out.push_str(&name);
            out.push('>');
        }
        return Ok(());
    }

    out.push('>');
    for &child in doc.children(id) {
        write_node(doc, child, out, depth + 1)?;
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
    Ok(())
}

fn element_name(doc: &Document, id: NodeId) -> String {
    let node = doc.node(id);
    let options = doc.options();
    if options.output_original_case || options.default_use_original_name {
        node.original_name.clone()
    } else {
        node.name.clone()
    }
}

fn write_attribute(doc: &Document, attr: &Attribute, out: &mut String) {
    let options = doc.options();
    let xml = options.output_as_xml;
    let name = if options.output_original_case {
        attr.original_name.as_str()
    } else {
        attr.name.as_str()
    };
    let value = attr.value(doc.source(), doc.active_decoder());

    out.push(' ');
    if xml {
        out.push_str(&sanitize_xml_name(name));
        out.push_str("=\"");
        out.push_str(&xml_escape(value.unwrap_or(""), true));
        out.push('"');
        return;
    }

    let Some(value) = value else {
        // Valueless attributes are written as the bare name.
        out.push_str(name);
        return;
    };

    out.push_str(name);
    out.push('=');
    let style = doc.effective_quote_style(attr);
    let bare_ok = options.optimize_attribute_values
        && !value.is_empty()
        && !value.contains([' ', '\t', '\n', '\r', '"', '\'', '=', '<', '>', '`']);
    match style {
        _ if bare_ok => out.push_str(value),
        QuoteStyle::Single => {
            out.push('\'');
            out.push_str(value);
            out.push('\'');
        }
        QuoteStyle::Bare if !value.contains([' ', '\t', '\n', '\r', '"', '\'']) => {
            out.push_str(value);
        }
        _ => {
            out.push('"');
            out.push_str(value);
            out.push('"');
        }
    }
}

/// Escape the markup-significant characters for XML-shaped output.
#[must_use]
pub fn xml_escape(text: &str, quotes: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quotes => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Reduce a comment's stored text to its body, whatever framing it carries.
#[must_use]
pub fn strip_comment_framing(text: &str) -> String {
    let body = text
        .strip_prefix("<!--")
        .and_then(|t| t.strip_suffix("-->"))
        .or_else(|| {
            text.strip_prefix("<!")
                .and_then(|t| t.strip_suffix('>'))
        })
        .unwrap_or(text);
    // Nested terminators would break the reframed comment.
    body.replace("-->", "- ->")
}

/// Replace characters that are invalid in an XML name.
#[must_use]
pub fn sanitize_xml_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':' | '?') {
            out.push(c);
        } else {
            out.push_str(&format!("_x{:04X}_", c as u32));
        }
    }
    out
}
