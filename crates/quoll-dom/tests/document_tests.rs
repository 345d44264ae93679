//! Tests for attributes, the id index, class helpers, and serialization
//! caching on programmatically built documents.

use quoll_dom::{Attribute, Document, DomError, NodeId, Options, QuoteStyle};

fn doc_with_div() -> (Document, NodeId) {
    let mut doc = Document::new();
    let div = doc.create_element("div");
    doc.append_child(NodeId::ROOT, div).unwrap();
    (doc, div)
}

// ========== attributes ==========

#[test]
fn test_attribute_lookup_is_case_insensitive() {
    let (mut doc, div) = doc_with_div();
    doc.set_attribute_value(div, "Data-Role", "nav").unwrap();

    assert_eq!(doc.attribute_value(div, "data-role").as_deref(), Some("nav"));
    assert_eq!(doc.attribute_value(div, "DATA-ROLE").as_deref(), Some("nav"));
    // The original spelling is retained separately.
    let attr = doc.node(div).attribute("data-role").unwrap();
    assert_eq!(attr.original_name, "Data-Role");
    assert_eq!(attr.name, "data-role");
}

#[test]
fn test_set_attribute_value_overwrites_in_place() {
    let (mut doc, div) = doc_with_div();
    doc.set_attribute_value(div, "href", "a").unwrap();
    doc.set_attribute_value(div, "href", "b").unwrap();

    assert_eq!(doc.node(div).attributes.len(), 1);
    assert_eq!(doc.attribute_value(div, "href").as_deref(), Some("b"));
}

#[test]
fn test_duplicate_attributes_prefer_last_appended() {
    let (mut doc, div) = doc_with_div();
    doc.append_attribute(div, Attribute::new("lang", "en")).unwrap();
    doc.append_attribute(div, Attribute::new("lang", "fr")).unwrap();

    assert_eq!(doc.node(div).attributes.len(), 2);
    assert_eq!(doc.attribute_value(div, "lang").as_deref(), Some("fr"));

    // Removing by index leaves the other duplicate in place.
    doc.remove_attribute_at(div, 1);
    assert_eq!(doc.attribute_value(div, "lang").as_deref(), Some("en"));
}

#[test]
fn test_valueless_attribute_reads_as_none() {
    let (mut doc, div) = doc_with_div();
    doc.append_attribute(div, Attribute::valueless("hidden")).unwrap();

    assert!(doc.node(div).has_attribute("hidden"));
    assert_eq!(doc.attribute_value(div, "hidden"), None);
}

#[test]
fn test_attributes_rejected_on_text_nodes() {
    let mut doc = Document::new();
    let text = doc.create_text("hello");
    assert!(matches!(
        doc.set_attribute_value(text, "id", "x"),
        Err(DomError::AttributesNotAllowed { kind: "text" })
    ));
}

#[test]
fn test_span_backed_attribute_materializes_lazily() {
    let source = "<a href=\"/home\">";
    let attr = Attribute::from_source("href", Some((9, 5)), QuoteStyle::Double, true);
    assert!(!attr.is_materialized());

    assert_eq!(attr.value(source, None), Some("/home"));
    assert!(attr.is_materialized());
}

// ========== id index ==========

#[test]
fn test_get_element_by_id_after_set_id() {
    let (mut doc, div) = doc_with_div();
    doc.set_id(div, "Main").unwrap();

    // Lookup is case-insensitive.
    assert_eq!(doc.get_element_by_id("main").unwrap(), Some(div));
    assert_eq!(doc.get_element_by_id("MAIN").unwrap(), Some(div));
    assert_eq!(doc.get_element_by_id("other").unwrap(), None);
}

#[test]
fn test_changing_id_moves_the_index_entry() {
    let (mut doc, div) = doc_with_div();
    doc.set_id(div, "old").unwrap();
    doc.set_id(div, "new").unwrap();

    assert_eq!(doc.get_element_by_id("old").unwrap(), None);
    assert_eq!(doc.get_element_by_id("new").unwrap(), Some(div));
}

#[test]
fn test_removing_id_attribute_unregisters() {
    let (mut doc, div) = doc_with_div();
    doc.set_id(div, "gone").unwrap();
    doc.remove_attribute(div, "id");

    assert_eq!(doc.get_element_by_id("gone").unwrap(), None);
}

#[test]
fn test_removed_node_leaves_the_id_index() {
    let (mut doc, div) = doc_with_div();
    doc.set_id(div, "x").unwrap();
    doc.remove_child(NodeId::ROOT, div, false).unwrap();

    assert_eq!(doc.get_element_by_id("x").unwrap(), None);
}

#[test]
fn test_id_index_disabled_by_option() {
    let mut options = Options::new();
    options.use_id_attribute = false;
    let doc = Document::with_options(options);

    assert!(matches!(
        doc.get_element_by_id("anything"),
        Err(DomError::IdIndexDisabled)
    ));
}

// ========== classes ==========

#[test]
fn test_class_helpers() {
    let (mut doc, div) = doc_with_div();
    doc.add_class(div, "card").unwrap();
    doc.add_class(div, "wide").unwrap();
    doc.add_class(div, "card").unwrap();

    assert_eq!(doc.get_classes(div), vec!["card", "wide"]);
    assert!(doc.has_class(div, "wide"));
    assert!(!doc.has_class(div, "narrow"));

    doc.remove_class(div, "card").unwrap();
    assert_eq!(doc.attribute_value(div, "class").as_deref(), Some("wide"));

    // Removing the last class drops the attribute entirely.
    doc.remove_class(div, "wide").unwrap();
    assert!(!doc.node(div).has_attribute("class"));
}

// ========== serialization and caching ==========

#[test]
fn test_built_tree_serializes() {
    let (mut doc, div) = doc_with_div();
    doc.set_attribute_value(div, "id", "x").unwrap();
    let text = doc.create_text("hi");
    doc.append_child(div, text).unwrap();

    assert_eq!(doc.to_html().unwrap(), "<div id=\"x\">hi</div>");
    assert_eq!(doc.outer_html(div).unwrap(), "<div id=\"x\">hi</div>");
    assert_eq!(doc.inner_html(div).unwrap(), "hi");
}

#[test]
fn test_outer_html_cache_invalidated_by_mutation() {
    let (mut doc, div) = doc_with_div();
    assert_eq!(doc.outer_html(div).unwrap(), "<div></div>");

    doc.set_attribute_value(div, "class", "a").unwrap();
    assert_eq!(doc.outer_html(div).unwrap(), "<div class=\"a\"></div>");

    // A child mutation invalidates the ancestor's cache too.
    let span = doc.create_element("span");
    doc.append_child(div, span).unwrap();
    assert_eq!(doc.outer_html(div).unwrap(), "<div class=\"a\"><span></span></div>");
}

#[test]
fn test_void_elements_serialize_without_end_tag() {
    let mut doc = Document::new();
    let br = doc.create_element("br");
    doc.append_child(NodeId::ROOT, br).unwrap();

    assert_eq!(doc.to_html().unwrap(), "<br>");

    doc.options_mut().write_empty_nodes = true;
    assert_eq!(quoll_dom::serialize::write_document(&doc).unwrap(), "<br />");
}

#[test]
fn test_inner_text_skips_comments() {
    let mut doc = Document::new();
    let div = doc.create_element("div");
    doc.append_child(NodeId::ROOT, div).unwrap();
    let hello = doc.create_text("hello ");
    doc.append_child(div, hello).unwrap();
    let comment = doc.create_comment("<!-- noise -->");
    doc.append_child(div, comment).unwrap();
    let world = doc.create_text("world");
    doc.append_child(div, world).unwrap();

    assert_eq!(doc.inner_text(div).unwrap(), "hello world");
}

#[test]
fn test_descendant_walk_allows_depth_at_the_limit() {
    let mut options = Options::new();
    options.max_depth = 3;
    let mut doc = Document::with_options(options);
    let mut current = NodeId::ROOT;
    for _ in 0..3 {
        let next = doc.create_element("div");
        doc.append_child(current, next).unwrap();
        current = next;
    }

    // the chain bottoms out exactly at the limit
    let walked: Result<Vec<NodeId>, DomError> = doc.descendants(NodeId::ROOT).collect();
    assert_eq!(walked.unwrap().len(), 3);

    // one level deeper trips the guard
    let extra = doc.create_element("div");
    doc.append_child(current, extra).unwrap();
    let walked: Result<Vec<NodeId>, DomError> = doc.descendants(NodeId::ROOT).collect();
    assert_eq!(walked.unwrap_err(), DomError::DepthExceeded { max: 3 });
}

#[test]
fn test_deep_clone_past_max_depth_fails() {
    let mut options = Options::new();
    options.max_depth = 4;
    let mut doc = Document::with_options(options);

    let mut current = NodeId::ROOT;
    for _ in 0..8 {
        let next = doc.create_element("div");
        doc.append_child(current, next).unwrap();
        current = next;
    }
    let top = doc.first_child(NodeId::ROOT).unwrap();
    assert!(matches!(
        doc.clone_node(top, true),
        Err(DomError::DepthExceeded { max: 4 })
    ));
}
