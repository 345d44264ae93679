//! Integration tests for the HTML parser: structure, recovery
//! heuristics, raw text, and fault reporting.

use quoll_dom::{Document, NodeId, NodeKind, Options, ParseErrorKind, QuoteStyle};
use quoll_html::{load_html, load_html_with_options, HtmlParser};

/// Helper to get the first element with a tag name, depth-first.
fn find_element(doc: &Document, from: NodeId, tag: &str) -> Option<NodeId> {
    let node = doc.node(from);
    if node.is_element() && node.name == tag {
        return Some(from);
    }
    for &child in doc.children(from) {
        if let Some(found) = find_element(doc, child, tag) {
            return Some(found);
        }
    }
    None
}

/// Helper to collect the element names of a node's children.
fn child_names(doc: &Document, id: NodeId) -> Vec<String> {
    doc.children(id)
        .iter()
        .filter(|&&c| doc.node(c).is_element())
        .map(|&c| doc.node(c).name.clone())
        .collect()
}

fn error_kinds(doc: &Document) -> Vec<ParseErrorKind> {
    doc.parse_errors().iter().map(|e| e.kind).collect()
}

// ========== basic structure ==========

#[test]
fn test_nested_elements_and_text() {
    let doc = load_html("<html><body><div>Hello World</div></body></html>").unwrap();

    let div = find_element(&doc, NodeId::ROOT, "div").unwrap();
    assert_eq!(doc.inner_text(div).unwrap(), "Hello World");
    assert_eq!(doc.parent(div), find_element(&doc, NodeId::ROOT, "body"));
    assert!(doc.parse_errors().is_empty());
}

#[test]
fn test_root_is_document_node() {
    let doc = load_html("x").unwrap();
    assert_eq!(doc.node(NodeId::ROOT).kind, NodeKind::Document);
    let text = doc.first_child(NodeId::ROOT).unwrap();
    assert_eq!(doc.node(text).kind, NodeKind::Text);
    assert_eq!(doc.node_text(text), "x");
}

#[test]
fn test_void_elements_do_not_nest() {
    let doc = load_html("<div>a<br>b<img src=x>c</div>").unwrap();
    let div = find_element(&doc, NodeId::ROOT, "div").unwrap();

    assert_eq!(child_names(&doc, div), vec!["br", "img"]);
    let br = find_element(&doc, div, "br").unwrap();
    assert!(doc.children(br).is_empty());
    assert!(doc.node(br).closed);
    assert_eq!(doc.inner_text(div).unwrap(), "abc");
    assert!(doc.parse_errors().is_empty());
}

#[test]
fn test_source_spans_cover_original_markup() {
    let source = "<div class=\"a\">body</div>";
    let doc = load_html(source).unwrap();
    let div = find_element(&doc, NodeId::ROOT, "div").unwrap();

    assert_eq!(doc.source_span(div), source);
    assert_eq!(&source[doc.node(div).inner_start..][..doc.node(div).inner_len], "body");
}

// ========== lenient round-tripping ==========

#[test]
fn test_round_trip_is_byte_identical() {
    let cases = [
        "<html><head><title>t</title></head><body><p>x</p></body></html>",
        "<ul><li>one<li>two</ul>",
        "<DIV Class=\"Mixed\">keep <B>case</B> and &amp; entities</DIV>",
        "text only, no markup",
        "<!-- comment --><p>after</p>",
    ];
    for case in cases {
        let doc = load_html(case).unwrap();
        assert_eq!(doc.to_html().unwrap(), case, "round trip of {case:?}");
    }
}

#[test]
fn test_reparse_is_idempotent() {
    let source = "<table><tr><td>a<td>b</table>";
    let first = load_html(source).unwrap().to_html().unwrap();
    let second = load_html(&first).unwrap().to_html().unwrap();
    assert_eq!(first, second);
}

// ========== implicit and explicit closing ==========

#[test]
fn test_li_siblings_close_implicitly() {
    let doc = load_html("<ul><li>a<li>b</ul>").unwrap();
    let ul = find_element(&doc, NodeId::ROOT, "ul").unwrap();

    let items = doc.elements(ul, "li");
    assert_eq!(items.len(), 2);
    assert_eq!(doc.inner_text(items[0]).unwrap(), "a");
    assert_eq!(doc.inner_text(items[1]).unwrap(), "b");
    assert!(doc.node(items[0]).implicit_end);
    assert!(doc.parse_errors().is_empty());
}

#[test]
fn test_paragraph_closed_by_block_element() {
    let doc = load_html("<p>one<div>two</div>").unwrap();

    let p = find_element(&doc, NodeId::ROOT, "p").unwrap();
    let div = find_element(&doc, NodeId::ROOT, "div").unwrap();
    assert_eq!(doc.inner_text(p).unwrap(), "one");
    // div became a sibling, not a child, of the paragraph
    assert_eq!(doc.parent(div), Some(NodeId::ROOT));
    assert!(doc.node(p).implicit_end);
}

#[test]
fn test_paragraph_not_closed_by_inline_element() {
    let doc = load_html("<p>one <b>two</b></p>").unwrap();
    let p = find_element(&doc, NodeId::ROOT, "p").unwrap();
    let b = find_element(&doc, NodeId::ROOT, "b").unwrap();

    assert_eq!(doc.parent(b), Some(p));
    assert_eq!(doc.inner_text(p).unwrap(), "one two");
}

#[test]
fn test_table_cells_close_each_other() {
    let doc = load_html("<table><tr><td>a<td>b<tr><td>c</table>").unwrap();
    let table = find_element(&doc, NodeId::ROOT, "table").unwrap();

    let rows = doc.elements(table, "tr");
    assert_eq!(rows.len(), 2);
    assert_eq!(doc.elements(rows[0], "td").len(), 2);
    assert_eq!(doc.elements(rows[1], "td").len(), 1);
}

#[test]
fn test_heading_closes_other_heading() {
    let doc = load_html("<h1>title<h2>subtitle</h2>").unwrap();
    let h1 = find_element(&doc, NodeId::ROOT, "h1").unwrap();
    let h2 = find_element(&doc, NodeId::ROOT, "h2").unwrap();

    assert_eq!(doc.parent(h2), Some(NodeId::ROOT));
    assert_eq!(doc.inner_text(h1).unwrap(), "title");
}

#[test]
fn test_legacy_paragraph_mode_treats_p_as_void() {
    let mut options = Options::new();
    options.behavior_tag_p = false;
    let doc = load_html_with_options("<p>one<p>two</p>", options).unwrap();

    // Both paragraphs are void; text lands beside them, and the stray
    // end tag grafts the trailing text under the childless second p.
    let paragraphs: Vec<NodeId> = doc
        .children(NodeId::ROOT)
        .iter()
        .copied()
        .filter(|&c| doc.node(c).is_element() && doc.node(c).name == "p")
        .collect();
    assert_eq!(paragraphs.len(), 2);
    assert!(doc.children(paragraphs[0]).is_empty());
    assert_eq!(doc.inner_text(paragraphs[1]).unwrap(), "two");
}

#[test]
fn test_disable_implicit_end_records_faults() {
    let mut options = Options::new();
    options.disable_implicit_end = true;
    let doc = load_html_with_options("<ul><li>a<li>b</ul>", options).unwrap();

    // The nesting repair still happens, but as a recorded fault.
    let ul = find_element(&doc, NodeId::ROOT, "ul").unwrap();
    assert_eq!(doc.elements(ul, "li").len(), 2);
    assert!(error_kinds(&doc).contains(&ParseErrorKind::TagNotClosed));
    let fault = &doc.parse_errors()[0];
    assert!(fault.reason.contains("</li>"));
}

// ========== stray end tags ==========

#[test]
fn test_unmatched_end_tag_is_a_fault() {
    let doc = load_html("<div><p>text</div>").unwrap();
    let div = find_element(&doc, NodeId::ROOT, "div").unwrap();
    let p = find_element(&doc, NodeId::ROOT, "p").unwrap();

    // </div> force-closed the open p
    assert_eq!(doc.parent(p), Some(div));
    assert!(doc.node(p).closed);
    assert!(doc.parse_errors().is_empty());

    let doc = load_html("<p>text</div>").unwrap();
    assert!(error_kinds(&doc).contains(&ParseErrorKind::TagNotOpened));
    assert!(error_kinds(&doc).contains(&ParseErrorKind::TagNotClosed));
}

#[test]
fn test_end_tag_for_void_element_not_required() {
    let doc = load_html("<div></img></div>").unwrap();
    assert_eq!(error_kinds(&doc), vec![ParseErrorKind::EndTagNotRequired]);
}

#[test]
fn test_stray_br_end_tag_synthesizes_element() {
    let doc = load_html("x</br>y").unwrap();
    let br = find_element(&doc, NodeId::ROOT, "br").unwrap();

    assert!(doc.children(br).is_empty());
    assert!(doc.node(br).closed);
    assert_eq!(doc.inner_text(NodeId::ROOT).unwrap(), "xy");
    assert!(doc.parse_errors().is_empty());
}

#[test]
fn test_overlap_tolerant_end_tag_degrades_to_text() {
    let doc = load_html("<div></form></div>").unwrap();
    let div = find_element(&doc, NodeId::ROOT, "div").unwrap();

    let children = doc.children(div);
    assert_eq!(children.len(), 1);
    assert_eq!(doc.node(children[0]).kind, NodeKind::Text);
    assert_eq!(doc.node_text(children[0]), "</form>");
    assert!(doc.parse_errors().is_empty());
}

#[test]
fn test_degraded_end_tag_serializes_lowercased() {
    let mut doc = load_html("<div></FORM></div>").unwrap();
    let div = find_element(&doc, NodeId::ROOT, "div").unwrap();
    let text = doc.children(div)[0];

    // the override wins over the original-cased source span
    assert_eq!(doc.node_text(text), "</form>");
    assert_eq!(doc.outer_html(text).unwrap(), "</form>");
    assert_eq!(doc.outer_html(div).unwrap(), "<div></form></div>");
}

// ========== unclosed tags at end of input ==========

#[test]
fn test_unclosed_tags_are_faulted_and_force_closed() {
    let doc = load_html("<div><span>x").unwrap();

    assert_eq!(
        error_kinds(&doc),
        vec![ParseErrorKind::TagNotClosed, ParseErrorKind::TagNotClosed]
    );
    let div = find_element(&doc, NodeId::ROOT, "div").unwrap();
    let span = find_element(&doc, NodeId::ROOT, "span").unwrap();
    assert!(doc.node(div).closed);
    assert!(doc.node(span).closed);
    assert!(doc.node(div).implicit_end);
    assert_eq!(doc.inner_text(div).unwrap(), "x");
}

#[test]
fn test_fault_excerpts_are_opt_in() {
    let doc = load_html("<div>x").unwrap();
    assert_eq!(doc.parse_errors()[0].source_text, "");

    let mut options = Options::new();
    options.extract_error_source_text = true;
    let doc = load_html_with_options("<div>x", options).unwrap();
    assert!(doc.parse_errors()[0].source_text.starts_with("<div>"));
}

#[test]
fn test_fault_positions_point_at_the_tag() {
    let doc = load_html("line one\n<div>x").unwrap();
    let fault = &doc.parse_errors()[0];
    assert_eq!(fault.kind, ParseErrorKind::TagNotClosed);
    assert_eq!(fault.line, 2);
    assert_eq!(fault.stream_position, 9);
}

// ========== nested-tag repair ==========

#[test]
fn test_fix_nested_tags_closes_previous_sibling() {
    let mut options = Options::new();
    options.fix_nested_tags = true;
    let doc = load_html_with_options("<li>a<li>b", options).unwrap();

    let items: Vec<NodeId> = doc
        .children(NodeId::ROOT)
        .iter()
        .copied()
        .filter(|&c| doc.node(c).is_element())
        .collect();
    assert_eq!(items.len(), 2);
    assert!(doc.node(items[0]).closed);
}

#[test]
fn test_end_tag_across_resetter_is_invalid_here() {
    let mut options = Options::new();
    options.fix_nested_tags = true;
    let doc = load_html_with_options("<li>a<ul><b>x</li>", options).unwrap();

    assert!(error_kinds(&doc).contains(&ParseErrorKind::EndTagInvalidHere));
}

// ========== raw-text elements ==========

#[test]
fn test_script_content_is_not_parsed_as_markup() {
    let doc = load_html("<script>if (a<b) { f(); }</script><p>x</p>").unwrap();
    let script = find_element(&doc, NodeId::ROOT, "script").unwrap();

    let children = doc.children(script);
    assert_eq!(children.len(), 1);
    assert_eq!(doc.node(children[0]).kind, NodeKind::Text);
    assert_eq!(doc.node_text(children[0]), "if (a<b) { f(); }");
    // script text is hidden from collected inner text
    assert_eq!(doc.inner_text(NodeId::ROOT).unwrap(), "x");
    assert!(find_element(&doc, script, "b").is_none());
}

#[test]
fn test_raw_text_end_tag_is_case_insensitive() {
    let doc = load_html("<style>.a { color: red }</STYLE>done").unwrap();
    let style = find_element(&doc, NodeId::ROOT, "style").unwrap();

    assert!(doc.node(style).closed);
    assert_eq!(doc.node_text(doc.children(style)[0]), ".a { color: red }");
    assert_eq!(doc.inner_text(NodeId::ROOT).unwrap(), "done");
}

#[test]
fn test_title_text_is_not_hidden() {
    let doc = load_html("<title>my <page></title>").unwrap();
    let title = find_element(&doc, NodeId::ROOT, "title").unwrap();

    assert_eq!(doc.inner_text(title).unwrap(), "my <page>");
}

// ========== comments, declarations, embedded code ==========

#[test]
fn test_full_comment_swallows_markup() {
    let doc = load_html("<!-- a > b <div> -->x").unwrap();
    let comment = doc.first_child(NodeId::ROOT).unwrap();

    assert_eq!(doc.node(comment).kind, NodeKind::Comment);
    assert_eq!(doc.node_text(comment), "<!-- a > b <div> -->");
    assert!(find_element(&doc, NodeId::ROOT, "div").is_none());
    assert_eq!(doc.inner_text(NodeId::ROOT).unwrap(), "x");
}

#[test]
fn test_doctype_ends_at_first_gt() {
    let doc = load_html("<!DOCTYPE html><p>x</p>").unwrap();
    let first = doc.first_child(NodeId::ROOT).unwrap();

    assert_eq!(doc.node(first).kind, NodeKind::Comment);
    assert_eq!(doc.node_text(first), "<!DOCTYPE html>");
    assert!(find_element(&doc, NodeId::ROOT, "p").is_some());
}

#[test]
fn test_embedded_code_in_text_stays_text() {
    let source = "<% render() %>after";
    let doc = load_html(source).unwrap();

    let children = doc.children(NodeId::ROOT);
    assert_eq!(children.len(), 1);
    assert_eq!(doc.node(children[0]).kind, NodeKind::Text);
    assert_eq!(doc.node_text(children[0]), source);
}

#[test]
fn test_embedded_code_as_attribute_value() {
    let doc = load_html("<a href=<%=url%>>x</a>").unwrap();
    let a = find_element(&doc, NodeId::ROOT, "a").unwrap();

    assert_eq!(doc.attribute_value(a, "href").as_deref(), Some("<%=url%>"));
    assert_eq!(doc.inner_text(a).unwrap(), "x");
}

#[test]
fn test_embedded_code_inside_quoted_attribute_value() {
    // the code run resumes the still-open quoted value
    let doc = load_html("<a href=\"x<% y %>z\">t</a>").unwrap();
    let a = find_element(&doc, NodeId::ROOT, "a").unwrap();

    assert_eq!(doc.attribute_value(a, "href").as_deref(), Some("x<% y %>z"));
    assert_eq!(doc.inner_text(a).unwrap(), "t");
}

// ========== attributes ==========

#[test]
fn test_attribute_quote_styles_are_recorded() {
    let doc = load_html("<a href=\"/x\" CHECKED data-v='1' bare=v>t</a>").unwrap();
    let a = find_element(&doc, NodeId::ROOT, "a").unwrap();
    let attrs = &doc.node(a).attributes;

    assert_eq!(attrs.len(), 4);
    assert_eq!(attrs[0].quote_style, QuoteStyle::Double);
    assert_eq!(attrs[1].quote_style, QuoteStyle::Valueless);
    assert_eq!(attrs[2].quote_style, QuoteStyle::Single);
    assert_eq!(attrs[3].quote_style, QuoteStyle::Bare);

    assert_eq!(attrs[1].original_name, "CHECKED");
    assert_eq!(attrs[1].name, "checked");
    assert!(!attrs[1].has_equal);

    assert_eq!(doc.attribute_value(a, "href").as_deref(), Some("/x"));
    assert_eq!(doc.attribute_value(a, "bare").as_deref(), Some("v"));
    assert_eq!(doc.attribute_value(a, "checked"), None);
}

#[test]
fn test_attribute_values_materialize_on_first_read() {
    let doc = load_html("<a href=\"/x\">t</a>").unwrap();
    let a = find_element(&doc, NodeId::ROOT, "a").unwrap();

    assert!(!doc.node(a).attributes[0].is_materialized());
    let _ = doc.attribute_value(a, "href");
    assert!(doc.node(a).attributes[0].is_materialized());
}

#[test]
fn test_attribute_values_are_entity_decoded() {
    let doc = load_html("<a title=\"a&amp;b &lt;c&gt;\">t</a>").unwrap();
    let a = find_element(&doc, NodeId::ROOT, "a").unwrap();

    assert_eq!(doc.attribute_value(a, "title").as_deref(), Some("a&b <c>"));
}

#[test]
fn test_empty_attribute_value_is_not_valueless() {
    let doc = load_html("<a href=\"\" download>t</a>").unwrap();
    let a = find_element(&doc, NodeId::ROOT, "a").unwrap();

    assert_eq!(doc.attribute_value(a, "href").as_deref(), Some(""));
    assert_eq!(doc.attribute_value(a, "download"), None);
    assert!(doc.node(a).has_attribute("download"));
}

#[test]
fn test_parsed_id_attributes_are_indexed() {
    let doc = load_html("<div id=\"Top\"><span id=\"inner\">x</span></div>").unwrap();
    let div = find_element(&doc, NodeId::ROOT, "div").unwrap();
    let span = find_element(&doc, NodeId::ROOT, "span").unwrap();

    assert_eq!(doc.get_element_by_id("top").unwrap(), Some(div));
    assert_eq!(doc.get_element_by_id("INNER").unwrap(), Some(span));
}

// ========== text and entities ==========

#[test]
fn test_inner_text_decodes_entities() {
    let mut doc = load_html("<p>fish &amp; chips &gt; soup</p>").unwrap();
    let p = find_element(&doc, NodeId::ROOT, "p").unwrap();

    assert_eq!(doc.inner_text(p).unwrap(), "fish & chips > soup");
    // the raw span is untouched
    assert_eq!(doc.inner_html(p).unwrap(), "fish &amp; chips &gt; soup");
}

#[test]
fn test_preserve_raw_values_skips_decoding() {
    let mut options = Options::new();
    options.preserve_raw_values = true;
    let doc = load_html_with_options("<p>a&amp;b</p>", options).unwrap();
    let p = find_element(&doc, NodeId::ROOT, "p").unwrap();

    assert_eq!(doc.inner_text(p).unwrap(), "a&amp;b");
}

// ========== stopper node and remainder ==========

#[test]
fn test_stopper_node_leaves_a_remainder() {
    let mut options = Options::new();
    options.stopper_node_name = Some("head".to_string());
    let source = "<html><head><title>t</title></head><body>x</body></html>";
    let doc = load_html_with_options(source, options).unwrap();

    assert_eq!(doc.remainder(), Some("<body>x</body></html>"));
    assert_eq!(doc.remainder_offset(), 35);
    assert!(find_element(&doc, NodeId::ROOT, "title").is_some());
    assert!(find_element(&doc, NodeId::ROOT, "body").is_none());
}

// ========== encoding detection ==========

#[test]
fn test_meta_content_type_declares_encoding() {
    let source =
        "<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=ISO-8859-1\"></head></html>";
    let doc = load_html(source).unwrap();
    assert_eq!(doc.declared_encoding(), Some("ISO-8859-1"));
}

#[test]
fn test_meta_charset_is_normalized() {
    assert_eq!(
        quoll_html::detect_encoding("<meta charset=\"utf8\">").as_deref(),
        Some("utf-8")
    );
    assert_eq!(quoll_html::detect_encoding("<p>no meta</p>"), None);
}

#[test]
fn test_charset_mismatch_is_a_fault() {
    let source = "<meta charset=\"utf-8\"><p>x</p>";
    let parser = HtmlParser::new(source, Options::new(), false).with_stream_encoding("windows-1252");
    let doc = parser.parse().unwrap();

    assert!(error_kinds(&doc).contains(&ParseErrorKind::CharsetMismatch));
    let fault = doc
        .parse_errors()
        .iter()
        .find(|e| e.kind == ParseErrorKind::CharsetMismatch)
        .unwrap();
    assert!(fault.reason.contains("windows-1252"));
    assert!(fault.reason.contains("utf-8"));
}

// ========== structural limits ==========

#[test]
fn test_max_nested_child_nodes_is_enforced() {
    let mut options = Options::new();
    options.max_nested_child_nodes = 5;
    let result = load_html_with_options("<a><b><c><d><e><f>deep", options);

    assert!(matches!(
        result,
        Err(quoll_dom::DomError::TooManyNestedNodes { max: 5 })
    ));
}

// ========== XML-shaped output ==========

#[test]
fn test_xml_output_forces_end_tags_and_header() {
    let mut options = Options::new();
    options.output_as_xml = true;
    let doc = load_html_with_options("<br>", options).unwrap();

    assert_eq!(
        doc.to_html().unwrap(),
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<br />"
    );
}
