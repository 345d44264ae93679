//! Integration tests for path queries over parsed documents.

use quoll_dom::{NodeId, NodeKind};
use quoll_html::load_html;
use quoll_xpath::{
    select_nodes, select_single_node, CursorKind, DocumentCursor, Query, QueryCursor, QueryError,
};

const PAGE: &str = concat!(
    "<html><body>",
    "<div id=\"top\" class=\"intro\"><p>first</p><p>second</p></div>",
    "<div class=\"main\">",
    "<ul><li><a href=\"/a\">a</a></li><li><a href=\"/b\">b</a></li><li>plain</li></ul>",
    "</div>",
    "<!-- trailer -->",
    "</body></html>"
);

fn names(doc: &quoll_dom::Document, ids: &[NodeId]) -> Vec<String> {
    ids.iter().map(|&id| doc.node(id).name.clone()).collect()
}

// ========== compilation ==========

#[test]
fn test_compile_failures_carry_positions() {
    for (query, position) in [("//div[", 6), ("/div/", 5), ("a[@x < 'y']", 5), ("]", 0)] {
        let err = Query::compile(query).unwrap_err();
        let QueryError::Malformed { position: at, .. } = err;
        assert_eq!(at, position, "error position for {query:?}");
    }
}

#[test]
fn test_compiled_query_is_reusable() {
    let doc = load_html(PAGE).unwrap();
    let query = Query::compile("//p").unwrap();

    let start = DocumentCursor::new(&doc, NodeId::ROOT);
    assert_eq!(query.evaluate(&start).len(), 2);
    assert_eq!(query.evaluate(&start).len(), 2);
}

#[test]
fn test_empty_result_is_not_an_error() {
    let doc = load_html(PAGE).unwrap();
    assert_eq!(select_nodes(&doc, NodeId::ROOT, "//article").unwrap(), vec![]);
    assert_eq!(select_single_node(&doc, NodeId::ROOT, "//article").unwrap(), None);
}

// ========== axes ==========

#[test]
fn test_child_axis_is_one_level() {
    let doc = load_html(PAGE).unwrap();
    let body = select_single_node(&doc, NodeId::ROOT, "/html/body").unwrap().unwrap();
    assert_eq!(doc.node(body).name, "body");

    // p is two levels down from body, child axis does not reach it
    assert!(select_nodes(&doc, body, "p").unwrap().is_empty());
    assert_eq!(select_nodes(&doc, body, "div/p").unwrap().len(), 2);
}

#[test]
fn test_descendant_axis_in_document_order() {
    let doc = load_html(PAGE).unwrap();
    let found = select_nodes(&doc, NodeId::ROOT, "//li").unwrap();

    assert_eq!(found.len(), 3);
    let texts: Vec<String> = found
        .iter()
        .map(|&li| doc.inner_text(li).unwrap())
        .collect();
    assert_eq!(texts, vec!["a", "b", "plain"]);
}

#[test]
fn test_parent_axis_deduplicates() {
    let doc = load_html(PAGE).unwrap();
    // both p elements share one parent div
    let parents = select_nodes(&doc, NodeId::ROOT, "//p/..").unwrap();

    assert_eq!(parents.len(), 1);
    assert_eq!(doc.attribute_value(parents[0], "id").as_deref(), Some("top"));
}

#[test]
fn test_self_and_explicit_axes() {
    let doc = load_html(PAGE).unwrap();
    let ul = select_single_node(&doc, NodeId::ROOT, "//ul").unwrap().unwrap();

    assert_eq!(select_nodes(&doc, ul, ".").unwrap(), vec![ul]);
    assert_eq!(
        select_nodes(&doc, ul, "child::li").unwrap(),
        select_nodes(&doc, ul, "li").unwrap()
    );
    assert_eq!(
        select_nodes(&doc, ul, "descendant::a").unwrap().len(),
        2
    );
}

#[test]
fn test_attribute_axis_yields_owning_elements() {
    let doc = load_html(PAGE).unwrap();
    // select_nodes resolves attribute hits to their element
    let hits = select_nodes(&doc, NodeId::ROOT, "//a/@href").unwrap();
    assert_eq!(names(&doc, &hits), vec!["a", "a"]);

    let query = Query::compile("//a/@href").unwrap();
    let cursors = query.evaluate(&DocumentCursor::new(&doc, NodeId::ROOT));
    assert_eq!(cursors.len(), 2);
    assert_eq!(cursors[0].node_kind(), CursorKind::Attribute);
    assert_eq!(cursors[0].name(), "href");
    assert_eq!(cursors[0].value(), "/a");
}

// ========== node tests ==========

#[test]
fn test_wildcard_and_kind_tests() {
    let doc = load_html(PAGE).unwrap();
    let top = select_single_node(&doc, NodeId::ROOT, "//div[@id='top']").unwrap().unwrap();

    assert_eq!(select_nodes(&doc, top, "*").unwrap().len(), 2);

    let comments = select_nodes(&doc, NodeId::ROOT, "//comment()").unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(doc.node(comments[0]).kind, NodeKind::Comment);

    let texts = select_nodes(&doc, top, "p/text()").unwrap();
    assert_eq!(texts.len(), 2);
    assert_eq!(doc.node_text(texts[0]), "first");
}

#[test]
fn test_name_test_is_case_insensitive() {
    let doc = load_html("<DIV><span>x</span></DIV>").unwrap();
    assert_eq!(select_nodes(&doc, NodeId::ROOT, "//DIV/SPAN").unwrap().len(), 1);
}

// ========== predicates ==========

#[test]
fn test_positional_predicates_are_per_context() {
    let doc = load_html(PAGE).unwrap();

    let second = select_nodes(&doc, NodeId::ROOT, "//p[2]").unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(doc.inner_text(second[0]).unwrap(), "second");

    // li[1] under each context node, not the first of the merged set
    let firsts = select_nodes(&doc, NodeId::ROOT, "//ul/li[1]").unwrap();
    assert_eq!(firsts.len(), 1);
    assert_eq!(doc.inner_text(firsts[0]).unwrap(), "a");
}

#[test]
fn test_last_and_position_predicates() {
    let doc = load_html(PAGE).unwrap();

    let last = select_nodes(&doc, NodeId::ROOT, "//li[last()]").unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(doc.inner_text(last[0]).unwrap(), "plain");

    let penultimate = select_nodes(&doc, NodeId::ROOT, "//li[last()-1]").unwrap();
    assert_eq!(doc.inner_text(penultimate[0]).unwrap(), "b");

    let leading = select_nodes(&doc, NodeId::ROOT, "//li[position()<=2]").unwrap();
    assert_eq!(leading.len(), 2);
}

#[test]
fn test_existence_predicates() {
    let doc = load_html(PAGE).unwrap();

    let with_link = select_nodes(&doc, NodeId::ROOT, "//li[a]").unwrap();
    assert_eq!(with_link.len(), 2);

    let with_href = select_nodes(&doc, NodeId::ROOT, "//a[@href]").unwrap();
    assert_eq!(with_href.len(), 2);

    let with_id = select_nodes(&doc, NodeId::ROOT, "//div[@id]").unwrap();
    assert_eq!(with_id.len(), 1);
}

#[test]
fn test_comparison_predicates() {
    let doc = load_html(PAGE).unwrap();

    let main = select_nodes(&doc, NodeId::ROOT, "//div[@class='main']").unwrap();
    assert_eq!(main.len(), 1);

    let other = select_nodes(&doc, NodeId::ROOT, "//div[@class!='main']").unwrap();
    assert_eq!(other.len(), 1);
    assert_eq!(doc.attribute_value(other[0], "id").as_deref(), Some("top"));

    let by_text = select_nodes(&doc, NodeId::ROOT, "//p[text()='first']").unwrap();
    assert_eq!(by_text.len(), 1);
}

#[test]
fn test_stacked_predicates_renumber() {
    let doc = load_html(PAGE).unwrap();
    // first filter to list items with a link, then take the second of those
    let hits = select_nodes(&doc, NodeId::ROOT, "//li[a][2]").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(doc.inner_text(hits[0]).unwrap(), "b");
}

// ========== cursor adapter ==========

#[test]
fn test_cursor_moves_and_refusals() {
    let doc = load_html(PAGE).unwrap();
    let mut cursor = DocumentCursor::new(&doc, NodeId::ROOT);

    assert_eq!(cursor.node_kind(), CursorKind::Root);
    assert!(!cursor.move_to_parent());
    assert!(cursor.move_to_first_child());
    assert_eq!(cursor.name(), "html");
    // a refused move leaves the cursor where it was
    assert!(!cursor.move_to_next());
    assert_eq!(cursor.name(), "html");
    assert!(cursor.move_to_parent());
    assert_eq!(cursor.node_kind(), CursorKind::Root);
}

#[test]
fn test_cursor_id_jump() {
    let doc = load_html(PAGE).unwrap();
    let mut cursor = DocumentCursor::new(&doc, NodeId::ROOT);

    assert!(cursor.move_to_id("top"));
    assert_eq!(cursor.name(), "div");
    assert_eq!(doc.attribute_value(cursor.node(), "id").as_deref(), Some("top"));
    assert!(!cursor.move_to_id("missing"));
    assert_eq!(cursor.name(), "div");
}

#[test]
fn test_cursor_attribute_iteration() {
    let doc = load_html(PAGE).unwrap();
    let mut cursor = DocumentCursor::new(&doc, NodeId::ROOT);
    assert!(cursor.move_to_id("top"));

    assert!(cursor.move_to_first_attribute());
    assert_eq!((cursor.name(), cursor.value()), ("id".to_string(), "top".to_string()));
    assert!(cursor.move_to_next_attribute());
    assert_eq!(cursor.name(), "class");
    assert!(!cursor.move_to_next_attribute());

    // leaving the attributes returns to the element
    assert!(cursor.move_to_parent());
    assert_eq!(cursor.name(), "div");
}

#[test]
fn test_is_same_position_distinguishes_attributes() {
    let doc = load_html(PAGE).unwrap();
    let mut on_element = DocumentCursor::new(&doc, NodeId::ROOT);
    assert!(on_element.move_to_id("top"));
    let mut on_attribute = on_element.clone();
    assert!(on_attribute.move_to_first_attribute());

    assert!(on_element.is_same_position(&on_element.clone()));
    assert!(!on_element.is_same_position(&on_attribute));
}
