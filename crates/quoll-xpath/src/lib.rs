//! Path queries over parsed documents.
//!
//! A small XPath-flavored query language for picking nodes out of a
//! [`quoll_dom::Document`]: location paths with the `child`, `descendant`,
//! `descendant-or-self`, `self`, `parent`, and `attribute` axes (plus the
//! `.`, `..`, `@`, and `//` abbreviations), the `*`, `text()`, `comment()`,
//! and `node()` node tests, and positional, existence, and
//! value-comparison predicates.
//!
//! Expressions compile once into a [`Query`] and evaluate many times.
//! Evaluation runs against the [`QueryCursor`] trait rather than the
//! document directly; [`DocumentCursor`] adapts a document to it.
//!
//! ```
//! use quoll_html::load_html;
//! use quoll_xpath::select_nodes;
//!
//! let doc = load_html("<ul><li>a</li><li>b</li></ul>").unwrap();
//! let items = select_nodes(&doc, quoll_dom::NodeId::ROOT, "//li").unwrap();
//! assert_eq!(items.len(), 2);
//! ```

pub mod ast;
pub mod cursor;
mod error;
mod eval;
pub mod lexer;
mod navigator;
mod parser;

pub use cursor::{CursorKind, QueryCursor};
pub use error::QueryError;
pub use navigator::DocumentCursor;

use quoll_dom::{Document, NodeId};

/// A compiled query expression.
///
/// Compiling separates syntax failures from empty results: a `Query`
/// that compiles will evaluate on any tree, and an expression that
/// matches nothing yields an empty vec rather than an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    path: ast::LocationPath,
}

impl Query {
    /// Compile an expression.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Malformed`] with the byte position of the
    /// first offending token when the expression does not parse.
    pub fn compile(text: &str) -> Result<Query, QueryError> {
        Ok(Query {
            path: parser::parse(text)?,
        })
    }

    /// Evaluate against a starting cursor.
    ///
    /// Relative paths start at the cursor's position; absolute paths
    /// rewind to the root first. Results come back in traversal order
    /// with duplicates removed, keeping each node's first occurrence.
    #[must_use]
    pub fn evaluate<C: QueryCursor>(&self, start: &C) -> Vec<C> {
        eval::evaluate(&self.path, start)
    }
}

/// Compile and run a query, returning the ids of the selected nodes.
///
/// Attribute matches resolve to their owning element's id.
///
/// # Errors
///
/// Returns [`QueryError::Malformed`] when the expression does not parse.
pub fn select_nodes(
    doc: &Document,
    start: NodeId,
    query: &str,
) -> Result<Vec<NodeId>, QueryError> {
    let compiled = Query::compile(query)?;
    let cursors = compiled.evaluate(&DocumentCursor::new(doc, start));
    let mut ids = Vec::with_capacity(cursors.len());
    for cursor in cursors {
        let id = cursor.node();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Like [`select_nodes`] but returning only the first match, if any.
///
/// # Errors
///
/// Returns [`QueryError::Malformed`] when the expression does not parse.
pub fn select_single_node(
    doc: &Document,
    start: NodeId,
    query: &str,
) -> Result<Option<NodeId>, QueryError> {
    let compiled = Query::compile(query)?;
    let cursors = compiled.evaluate(&DocumentCursor::new(doc, start));
    Ok(cursors.first().map(DocumentCursor::node))
}
