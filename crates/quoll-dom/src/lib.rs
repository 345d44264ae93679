//! Arena-based mutable DOM tree for lenient HTML.
//!
//! The tree a forgiving parser produces: every byte of the source is
//! reachable, malformed markup included. Nodes live in a single arena owned
//! by the [`Document`], addressed by [`NodeId`] indices, which gives O(1)
//! access and traversal without borrow checker issues and pins every node
//! to one owning document for life.
//!
//! # Laziness
//!
//! Parsed nodes and attributes remember byte spans into the source text
//! instead of owning strings. Values and serialized markup are substringed
//! out on first read; mutation flips a changed flag up the ancestor chain
//! and reads re-derive (and cache) from the tree instead.

pub mod attribute;
pub mod document;
pub mod error;
pub mod iter;
pub mod node;
pub mod options;
pub mod serialize;

pub use attribute::{Attribute, QuoteStyle};
pub use document::{Document, EntityDecoder};
pub use error::{DomError, ParseError, ParseErrorKind};
pub use iter::{Ancestors, Descendants};
pub use node::{NodeData, NodeId, NodeKind};
pub use options::{Options, TagFlagTable, TagFlags};
