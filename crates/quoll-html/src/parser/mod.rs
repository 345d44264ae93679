//! Parser module: the tokenizing state machine and the tag-closing engine.

mod closing;
/// The state machine core.
pub mod core;

pub use core::{HtmlParser, ParseState};
