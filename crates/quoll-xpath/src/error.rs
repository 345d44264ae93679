//! Query compilation errors.

use thiserror::Error;

/// Failure to compile a query expression.
///
/// Compilation always fails before any traversal happens, so a caller
/// holding a compiled [`Query`](crate::Query) knows it will never see a
/// syntax failure at evaluation time. An empty result set is an ordinary
/// empty vec, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The expression does not parse.
    #[error("malformed query at position {position}: {message}")]
    Malformed {
        /// Byte offset into the expression where parsing failed.
        position: usize,
        /// What the parser expected or rejected.
        message: String,
    },
}

impl QueryError {
    /// Shorthand for a malformed-query error.
    #[must_use]
    pub fn malformed(position: usize, message: impl Into<String>) -> Self {
        QueryError::Malformed {
            position,
            message: message.into(),
        }
    }
}
