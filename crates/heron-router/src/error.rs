//! Route table build errors.

use http::Method;
use thiserror::Error;

/// Result type for route table construction.
pub type RouterResult<T> = Result<T, RouterError>;

/// Reasons a route cannot be registered.
///
/// All of these are detected while the table is built, so a bad
/// declaration set stops the process before it accepts traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The (path, method) pair is already registered.
    #[error("route conflict: {method} {path} is already registered")]
    Conflict {
        /// Method of the duplicate.
        method: Method,
        /// Path of the duplicate.
        path: String,
    },

    /// Only GET, POST, PUT, DELETE and PATCH can be declared.
    #[error("method {method} cannot be declared on {path}")]
    UnsupportedMethod {
        /// The rejected method.
        method: Method,
        /// Path it was declared on.
        path: String,
    },

    /// `*rest` appears before the end of the path.
    #[error("wildcard must be the last segment in {0}")]
    WildcardNotLast(String),

    /// Two patterns name the same parameter position differently.
    #[error("parameter {{{new}}} in {path} conflicts with existing {{{existing}}}")]
    ParamConflict {
        /// The pattern being inserted.
        path: String,
        /// Name already registered at that position.
        existing: String,
        /// Name in the new pattern.
        new: String,
    },
}
