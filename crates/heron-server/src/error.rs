//! Server build and runtime errors.

use heron_config::ConfigError;
use heron_docs::DocsError;
use heron_router::RouterError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop the server from being built or from running.
///
/// Request-level failures never surface here; they become responses.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A route could not be registered (duplicate, bad pattern, ...).
    #[error(transparent)]
    Route(#[from] RouterError),

    /// A declaration names middleware that does not exist.
    #[error("unknown middleware '{name}' declared on {path}")]
    UnknownMiddleware {
        /// The unrecognized name.
        name: String,
        /// Path of the declaration.
        path: String,
    },

    /// A declaration claims a path the server answers itself.
    #[error("{path} is reserved for the built-in endpoint")]
    ReservedPath {
        /// Path of the declaration.
        path: String,
    },

    /// The API document could not be serialized.
    #[error("failed to render API document: {0}")]
    Docs(#[from] DocsError),

    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The listener could not be bound.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}
