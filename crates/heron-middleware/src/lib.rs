//! # Heron Middleware
//!
//! The request pipeline that runs before every endpoint handler.
//!
//! ## Pipeline
//!
//! For each endpoint the [`MiddlewareRegistry`] assembles:
//!
//! ```text
//! declared middleware (in order) → dataValidation → dataResolution → handler
//! ```
//!
//! - Declared middleware come from the endpoint's `middleware` list
//!   (`auth:validToken`, `db:ready`).
//! - `dataValidation` checks query and body against the declared rules
//!   without I/O.
//! - `dataResolution` resolves reference fields through the data store and
//!   answers 400 with every collected error.
//!
//! Any stage may end the request; see [`MiddlewareOutcome`].
//!
//! ## CORS
//!
//! [`CorsPolicy`] holds the fixed CORS headers the server adds to every
//! response.

#![doc(html_root_url = "https://docs.rs/heron-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod cors;
pub mod middleware;
pub mod pipeline;
pub mod registry;
pub mod stages;
pub mod types;

pub use context::MiddlewareContext;
pub use cors::CorsPolicy;
pub use middleware::{BoxFuture, EndResponse, FnMiddleware, Middleware, MiddlewareOutcome};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use registry::MiddlewareRegistry;
pub use types::{Request, Response, ResponseExt};
