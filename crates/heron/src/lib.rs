//! # Heron
//!
//! **Declarative HTTP endpoints with a validated middleware pipeline**
//!
//! An endpoint is a value: a path, the middleware it needs, what its query
//! and body must look like, how it is documented, and one handler per verb.
//! Heron turns a set of those into:
//!
//! - a route table with a derived OPTIONS route per path;
//! - a pipeline per route: declared middleware, then validation, then
//!   reference resolution;
//! - an OpenAPI 3.1 document served at `/opendocs`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use heron::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let who_am_i = EndpointDeclaration::new("/api/whoAmI")
//!         .middleware("auth:validToken")
//!         .get(FnHandler::new(|ctx| {
//!             Box::pin(async move {
//!                 let user = ctx.require_user()?;
//!                 Ok(Response::json(StatusCode::OK, &user.profile()))
//!             })
//!         }));
//!
//!     Server::builder(store).endpoint(who_am_i).build()?.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! Request → Route → declared middleware → Validation → Resolution → Handler
//!                                                                     ↓
//! Response ← CORS + x-trace-id ← error boundary (500 / 504) ←─────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/heron/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use heron_core as core;

// Re-export routing
pub use heron_router as router;

// Re-export middleware
pub use heron_middleware as middleware;

// Re-export documentation
pub use heron_docs as docs;

// Re-export telemetry
pub use heron_telemetry as telemetry;

// Re-export configuration
pub use heron_config as config;

// Re-export the server
pub use heron_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use heron::prelude::*;
/// ```
pub mod prelude {
    pub use heron_core::{
        DataStore, DocMeta, HeronError, HeronResult, IdentityProfile, IdentityProvider,
        ObjectSchema, ObjectStore, RegisterType, RequestId, ResponseDoc, Rule, Schema,
        StoreState, StringRule, User, UserKey, Validation,
    };

    pub use heron_middleware::{Response, ResponseExt};

    pub use heron_config::{ConfigLoader, HeronConfig};

    pub use heron_telemetry::{init_logging, LogConfig};

    pub use heron_server::{
        EndpointDeclaration, FnHandler, Handler, RequestContext, Server, ServerConfig,
        ShutdownSignal,
    };

    pub use http::StatusCode;
}
