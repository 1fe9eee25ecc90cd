//! # Heron Server
//!
//! Endpoint registry and HTTP server for the Heron framework.
//!
//! - Endpoint declarations with their middleware, validation and docs
//! - Build-time checks: duplicate routes and unknown middleware fail
//!   before the server binds
//! - HTTP/1.1 via Hyper, one task per connection
//! - A single error boundary: handler errors and panics become a 500 and
//!   are reported to the telemetry sink
//! - Per-request timeout, CORS, `x-trace-id`
//! - `/health`, `/ready` and `/opendocs`
//! - Graceful shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use heron_server::{EndpointDeclaration, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder(store)
//!         .endpoint(EndpointDeclaration::new("/api/whoAmI").middleware("auth").get(who_am_i))
//!         .build()?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/heron-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod health;
pub mod registry;
pub mod server;
pub mod shutdown;

pub use config::{DocsSettings, ServerConfig, ServerConfigBuilder};
pub use context::RequestContext;
pub use endpoint::EndpointDeclaration;
pub use error::{ServerError, ServerResult};
pub use handler::{BoxedHandler, FnHandler, Handler};
pub use health::{HealthStatus, ReadinessCheck, ReadinessStatus, HEALTH_PATH, READY_PATH};
pub use registry::{CompiledEndpoint, EndpointRegistry};
pub use server::{Server, ServerBuilder, DOCS_PATH, PREFLIGHT_BODY, TRACE_ID_HEADER};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
