//! Layered configuration for Heron services.
//!
//! [`ConfigLoader`] starts from built-in defaults, merges TOML files over
//! them, then applies `HERON__SECTION__KEY` environment variables
//! (optionally seeded from a `.env` file). Unknown keys are rejected at
//! every layer.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:3000"
//! request_timeout_ms = 30000
//! shutdown_timeout_secs = 30
//!
//! [docs]
//! title = "Heron API"
//! description = "API for Heron"
//! servers = [{ url = "http://localhost:3000", description = "Local Server" }]
//! exclude_methods = ["OPTIONS"]
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [cors]
//! allow_origin = "*"
//! allow_methods = "GET, POST, PUT, DELETE, OPTIONS"
//! allow_headers = "Origin, X-Requested-With, Content-Type, Accept, Authorization"
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `HERON__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `HERON__LOGGING__LEVEL=heron_server=debug,info`
//! - `HERON__DOCS__EXCLUDE_METHODS=OPTIONS,HEAD` (comma-separated)

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HeronConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, ENV_PREFIX};
pub use schema::{CorsConfig, DocsConfig, DocsServer, LoggingConfig, ServerConfig};
