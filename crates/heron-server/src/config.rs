//! Server settings.
//!
//! Built by hand with [`ServerConfig::builder()`] or derived from a loaded
//! [`HeronConfig`] with [`ServerConfig::from_config`].
//!
//! ```rust
//! use heron_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3000")
//!     .request_timeout(Duration::from_secs(5))
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:3000");
//! assert_eq!(config.request_timeout(), Duration::from_secs(5));
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use heron_config::{ConfigError, HeronConfig};
use heron_docs::{ApiDocumentBuilder, Server as DocServer};
use heron_middleware::CorsPolicy;
use http::Method;

use crate::error::ServerError;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default graceful shutdown wait.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Metadata for the generated API document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocsSettings {
    /// `info.title`.
    pub title: String,
    /// `info.description`.
    pub description: String,
    /// `servers`.
    pub servers: Vec<DocServer>,
    /// Methods left out of the document.
    pub exclude_methods: Vec<Method>,
}

impl Default for DocsSettings {
    fn default() -> Self {
        Self {
            title: "Heron API".to_string(),
            description: String::new(),
            servers: Vec::new(),
            exclude_methods: vec![Method::OPTIONS],
        }
    }
}

impl DocsSettings {
    /// A fresh document builder with these settings.
    #[must_use]
    pub fn builder(&self) -> ApiDocumentBuilder {
        ApiDocumentBuilder::init(
            self.title.clone(),
            self.description.clone(),
            self.servers.clone(),
            self.exclude_methods.iter().cloned(),
        )
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    http_addr: String,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    cors: CorsPolicy,
    docs: DocsSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfigBuilder::new().build()
    }
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Takes every server-relevant section of a loaded configuration.
    pub fn from_config(config: &HeronConfig) -> Result<Self, ServerError> {
        let cors = CorsPolicy::new(
            &config.cors.allow_origin,
            &config.cors.allow_methods,
            &config.cors.allow_headers,
        )
        .map_err(|e| ConfigError::invalid_value("cors", e.to_string()))?;

        let docs = DocsSettings {
            title: config.docs.title.clone(),
            description: config.docs.description.clone(),
            servers: config
                .docs
                .servers
                .iter()
                .map(|s| DocServer {
                    url: s.url.clone(),
                    description: (!s.description.is_empty()).then(|| s.description.clone()),
                })
                .collect(),
            exclude_methods: config.excluded_methods()?,
        };

        Ok(Self::builder()
            .http_addr(config.server.http_addr.clone())
            .request_timeout(config.request_timeout())
            .shutdown_timeout(config.shutdown_timeout())
            .cors(cors)
            .docs(docs)
            .build())
    }

    /// Bind address as given.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the bind address.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Deadline covering body collection, pipeline and handler.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// How long shutdown waits for open connections.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// CORS headers added to every response.
    #[must_use]
    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    /// API document metadata.
    #[must_use]
    pub fn docs(&self) -> &DocsSettings {
        &self.docs
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    request_timeout: Duration,
    shutdown_timeout: Duration,
    cors: CorsPolicy,
    docs: DocsSettings,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerConfigBuilder {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            cors: CorsPolicy::default(),
            docs: DocsSettings::default(),
        }
    }

    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the per-request deadline.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the graceful shutdown wait.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the CORS headers.
    #[must_use]
    pub fn cors(mut self, cors: CorsPolicy) -> Self {
        self.cors = cors;
        self
    }

    /// Sets the API document metadata.
    #[must_use]
    pub fn docs(mut self, docs: DocsSettings) -> Self {
        self.docs = docs;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            request_timeout: self.request_timeout,
            shutdown_timeout: self.shutdown_timeout,
            cors: self.cors,
            docs: self.docs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.shutdown_timeout(), DEFAULT_SHUTDOWN_TIMEOUT);
        assert_eq!(config.docs().exclude_methods, vec![Method::OPTIONS]);
        assert!(config.socket_addr().is_ok());
    }

    #[test]
    fn test_from_heron_config() {
        let mut heron = HeronConfig::default();
        heron.server.http_addr = "127.0.0.1:4100".to_string();
        heron.server.request_timeout_ms = 750;
        heron.docs.title = "Users".to_string();
        heron.docs.exclude_methods = vec!["options".to_string(), "head".to_string()];

        let config = ServerConfig::from_config(&heron).unwrap();
        assert_eq!(config.http_addr(), "127.0.0.1:4100");
        assert_eq!(config.request_timeout(), Duration::from_millis(750));
        assert_eq!(config.docs().title, "Users");
        assert_eq!(config.docs().exclude_methods, vec![Method::OPTIONS, Method::HEAD]);
        assert_eq!(config.docs().servers[0].description.as_deref(), Some("Local Server"));
    }

    #[test]
    fn test_from_config_rejects_bad_cors() {
        let mut heron = HeronConfig::default();
        heron.cors.allow_headers = "Authorization\r\n".to_string();
        assert!(matches!(
            ServerConfig::from_config(&heron),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_addr() {
        let config = ServerConfig::builder().http_addr("nowhere").build();
        assert!(config.socket_addr().is_err());
    }
}
