//! Configuration sections.
//!
//! Every section rejects unknown fields and fills absent ones with its
//! defaults, so a file only needs to name what it changes.

use serde::{Deserialize, Serialize};

/// HTTP listener settings.
///
/// ```
/// use heron_config::ServerConfig;
///
/// let server = ServerConfig::default();
/// assert_eq!(server.http_addr, "0.0.0.0:3000");
/// assert_eq!(server.request_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:3000`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Per-request deadline in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// How long shutdown waits for in-flight connections.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            request_timeout_ms: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// One `servers` entry of the API document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocsServer {
    /// Base URL.
    pub url: String,
    /// Free-form label.
    #[serde(default)]
    pub description: String,
}

/// API document metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DocsConfig {
    /// `info.title`.
    #[serde(default = "default_title")]
    pub title: String,

    /// `info.description`.
    #[serde(default = "default_description")]
    pub description: String,

    /// `servers`.
    #[serde(default = "default_servers")]
    pub servers: Vec<DocsServer>,

    /// Methods left out of the document, e.g. `["OPTIONS"]`.
    #[serde(default = "default_exclude_methods")]
    pub exclude_methods: Vec<String>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            servers: default_servers(),
            exclude_methods: default_exclude_methods(),
        }
    }
}

fn default_title() -> String {
    "Heron API".to_string()
}

fn default_description() -> String {
    "API for Heron".to_string()
}

fn default_servers() -> Vec<DocsServer> {
    vec![DocsServer {
        url: "http://localhost:3000".to_string(),
        description: "Local Server".to_string(),
    }]
}

fn default_exclude_methods() -> Vec<String> {
    vec!["OPTIONS".to_string()]
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `json` or `pretty`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

/// Values of the CORS headers set on every response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// `Access-Control-Allow-Origin`.
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,

    /// `Access-Control-Allow-Methods`.
    #[serde(default = "default_allow_methods")]
    pub allow_methods: String,

    /// `Access-Control-Allow-Headers`.
    #[serde(default = "default_allow_headers")]
    pub allow_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: default_allow_origin(),
            allow_methods: default_allow_methods(),
            allow_headers: default_allow_headers(),
        }
    }
}

fn default_allow_origin() -> String {
    "*".to_string()
}

fn default_allow_methods() -> String {
    "GET, POST, PUT, DELETE, OPTIONS".to_string()
}

fn default_allow_headers() -> String {
    "Origin, X-Requested-With, Content-Type, Accept, Authorization".to_string()
}
