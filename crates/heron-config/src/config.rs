//! Root configuration type.

use std::net::SocketAddr;
use std::time::Duration;

use heron_telemetry::{LogConfig, LogFormat};
use http::{HeaderValue, Method};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, CorsConfig, DocsConfig, LoggingConfig, ServerConfig};

/// Complete configuration of a Heron service.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and the
/// environment over the defaults.
///
/// ```
/// use heron_config::HeronConfig;
///
/// let config = HeronConfig::default();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.cors.allow_origin, "*");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HeronConfig {
    /// HTTP listener.
    #[serde(default)]
    pub server: ServerConfig,

    /// API document metadata.
    #[serde(default)]
    pub docs: DocsConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// CORS response headers.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl HeronConfig {
    /// Local development preset: pretty logs at `debug`, so rendered
    /// request traces are visible.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:3000".to_string();
        config.logging.level = "debug".to_string();
        config.logging.format = "pretty".to_string();
        config
    }

    /// Checks every value that the server would otherwise reject at
    /// startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_ms",
                "must be greater than zero",
            ));
        }

        self.log_format()?;
        self.excluded_methods()?;

        for (field, value) in [
            ("cors.allow_origin", &self.cors.allow_origin),
            ("cors.allow_methods", &self.cors.allow_methods),
            ("cors.allow_headers", &self.cors.allow_headers),
        ] {
            if HeaderValue::from_str(value).is_err() {
                return Err(ConfigError::invalid_value(
                    field,
                    format!("not a valid header value: {value:?}"),
                ));
            }
        }

        Ok(())
    }

    /// Parsed `server.http_addr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.http_addr.parse().map_err(|_| {
            ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            )
        })
    }

    /// `server.request_timeout_ms` as a duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// `server.shutdown_timeout_secs` as a duration.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Parsed `docs.exclude_methods`. Names are case-insensitive.
    pub fn excluded_methods(&self) -> Result<Vec<Method>, ConfigError> {
        self.docs
            .exclude_methods
            .iter()
            .map(|name| {
                Method::from_bytes(name.to_ascii_uppercase().as_bytes()).map_err(|_| {
                    ConfigError::invalid_value(
                        "docs.exclude_methods",
                        format!("not an HTTP method: {name}"),
                    )
                })
            })
            .collect()
    }

    fn log_format(&self) -> Result<LogFormat, ConfigError> {
        self.logging
            .format
            .parse()
            .map_err(|e: heron_telemetry::TelemetryError| {
                ConfigError::invalid_value("logging.format", e.to_string())
            })
    }

    /// Logging settings for [`heron_telemetry::init_logging`].
    ///
    /// Pretty output gets the development extras (span events, file and
    /// line).
    pub fn log_config(&self) -> Result<LogConfig, ConfigError> {
        let base = match self.log_format()? {
            LogFormat::Pretty => LogConfig::development(),
            LogFormat::Json => LogConfig::production(),
        };
        Ok(base.with_level(self.logging.level.clone()))
    }
}
