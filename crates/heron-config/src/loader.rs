//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{ConfigError, DocsServer, HeronConfig};

/// Default environment prefix.
pub const ENV_PREFIX: &str = "HERON";

/// Builds a [`HeronConfig`] from layers, later layers winning:
///
/// 1. built-in defaults (or a preset)
/// 2. TOML files, merged key by key
/// 3. a `.env` file, which only feeds the process environment
/// 4. `PREFIX__SECTION__KEY` environment variables
///
/// ```no_run
/// use heron_config::ConfigLoader;
///
/// # fn main() -> Result<(), heron_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("heron.toml")?
///     .with_dotenv()
///     .with_env_prefix("HERON")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: HeronConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Starts from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HeronConfig::development();
        self
    }

    /// Merges a TOML file over the current values.
    ///
    /// Keys absent from the file keep their current value; unknown keys
    /// are rejected.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        debug!(path = %path.display(), "loading configuration file");
        self.with_string(&content)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges TOML text over the current values.
    ///
    /// ```
    /// use heron_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nhttp_addr = \"127.0.0.1:4000\"")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:4000");
    /// assert_eq!(config.server.request_timeout_ms, 30_000);
    /// ```
    pub fn with_string(mut self, content: &str) -> Result<Self, ConfigError> {
        let overlay: toml::Table = toml::from_str(content)?;
        let toml::Value::Table(mut base) = toml::Value::try_from(&self.config).map_err(|e| {
            ConfigError::invalid_value("<root>", format!("cannot serialize current values: {e}"))
        })?
        else {
            return Err(ConfigError::invalid_value("<root>", "expected a table"));
        };
        merge_tables(&mut base, overlay);
        self.config = toml::Value::Table(base).try_into()?;
        Ok(self)
    }

    /// Enables environment overrides named `PREFIX__SECTION__KEY`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the working directory into the process
    /// environment, if present. Variables already set are kept.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env file");
        }
        self
    }

    /// Applies environment overrides and validates.
    pub fn load(mut self) -> Result<HeronConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(&format!("{prefix}__")))
                .collect();
            self.apply_env_vars(&prefix, vars)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the current values without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> HeronConfig {
        self.config
    }

    fn apply_env_vars<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let rest = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;
        let parts: Vec<&str> = rest.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse_u64(key, value)?;
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_u64(key, value)?;
            }

            ["DOCS", "TITLE"] => config.docs.title = value.to_string(),
            ["DOCS", "DESCRIPTION"] => config.docs.description = value.to_string(),
            ["DOCS", "SERVERS"] => {
                config.docs.servers = split_list(value)
                    .map(|url| DocsServer {
                        url,
                        description: String::new(),
                    })
                    .collect();
            }
            ["DOCS", "EXCLUDE_METHODS"] => config.docs.exclude_methods = split_list(value).collect(),

            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => config.logging.format = value.to_ascii_lowercase(),

            ["CORS", "ALLOW_ORIGIN"] => config.cors.allow_origin = value.to_string(),
            ["CORS", "ALLOW_METHODS"] => config.cors.allow_methods = value.to_string(),
            ["CORS", "ALLOW_HEADERS"] => config.cors.allow_headers = value.to_string(),

            _ => return Err(ConfigError::UnknownEnvKey { var: key.to_string() }),
        }

        Ok(())
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

/// Comma-separated list, blanks dropped.
fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Recursively overlays `overlay` onto `base`. Tables merge, anything
/// else replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
