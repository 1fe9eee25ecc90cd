use std::sync::Arc;

use anyhow::Context;
use heron::config::{ConfigLoader, ENV_PREFIX};
use heron::server::ServerConfig;
use heron::telemetry::init_logging;
use heron_users::{build_server, AppleIdentity, GoogleIdentity, MemoryStore, UserService};
use tracing::info;

/// Config file read when `HERON_CONFIG` is unset.
const DEFAULT_CONFIG_FILE: &str = "heron.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let loader = ConfigLoader::new().with_dotenv();
    let path = std::env::var("HERON_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let config = loader
        .with_optional_file(&path)?
        .with_env_prefix(ENV_PREFIX)
        .load()
        .context("invalid configuration")?;

    init_logging(&config.log_config()?)?;
    info!(config_file = %path, "configuration loaded");

    let store = Arc::new(MemoryStore::new());
    store.connect();

    let google = GoogleIdentity::new().context("failed to build the Google client")?;
    let service = Arc::new(UserService::new(
        store.clone(),
        Arc::new(google),
        Arc::new(AppleIdentity::new()),
    ));

    let server = build_server(ServerConfig::from_config(&config)?, store, service)?;
    server.run().await?;
    Ok(())
}
