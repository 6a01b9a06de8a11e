//! Subcommand implementations and the runtime they share.

pub mod credential;
pub mod engage;
pub mod heartbeat;
pub mod join;
pub mod preview;
pub mod publish;
pub mod serve;
pub mod status;
pub mod thread;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use moltpilot_agent::AgentServices;
use moltpilot_config::AppConfig;
use moltpilot_memory::SqliteStore;
use moltpilot_tools::NetworkGateway;
use tokio_util::sync::CancellationToken;

/// Load the config from `path`, or the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config.validate().context("Invalid configuration")?;
            Ok(config)
        }
        None => AppConfig::load().context("Failed to load config"),
    }
}

/// Open the store and wire every service against the live platform.
pub async fn runtime(config: &AppConfig) -> anyhow::Result<AgentServices> {
    let store = Arc::new(
        SqliteStore::new(&config.storage.database_url)
            .await
            .with_context(|| format!("Failed to open {}", config.storage.database_url))?,
    );
    let gateway = Arc::new(NetworkGateway::live());
    let provider = moltpilot_providers::build_from_config(&config.provider);

    AgentServices::build(config, gateway, provider, store.clone(), store)
        .context("Failed to build agent services")
}

/// A token cancelled on Ctrl-C.
pub fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted; shutting down");
            trigger.cancel();
        }
    });
    cancel
}

/// The post named on the command line, else the configured one.
pub fn target_post(config: &AppConfig, post_id: Option<String>) -> anyhow::Result<String> {
    post_id
        .filter(|p| !p.trim().is_empty())
        .or_else(|| config.engagement.post_id().map(String::from))
        .context("No post id given (--post-id) or configured (engagement.post_id)")
}
