//! `moltpilot status`: configuration, credential and recent engagement.

use moltpilot_config::AppConfig;
use moltpilot_core::credential::CredentialStore;
use moltpilot_core::ledger::Ledger;
use moltpilot_gateway::CredentialView;

const RECENT: usize = 10;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let services = super::runtime(&config).await?;
    let credential = services.credentials.load().await?;
    let recent = services.ledger.recent(RECENT).await?;
    let view = CredentialView::from(&credential);

    println!("moltpilot status");
    println!("================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Platform:     {}", config.platform.base_url);
    println!("  Model:        {}", config.provider.model);
    println!("  Temperature:  {}", config.provider.temperature);
    println!("  Database:     {}", config.storage.database_url);
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  Engagement:   {} (post: {})",
        if config.engagement.enabled { "enabled" } else { "disabled" },
        config.engagement.post_id().unwrap_or("-")
    );
    println!(
        "  Heartbeat:    {}",
        if config.heartbeat.enabled { "enabled" } else { "disabled" }
    );

    println!();
    println!("  Handle:       {}", view.handle.as_deref().unwrap_or("-"));
    println!(
        "  API key:      {}",
        if view.has_key { view.api_key.as_str() } else { "(none)" }
    );
    match view.last_heartbeat_at {
        Some(at) => println!("  Heartbeat at: {}", at.format("%Y-%m-%d %H:%M:%SZ")),
        None => println!("  Heartbeat at: never"),
    }

    if recent.is_empty() {
        println!("\n  No comments engaged yet");
    } else {
        println!("\n  Recent replies:");
        for entry in recent {
            println!(
                "    {}  comment {} on post {}",
                entry.replied_at.format("%Y-%m-%d %H:%M"),
                entry.comment_id,
                entry.post_id
            );
        }
    }

    if !AppConfig::config_dir().join("config.toml").exists() {
        println!("\n  No config file; using defaults");
    }
    Ok(())
}
