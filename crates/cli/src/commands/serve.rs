//! `moltpilot serve`: HTTP gateway plus the background scheduler.

use std::sync::Arc;

use anyhow::Context;
use moltpilot_config::AppConfig;
use moltpilot_gateway::GatewayState;
use moltpilot_workflow::Scheduler;

pub async fn run(config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let services = super::runtime(&config).await?;
    let shutdown = super::interrupt_token();

    let scheduler = Scheduler::new(
        services.engagement.clone(),
        services.heartbeat.clone(),
        config.engagement.clone(),
        config.heartbeat.clone(),
    );
    let loops = scheduler.start(shutdown.child_token());

    let state = Arc::new(GatewayState::new(
        services,
        scheduler.status(),
        config.engagement.post_id().map(String::from),
        shutdown.clone(),
    ));

    let addr = format!(
        "{}:{}",
        config.gateway.host,
        port.unwrap_or(config.gateway.port)
    );
    println!("moltpilot gateway");
    println!("   Listening:   {addr}");
    println!(
        "   Engagement:  {}",
        match (config.engagement.enabled, config.engagement.post_id()) {
            (false, _) => "disabled".to_string(),
            (true, Some(post)) => format!("every {}m on {post}", config.engagement.interval_minutes),
            (true, None) => "idle (no post id)".to_string(),
        }
    );
    println!(
        "   Heartbeat:   {}",
        if config.heartbeat.enabled { "enabled" } else { "disabled" }
    );

    let served = moltpilot_gateway::serve(&addr, state)
        .await
        .with_context(|| format!("Gateway on {addr} failed"));

    // Stop the loops whether the server exited cleanly or not.
    shutdown.cancel();
    for handle in loops {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Scheduler task ended abnormally");
        }
    }
    served
}
