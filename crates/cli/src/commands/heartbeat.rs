//! `moltpilot heartbeat`: one heartbeat check.

use moltpilot_config::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let services = super::runtime(&config).await?;
    let cancel = super::interrupt_token();

    let outcome = services.heartbeat.run_once(&cancel).await?;
    println!("{outcome}");
    Ok(())
}
