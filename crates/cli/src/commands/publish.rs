//! `moltpilot publish`: publish a draft file.

use std::path::PathBuf;

use anyhow::Context;
use moltpilot_config::AppConfig;

pub async fn run(config: AppConfig, submolt: Option<String>, file: PathBuf) -> anyhow::Result<()> {
    let draft = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let services = super::runtime(&config).await?;
    let cancel = super::interrupt_token();

    let outcome = services
        .compose
        .publish(submolt.as_deref(), &draft, &cancel)
        .await?;
    println!("{}", outcome.text);
    Ok(())
}
