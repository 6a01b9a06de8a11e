//! `moltpilot thread`: print a post's thread snapshot.

use moltpilot_config::AppConfig;

pub async fn run(config: AppConfig, post_id: Option<String>) -> anyhow::Result<()> {
    let post_id = super::target_post(&config, post_id)?;
    let services = super::runtime(&config).await?;
    let cancel = super::interrupt_token();

    let thread = services.compose.fetch_thread(&post_id, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&thread)?);
    Ok(())
}
