//! `moltpilot engage`: one engagement run over a post's comments.

use moltpilot_config::AppConfig;

pub async fn run(config: AppConfig, post_id: Option<String>) -> anyhow::Result<()> {
    let post_id = super::target_post(&config, post_id)?;
    let services = super::runtime(&config).await?;
    let cancel = super::interrupt_token();

    let summary = services.engagement.run_once(&post_id, &cancel).await?;
    println!("{summary}");
    if summary.rate_limited {
        println!("Stopped early: the platform rate-limited us (429).");
    }
    Ok(())
}
