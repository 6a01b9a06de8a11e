//! `moltpilot preview`: draft a post from a feed page.

use moltpilot_config::AppConfig;

pub async fn run(
    config: AppConfig,
    submolt: Option<String>,
    take: i64,
    context: String,
) -> anyhow::Result<()> {
    let services = super::runtime(&config).await?;
    let cancel = super::interrupt_token();

    let preview = services
        .compose
        .preview(submolt.as_deref(), take, &context, &cancel)
        .await?;
    tracing::debug!(debug = %preview.debug, "Feed fetch");
    print!("{}", preview.draft);
    Ok(())
}
