//! `moltpilot credential set`: store the platform API key.

use moltpilot_config::AppConfig;
use moltpilot_gateway::CredentialView;

pub async fn set(
    config: AppConfig,
    api_key: String,
    handle: Option<String>,
    claim_url: Option<String>,
) -> anyhow::Result<()> {
    let services = super::runtime(&config).await?;
    let credential = services
        .store_credential(handle.as_deref(), claim_url.as_deref(), &api_key)
        .await?;

    let view = CredentialView::from(&credential);
    println!("Credential stored.");
    println!("  Handle:  {}", view.handle.as_deref().unwrap_or("-"));
    println!("  API key: {}", view.api_key);
    Ok(())
}
