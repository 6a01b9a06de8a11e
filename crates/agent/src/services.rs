//! Wiring: every agent service built once from configuration and shared.

use std::sync::Arc;

use moltpilot_config::AppConfig;
use moltpilot_core::credential::{AgentCredential, CredentialStore};
use moltpilot_core::error::{Error, Result};
use moltpilot_core::ledger::Ledger;
use moltpilot_core::provider::Provider;
use moltpilot_tools::NetworkGateway;

use crate::compose_service::ComposeService;
use crate::engage::EngagementOrchestrator;
use crate::heartbeat::HeartbeatRunner;
use crate::join::JoinService;
use crate::loop_runner::ToolLoop;
use crate::platform::PlatformClient;

/// The agent's services over one gateway, provider and store.
#[derive(Clone)]
pub struct AgentServices {
    pub compose: Arc<ComposeService>,
    pub engagement: Arc<EngagementOrchestrator>,
    pub join: Arc<JoinService>,
    pub heartbeat: Arc<HeartbeatRunner>,
    pub credentials: Arc<dyn CredentialStore>,
    pub ledger: Arc<dyn Ledger>,
}

impl AgentServices {
    pub fn build(
        config: &AppConfig,
        gateway: Arc<NetworkGateway>,
        provider: Arc<dyn Provider>,
        credentials: Arc<dyn CredentialStore>,
        ledger: Arc<dyn Ledger>,
    ) -> Result<Self> {
        let platform = PlatformClient::new(gateway.clone(), config.platform.clone());
        let tools = Arc::new(moltpilot_tools::default_registry(gateway)?);
        let tool_loop = Arc::new(
            ToolLoop::new(provider.clone(), tools, config.provider.model.clone())
                .with_max_steps(config.agent.max_steps)
                .with_temperature(config.provider.temperature),
        );

        Ok(Self {
            compose: Arc::new(ComposeService::new(
                platform.clone(),
                provider.clone(),
                credentials.clone(),
                config.provider.clone(),
            )),
            engagement: Arc::new(EngagementOrchestrator::new(
                platform,
                provider,
                credentials.clone(),
                ledger.clone(),
                config.provider.clone(),
            )),
            join: Arc::new(JoinService::new(tool_loop.clone(), credentials.clone())),
            heartbeat: Arc::new(
                HeartbeatRunner::new(tool_loop, credentials.clone())
                    .with_min_interval_hours(config.heartbeat.min_interval_hours),
            ),
            credentials,
            ledger,
        })
    }

    /// Store an API key, plus the handle and claim link when given.
    /// Returns the credential as persisted.
    pub async fn store_credential(
        &self,
        handle: Option<&str>,
        claim_url: Option<&str>,
        api_key: &str,
    ) -> Result<AgentCredential> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::Validation("api_key is required".into()));
        }
        let handle = handle.map(str::trim).filter(|h| !h.is_empty());
        let claim_url = claim_url.map(str::trim).filter(|c| !c.is_empty());

        match handle {
            Some(handle) => {
                let existing = self.credentials.load().await?;
                let claim = claim_url
                    .map(String::from)
                    .or(existing.claim_url)
                    .unwrap_or_default();
                self.credentials
                    .save_registration(handle, &claim, api_key)
                    .await?;
            }
            None => {
                self.credentials.save_api_key(api_key).await?;
                if let Some(claim) = claim_url {
                    self.credentials.save_claim(claim).await?;
                }
            }
        }
        Ok(self.credentials.load().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use moltpilot_memory::InMemoryStore;

    fn services(store: &InMemoryStore) -> AgentServices {
        let gateway = Arc::new(NetworkGateway::new(Arc::new(ScriptedTransport::new())));
        AgentServices::build(
            &AppConfig::default(),
            gateway,
            Arc::new(SequentialMockProvider::new(vec![])),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn store_key_then_registration() {
        let store = InMemoryStore::new();
        let services = services(&store);

        let cred = services
            .store_credential(None, Some("https://www.moltbook.com/claim/x"), " sk-1 ")
            .await
            .unwrap();
        assert_eq!(cred.bearer(), Some("sk-1"));
        assert_eq!(cred.claim_url.as_deref(), Some("https://www.moltbook.com/claim/x"));

        // a handle without a new claim link keeps the stored one
        let cred = services
            .store_credential(Some("pilot"), None, "sk-2")
            .await
            .unwrap();
        assert_eq!(cred.own_handle(), Some("pilot"));
        assert_eq!(cred.bearer(), Some("sk-2"));
        assert_eq!(cred.claim_url.as_deref(), Some("https://www.moltbook.com/claim/x"));
    }

    #[tokio::test]
    async fn blank_key_rejected() {
        let store = InMemoryStore::new();
        let err = services(&store)
            .store_credential(Some("pilot"), None, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
