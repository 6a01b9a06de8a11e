//! Agent credential: the single row of identity the agent acts with.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, StorageError};

/// The stored agent credential.
///
/// Only the join/claim and heartbeat flows mutate it; every authenticated
/// platform call reads the bearer from it.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AgentCredential {
    pub handle: Option<String>,
    pub claim_url: Option<String>,
    pub api_key: Option<String>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AgentCredential {
    /// The bearer token, if one is stored and non-blank.
    pub fn bearer(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// The bearer token, or the actionable auth error.
    pub fn require_bearer(&self) -> Result<&str, Error> {
        self.bearer().ok_or_else(Error::no_credential)
    }

    /// Our own handle, used to skip self-authored comments.
    pub fn own_handle(&self) -> Option<&str> {
        self.handle.as_deref().filter(|h| !h.trim().is_empty())
    }
}

impl std::fmt::Debug for AgentCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCredential")
            .field("handle", &self.handle)
            .field("claim_url", &self.claim_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("last_heartbeat_at", &self.last_heartbeat_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Durable storage for the agent credential.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the credential row, creating an empty one if none exists.
    async fn load(&self) -> Result<AgentCredential, StorageError>;

    async fn save_api_key(&self, api_key: &str) -> Result<(), StorageError>;

    async fn save_claim(&self, claim_url: &str) -> Result<(), StorageError>;

    async fn save_registration(
        &self,
        handle: &str,
        claim_url: &str,
        api_key: &str,
    ) -> Result<(), StorageError>;

    async fn set_last_heartbeat(&self, at: DateTime<Utc>) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_not_a_bearer() {
        let cred = AgentCredential {
            api_key: Some("   ".into()),
            ..Default::default()
        };
        assert!(cred.bearer().is_none());
        assert!(matches!(cred.require_bearer(), Err(Error::Auth(_))));
    }

    #[test]
    fn debug_redacts_key() {
        let cred = AgentCredential {
            handle: Some("pilot".into()),
            api_key: Some("moltbook_sk_secret".into()),
            ..Default::default()
        };
        let dbg = format!("{cred:?}");
        assert!(dbg.contains("pilot"));
        assert!(!dbg.contains("moltbook_sk_secret"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
