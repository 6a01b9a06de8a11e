//! In-memory store: useful for testing and throwaway sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moltpilot_core::credential::{AgentCredential, CredentialStore};
use moltpilot_core::error::StorageError;
use moltpilot_core::ledger::{Ledger, LedgerEntry};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    credential: Option<AgentCredential>,
    ledger: Vec<LedgerEntry>,
}

/// Keeps the credential and ledger in process memory. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds a bearer token (and optionally a handle).
    pub fn with_credential(api_key: &str, handle: Option<&str>) -> Self {
        let now = Utc::now();
        let credential = AgentCredential {
            handle: handle.map(String::from),
            api_key: Some(api_key.to_string()),
            created_at: Some(now),
            updated_at: Some(now),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(State {
                credential: Some(credential),
                ledger: Vec::new(),
            })),
        }
    }

    async fn update(&self, apply: impl FnOnce(&mut AgentCredential)) {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let credential = state.credential.get_or_insert_with(|| AgentCredential {
            created_at: Some(now),
            ..Default::default()
        });
        apply(credential);
        credential.updated_at = Some(now);
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn load(&self) -> Result<AgentCredential, StorageError> {
        self.update(|_| {}).await;
        Ok(self.state.read().await.credential.clone().unwrap_or_default())
    }

    async fn save_api_key(&self, api_key: &str) -> Result<(), StorageError> {
        self.update(|c| c.api_key = Some(api_key.to_string())).await;
        Ok(())
    }

    async fn save_claim(&self, claim_url: &str) -> Result<(), StorageError> {
        self.update(|c| c.claim_url = Some(claim_url.to_string())).await;
        Ok(())
    }

    async fn save_registration(
        &self,
        handle: &str,
        claim_url: &str,
        api_key: &str,
    ) -> Result<(), StorageError> {
        self.update(|c| {
            c.handle = Some(handle.to_string());
            c.claim_url = Some(claim_url.to_string());
            c.api_key = Some(api_key.to_string());
        })
        .await;
        Ok(())
    }

    async fn set_last_heartbeat(&self, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.update(|c| c.last_heartbeat_at = Some(at)).await;
        Ok(())
    }
}

#[async_trait]
impl Ledger for InMemoryStore {
    async fn contains(&self, comment_id: &str) -> Result<bool, StorageError> {
        Ok(self
            .state
            .read()
            .await
            .ledger
            .iter()
            .any(|e| e.comment_id == comment_id))
    }

    async fn record(&self, entry: LedgerEntry) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        if state.ledger.iter().any(|e| e.comment_id == entry.comment_id) {
            return Ok(false);
        }
        state.ledger.push(entry);
        Ok(true)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LedgerEntry>, StorageError> {
        let state = self.state.read().await;
        let mut entries = state.ledger.clone();
        entries.sort_by(|a, b| b.replied_at.cmp(&a.replied_at));
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn credential_updates_apply() {
        let store = InMemoryStore::new();
        assert!(store.load().await.unwrap().bearer().is_none());

        store.save_registration("pilot", "claim", "sk").await.unwrap();
        store.save_claim("claim-2").await.unwrap();
        let cred = store.load().await.unwrap();
        assert_eq!(cred.own_handle(), Some("pilot"));
        assert_eq!(cred.claim_url.as_deref(), Some("claim-2"));
        assert_eq!(cred.bearer(), Some("sk"));
    }

    #[tokio::test]
    async fn ledger_dedups() {
        let store = InMemoryStore::with_credential("sk", None);
        assert!(store.record(LedgerEntry::now("c1", "p")).await.unwrap());
        assert!(!store.record(LedgerEntry::now("c1", "p")).await.unwrap());
        assert!(store.contains("c1").await.unwrap());
        assert!(!store.contains("c2").await.unwrap());
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryStore::new();
        let other = store.clone();
        other.record(LedgerEntry::now("c1", "p")).await.unwrap();
        assert_eq!(store.recent(5).await.unwrap().len(), 1);
    }
}
