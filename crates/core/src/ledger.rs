//! Dedup ledger: the append-only record of comments already engaged.
//!
//! Existence of an entry for a comment id is the only source of truth for
//! "already processed". Entries are never updated or deleted here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub comment_id: String,
    pub post_id: String,
    pub replied_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn now(comment_id: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            comment_id: comment_id.into(),
            post_id: post_id.into(),
            replied_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Authoritative existence check against committed state.
    async fn contains(&self, comment_id: &str) -> Result<bool, StorageError>;

    /// Append an entry. Returns `false` if the comment id was already recorded
    /// (a concurrent run won the race); that is not an error.
    async fn record(&self, entry: LedgerEntry) -> Result<bool, StorageError>;

    /// Most recent entries first.
    async fn recent(&self, limit: usize) -> Result<Vec<LedgerEntry>, StorageError>;
}
