//! SQLite store for the credential row and the dedup ledger.
//!
//! Two tables:
//! - `agent_state` holds exactly one row (id = 1)
//! - `processed_comments` is append-only, with a UNIQUE `comment_id`
//!
//! Ledger inserts use `INSERT OR IGNORE`, so a concurrent run that loses the
//! race sees `false` from `record` instead of an error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moltpilot_core::credential::{AgentCredential, CredentialStore};
use moltpilot_core::error::StorageError;
use moltpilot_core::ledger::{Ledger, LedgerEntry};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A production SQLite store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url`.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database.
    pub async fn new(url: &str) -> Result<Self, StorageError> {
        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StorageError::Storage(format!(
                            "Failed to create {}: {e}",
                            parent.display()
                        ))
                    })?;
                }
            }
        }

        // A single connection keeps an in-memory database alive and shared.
        let pool_options = if in_memory {
            SqlitePoolOptions::new().max_connections(1).min_connections(1)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_state (
                id                INTEGER PRIMARY KEY CHECK (id = 1),
                handle            TEXT,
                claim_url         TEXT,
                api_key           TEXT,
                last_heartbeat_at TEXT,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("agent_state table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_comments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                comment_id  TEXT NOT NULL UNIQUE,
                post_id     TEXT NOT NULL,
                replied_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("processed_comments table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_processed_comments_replied_at ON processed_comments(replied_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::MigrationFailed(format!("replied_at index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Make sure the single credential row exists.
    async fn ensure_row(&self) -> Result<(), StorageError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT OR IGNORE INTO agent_state (id, created_at, updated_at) VALUES (1, ?, ?)",
        )
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("ensure agent_state: {e}")))?;
        Ok(())
    }

    fn row_to_credential(row: &sqlx::sqlite::SqliteRow) -> Result<AgentCredential, StorageError> {
        let get_err = |col: &str, e: sqlx::Error| StorageError::QueryFailed(format!("{col}: {e}"));
        Ok(AgentCredential {
            handle: row.try_get("handle").map_err(|e| get_err("handle", e))?,
            claim_url: row.try_get("claim_url").map_err(|e| get_err("claim_url", e))?,
            api_key: row.try_get("api_key").map_err(|e| get_err("api_key", e))?,
            last_heartbeat_at: row
                .try_get::<Option<DateTime<Utc>>, _>("last_heartbeat_at")
                .map_err(|e| get_err("last_heartbeat_at", e))?,
            created_at: row
                .try_get::<Option<DateTime<Utc>>, _>("created_at")
                .map_err(|e| get_err("created_at", e))?,
            updated_at: row
                .try_get::<Option<DateTime<Utc>>, _>("updated_at")
                .map_err(|e| get_err("updated_at", e))?,
        })
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn load(&self) -> Result<AgentCredential, StorageError> {
        self.ensure_row().await?;
        let row = sqlx::query(
            "SELECT handle, claim_url, api_key, last_heartbeat_at, created_at, updated_at \
             FROM agent_state WHERE id = 1",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("load agent_state: {e}")))?;
        Self::row_to_credential(&row)
    }

    async fn save_api_key(&self, api_key: &str) -> Result<(), StorageError> {
        self.ensure_row().await?;
        sqlx::query("UPDATE agent_state SET api_key = ?, updated_at = ? WHERE id = 1")
            .bind(api_key)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("save api key: {e}")))?;
        Ok(())
    }

    async fn save_claim(&self, claim_url: &str) -> Result<(), StorageError> {
        self.ensure_row().await?;
        sqlx::query("UPDATE agent_state SET claim_url = ?, updated_at = ? WHERE id = 1")
            .bind(claim_url)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("save claim: {e}")))?;
        Ok(())
    }

    async fn save_registration(
        &self,
        handle: &str,
        claim_url: &str,
        api_key: &str,
    ) -> Result<(), StorageError> {
        self.ensure_row().await?;
        sqlx::query(
            "UPDATE agent_state SET handle = ?, claim_url = ?, api_key = ?, updated_at = ? WHERE id = 1",
        )
        .bind(handle)
        .bind(claim_url)
        .bind(api_key)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("save registration: {e}")))?;
        Ok(())
    }

    async fn set_last_heartbeat(&self, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.ensure_row().await?;
        sqlx::query("UPDATE agent_state SET last_heartbeat_at = ?, updated_at = ? WHERE id = 1")
            .bind(at)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("set heartbeat: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Ledger for SqliteStore {
    async fn contains(&self, comment_id: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM processed_comments WHERE comment_id = ? LIMIT 1")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("ledger lookup: {e}")))?;
        Ok(row.is_some())
    }

    async fn record(&self, entry: LedgerEntry) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO processed_comments (comment_id, post_id, replied_at) VALUES (?, ?, ?)",
        )
        .bind(&entry.comment_id)
        .bind(&entry.post_id)
        .bind(entry.replied_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("ledger insert: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<LedgerEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT comment_id, post_id, replied_at FROM processed_comments \
             ORDER BY replied_at DESC, id DESC LIMIT ?",
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("ledger recent: {e}")))?;

        rows.iter()
            .map(|row| {
                Ok(LedgerEntry {
                    comment_id: row
                        .try_get("comment_id")
                        .map_err(|e| StorageError::QueryFailed(e.to_string()))?,
                    post_id: row
                        .try_get("post_id")
                        .map_err(|e| StorageError::QueryFailed(e.to_string()))?,
                    replied_at: row
                        .try_get("replied_at")
                        .map_err(|e| StorageError::QueryFailed(e.to_string()))?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn fresh_store_has_empty_credential() {
        let store = test_store().await;
        let cred = store.load().await.unwrap();
        assert!(cred.bearer().is_none());
        assert!(cred.handle.is_none());
        assert!(cred.created_at.is_some());
    }

    #[tokio::test]
    async fn registration_roundtrip() {
        let store = test_store().await;
        store
            .save_registration("pilot", "https://www.moltbook.com/claim/x", "sk-1")
            .await
            .unwrap();
        let cred = store.load().await.unwrap();
        assert_eq!(cred.own_handle(), Some("pilot"));
        assert_eq!(cred.claim_url.as_deref(), Some("https://www.moltbook.com/claim/x"));
        assert_eq!(cred.bearer(), Some("sk-1"));

        store.save_api_key("sk-2").await.unwrap();
        assert_eq!(store.load().await.unwrap().bearer(), Some("sk-2"));
    }

    #[tokio::test]
    async fn heartbeat_timestamp_persists() {
        let store = test_store().await;
        let at = Utc::now() - Duration::hours(1);
        store.set_last_heartbeat(at).await.unwrap();
        let stored = store.load().await.unwrap().last_heartbeat_at.unwrap();
        assert_eq!(stored.timestamp(), at.timestamp());
    }

    #[tokio::test]
    async fn ledger_rejects_duplicate_insert() {
        let store = test_store().await;
        assert!(!store.contains("c1").await.unwrap());
        assert!(store.record(LedgerEntry::now("c1", "p1")).await.unwrap());
        assert!(!store.record(LedgerEntry::now("c1", "p1")).await.unwrap());
        assert!(store.contains("c1").await.unwrap());
        assert_eq!(store.recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let store = test_store().await;
        let base = Utc::now();
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            store
                .record(LedgerEntry {
                    comment_id: id.to_string(),
                    post_id: "p".into(),
                    replied_at: base + Duration::seconds(i as i64),
                })
                .await
                .unwrap();
        }
        let recent = store.recent(2).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|e| e.comment_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("nested/moltpilot.db").display());
        {
            let store = SqliteStore::new(&url).await.unwrap();
            store.record(LedgerEntry::now("c9", "p9")).await.unwrap();
            store.save_api_key("sk-file").await.unwrap();
        }
        let reopened = SqliteStore::new(&url).await.unwrap();
        assert!(reopened.contains("c9").await.unwrap());
        assert_eq!(reopened.load().await.unwrap().bearer(), Some("sk-file"));
    }
}
