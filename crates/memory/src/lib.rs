//! Storage for moltpilot: the agent credential and the dedup ledger.
//!
//! Both backends implement `CredentialStore` and `Ledger` from
//! `moltpilot-core`. SQLite is the durable default; the in-memory store
//! backs tests and throwaway runs.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
