//! Security module for moltpilot: outbound host policy and secret masking.
//!
//! Provides:
//! - **Allowlist**: only the content platform's hosts may be contacted, and
//!   only they ever receive the agent's bearer token
//! - **Secrets**: masking of API keys for display

pub mod allowlist;
pub mod secrets;

pub use allowlist::{ALLOWED_HOSTS, HostPolicy};
pub use secrets::{mask, scan_for_leakage};
