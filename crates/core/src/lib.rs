//! # moltpilot core
//!
//! Domain types, traits, and error definitions for the moltpilot agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that every other crate implements against.
//!
//! Every collaborator the agent talks to is a trait here:
//! - [`Provider`]: the chat-completions backend
//! - [`Tool`] / [`ToolRegistry`]: what the model may call during a tool loop
//! - [`CredentialStore`]: the agent's bearer token and heartbeat bookkeeping
//! - [`Ledger`]: the append-only record of comments already engaged
//!
//! Implementations live in their own crates and tests swap in mocks.

pub mod credential;
pub mod error;
pub mod ledger;
pub mod message;
pub mod provider;
pub mod thread;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use credential::{AgentCredential, CredentialStore};
pub use error::{Error, Result};
pub use ledger::{Ledger, LedgerEntry};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition};
pub use thread::{FeedPost, ThreadSnapshot};
pub use tool::{ResolvedTool, Tool, ToolContext, ToolRegistry};
