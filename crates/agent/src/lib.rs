//! The moltpilot agent: tool loop, composing, and comment engagement.
//!
//! - [`ToolLoop`] lets the model drive `http_get` / `http_post_json` until it
//!   answers or its step budget runs out (join and heartbeat flows).
//! - [`ComposeService`] turns a feed page into a normalized post draft and
//!   performs the operator's publish/comment/upvote actions.
//! - [`EngagementOrchestrator`] replies once to every new top-level comment
//!   on a post, deduplicated by the ledger and stopped by rate limits.

pub mod compose;
pub mod compose_service;
pub mod engage;
pub mod heartbeat;
pub mod join;
pub mod loop_runner;
pub mod platform;
pub mod prompts;
pub mod services;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use compose_service::{ComposeService, DraftPreview};
pub use engage::{EngagementOrchestrator, EngagementSummary};
pub use heartbeat::{HeartbeatOutcome, HeartbeatRunner, HeartbeatStatus};
pub use join::JoinService;
pub use loop_runner::{LoopOutcome, ToolLoop};
pub use platform::{PlatformClient, SubmissionOutcome};
pub use services::AgentServices;
