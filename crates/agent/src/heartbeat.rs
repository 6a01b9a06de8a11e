//! Periodic check-in: the model fetches the platform's heartbeat checklist
//! and executes it with the HTTP tools.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use moltpilot_core::credential::CredentialStore;
use moltpilot_core::error::Result;
use moltpilot_core::message::Message;
use moltpilot_core::tool::ToolContext;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::join::redact;
use crate::loop_runner::ToolLoop;
use crate::prompts;

pub const DEFAULT_MIN_INTERVAL_HOURS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatStatus {
    /// The previous heartbeat is still fresh.
    Skipped,
    /// The model reported `HEARTBEAT_DONE`.
    Completed,
    /// The loop ended without the completion marker.
    Unfinished,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatOutcome {
    pub status: HeartbeatStatus,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_at: Option<DateTime<Utc>>,
}

impl fmt::Display for HeartbeatOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub struct HeartbeatRunner {
    tool_loop: Arc<ToolLoop>,
    credentials: Arc<dyn CredentialStore>,
    min_interval: Duration,
}

impl HeartbeatRunner {
    pub fn new(tool_loop: Arc<ToolLoop>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            tool_loop,
            credentials,
            min_interval: Duration::hours(i64::from(DEFAULT_MIN_INTERVAL_HOURS)),
        }
    }

    pub fn with_min_interval_hours(mut self, hours: u32) -> Self {
        self.min_interval = Duration::hours(i64::from(hours));
        self
    }

    /// Run one heartbeat unless the last successful one is still fresh.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<HeartbeatOutcome> {
        self.run_at(Utc::now(), cancel).await
    }

    async fn run_at(&self, now: DateTime<Utc>, cancel: &CancellationToken) -> Result<HeartbeatOutcome> {
        let credential = self.credentials.load().await?;
        let bearer = credential.require_bearer()?.to_string();

        if let Some(last) = credential.last_heartbeat_at {
            if now - last < self.min_interval {
                let next = last + self.min_interval;
                info!(next_at = %next, "Heartbeat not due");
                return Ok(HeartbeatOutcome {
                    status: HeartbeatStatus::Skipped,
                    text: format!(
                        "Heartbeat not needed yet. Next at {}.",
                        next.format("%Y-%m-%d %H:%M:%SZ")
                    ),
                    next_at: Some(next),
                });
            }
        }

        info!("Running heartbeat");
        let mut messages = vec![
            Message::system(prompts::HEARTBEAT_SYSTEM),
            Message::user(prompts::HEARTBEAT_USER),
        ];
        let ctx = ToolContext::new(Some(bearer.clone()), cancel.clone());
        let text = self.tool_loop.run(&mut messages, &ctx).await?.into_text();
        let text = redact(text, Some(bearer.as_str()));

        let done = text
            .to_ascii_uppercase()
            .contains(prompts::HEARTBEAT_DONE);
        if done {
            self.credentials.set_last_heartbeat(Utc::now()).await?;
            info!("Heartbeat completed");
        } else {
            warn!("Heartbeat ended without the completion marker");
        }

        Ok(HeartbeatOutcome {
            status: if done {
                HeartbeatStatus::Completed
            } else {
                HeartbeatStatus::Unfinished
            },
            text,
            next_at: None,
        })
    }
}
