//! One engagement pass over a post's comment thread.
//!
//! Each top-level comment is either skipped (ours, or already in the ledger)
//! or processed: upvoted, answered with a model-written reply, then recorded.
//! A rate-limit signal stops the pass; unprocessed comments are picked up by
//! the next run.

use std::fmt;
use std::sync::Arc;

use moltpilot_config::ProviderConfig;
use moltpilot_core::credential::CredentialStore;
use moltpilot_core::error::{Error, Result};
use moltpilot_core::ledger::{Ledger, LedgerEntry};
use moltpilot_core::provider::Provider;
use moltpilot_core::thread::{ThreadComment, ThreadPost};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::compose_service::complete_text;
use crate::platform::{PlatformClient, SubmissionOutcome};
use crate::prompts;

const UNKNOWN_COMMENTER: &str = "someone";

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngagementSummary {
    pub replied: u32,
    pub upvoted: u32,
    pub skipped: u32,
    /// The run stopped early on a rate-limit signal.
    pub rate_limited: bool,
}

impl fmt::Display for EngagementSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Engage done. replied={}, upvoted={}, skipped={}",
            self.replied, self.upvoted, self.skipped
        )
    }
}

pub struct EngagementOrchestrator {
    platform: PlatformClient,
    provider: Arc<dyn Provider>,
    credentials: Arc<dyn CredentialStore>,
    ledger: Arc<dyn Ledger>,
    settings: ProviderConfig,
}

impl EngagementOrchestrator {
    pub fn new(
        platform: PlatformClient,
        provider: Arc<dyn Provider>,
        credentials: Arc<dyn CredentialStore>,
        ledger: Arc<dyn Ledger>,
        settings: ProviderConfig,
    ) -> Self {
        Self {
            platform,
            provider,
            credentials,
            ledger,
            settings,
        }
    }

    /// Engage every new top-level comment on `post_id` once.
    pub async fn run_once(
        &self,
        post_id: &str,
        cancel: &CancellationToken,
    ) -> Result<EngagementSummary> {
        let post_id = post_id.trim();
        if post_id.is_empty() {
            return Err(Error::Validation("post_id is required".into()));
        }

        let credential = self.credentials.load().await?;
        let bearer = credential.require_bearer()?;
        let own_handle = credential.own_handle();

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let thread = self.platform.fetch_thread(post_id, bearer, cancel).await?;
        let post = thread.post.clone().unwrap_or_default();
        let candidates = thread.candidates();
        info!(post_id, candidates = candidates.len(), "Engagement run started");

        let mut summary = EngagementSummary::default();
        for comment in candidates {
            let Some(comment_id) = comment.id() else {
                continue;
            };

            if is_own_comment(comment, own_handle) {
                debug!(comment_id, "Skipping own comment");
                summary.skipped += 1;
                continue;
            }
            if self.ledger.contains(comment_id).await? {
                debug!(comment_id, "Comment already handled");
                summary.skipped += 1;
                continue;
            }

            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let upvote = SubmissionOutcome::lenient(
                self.platform.upvote_comment(comment_id, bearer, cancel).await,
            )?;
            summary.upvoted += 1;

            let reply = self.draft_reply(&post, comment, own_handle, cancel).await?;

            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let submitted = match self
                .platform
                .comment(post_id, &reply, Some(comment_id), bearer, cancel)
                .await
            {
                Ok(response) => SubmissionOutcome::from(response),
                Err(Error::Upstream { status: 429, .. }) => {
                    warn!(post_id, comment_id, status = 429, "Reply rate limited; stopping run");
                    summary.rate_limited = true;
                    break;
                }
                Err(e) => return Err(e),
            };
            summary.replied += 1;

            if !self.ledger.record(LedgerEntry::now(comment_id, post_id)).await? {
                warn!(comment_id, "Comment was recorded concurrently");
            }

            if upvote.is_rate_limited() || submitted.is_rate_limited() {
                warn!(post_id, comment_id, "Rate limit signal; stopping run");
                summary.rate_limited = true;
                break;
            }
        }

        info!(
            post_id,
            replied = summary.replied,
            upvoted = summary.upvoted,
            skipped = summary.skipped,
            rate_limited = summary.rate_limited,
            "Engagement run finished"
        );
        Ok(summary)
    }

    /// Ask the model for a reply to one comment. The text is used verbatim.
    pub async fn draft_reply(
        &self,
        post: &ThreadPost,
        comment: &ThreadComment,
        own_handle: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let commenter = comment
            .author_name()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_COMMENTER);
        complete_text(
            self.provider.as_ref(),
            &self.settings,
            prompts::reply_system(own_handle),
            prompts::reply_user(&post.title, &post.content, commenter, &comment.content),
            cancel,
        )
        .await
    }
}

fn is_own_comment(comment: &ThreadComment, own_handle: Option<&str>) -> bool {
    match (comment.author_name(), own_handle) {
        (Some(author), Some(handle)) => author.trim().eq_ignore_ascii_case(handle.trim()),
        _ => false,
    }
}
