//! Typed access to the content platform's REST surface.
//!
//! URLs are built from the configured base URL and path templates; every
//! call goes through the [`NetworkGateway`], so allow-listing and bearer
//! handling are the gateway's job, not this module's.

use std::sync::Arc;

use moltpilot_config::PlatformConfig;
use moltpilot_core::error::{Error, Result};
use moltpilot_core::thread::ThreadSnapshot;
use moltpilot_tools::{HttpReply, NetworkGateway};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Upper bound for feed page sizes.
pub const MAX_FEED_LIMIT: u32 = 50;

/// Result of a mutating call, rendered as `Status: {code}\n{body}`.
///
/// Upstream rejections are carried as outcomes rather than errors so the
/// caller sees the status text, the way the model sees tool output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionOutcome {
    pub status: u16,
    pub text: String,
}

impl SubmissionOutcome {
    /// Turn an upstream rejection into an outcome; other failures stay errors.
    pub fn lenient(result: Result<HttpReply>) -> Result<Self> {
        match result {
            Ok(reply) => Ok(reply.into()),
            Err(Error::Upstream { status, body }) => Ok(Self {
                status,
                text: format!("Status: {status}\n{body}"),
            }),
            Err(e) => Err(e),
        }
    }

    /// Rate limited by status, or by a `429` anywhere in the text.
    pub fn is_rate_limited(&self) -> bool {
        self.status == 429 || self.text.contains("429")
    }
}

impl From<HttpReply> for SubmissionOutcome {
    fn from(reply: HttpReply) -> Self {
        Self {
            status: reply.status,
            text: reply.to_string(),
        }
    }
}

#[derive(Serialize)]
struct CreatePost<'a> {
    title: &'a str,
    content: &'a str,
    submolt: &'a str,
}

#[derive(Serialize)]
struct CreateComment<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<&'a str>,
}

/// Platform client bound to one configuration.
#[derive(Clone)]
pub struct PlatformClient {
    gateway: Arc<NetworkGateway>,
    config: PlatformConfig,
}

impl PlatformClient {
    pub fn new(gateway: Arc<NetworkGateway>, config: PlatformConfig) -> Self {
        Self { gateway, config }
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Feed URL for a community (when `submolt` is non-blank) or the global feed.
    /// `limit` is clamped to `1..=50`.
    pub fn feed_url(&self, submolt: Option<&str>, limit: u32) -> String {
        let limit = limit.clamp(1, MAX_FEED_LIMIT).to_string();
        match submolt.map(crate::compose::community_slug).filter(|s| !s.is_empty()) {
            Some(slug) => {
                let path = self
                    .config
                    .community_feed_path
                    .replace("{submolt}", &urlencoding::encode(&slug))
                    .replace("{limit}", &limit);
                format!("{}{path}", self.base())
            }
            None => format!(
                "{}{}",
                self.base(),
                self.config.feed_path.replace("{limit}", &limit)
            ),
        }
    }

    pub fn thread_url(&self, post_id: &str) -> String {
        let path = self
            .config
            .thread_path
            .replace("{postId}", &urlencoding::encode(post_id));
        format!("{}{path}", self.base())
    }

    pub fn create_post_url(&self) -> String {
        format!("{}{}", self.base(), self.config.create_post_path)
    }

    pub fn comments_url(&self, post_id: &str) -> String {
        format!(
            "{}/api/v1/posts/{}/comments",
            self.base(),
            urlencoding::encode(post_id)
        )
    }

    pub fn upvote_post_url(&self, post_id: &str) -> String {
        format!(
            "{}/api/v1/posts/{}/upvote",
            self.base(),
            urlencoding::encode(post_id)
        )
    }

    pub fn upvote_comment_url(&self, comment_id: &str) -> String {
        format!(
            "{}/api/v1/comments/{}/upvote",
            self.base(),
            urlencoding::encode(comment_id)
        )
    }

    /// Fetch a raw feed page.
    pub async fn fetch_feed(
        &self,
        url: &str,
        bearer: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        self.gateway.get(url, Some(bearer), cancel).await
    }

    /// Fetch and decode a thread snapshot.
    ///
    /// Fetch failures propagate as-is. An undecodable body, `success != true`,
    /// or a missing post id is reported as an upstream failure.
    pub async fn fetch_thread(
        &self,
        post_id: &str,
        bearer: &str,
        cancel: &CancellationToken,
    ) -> Result<ThreadSnapshot> {
        let url = self.thread_url(post_id);
        let reply = self.gateway.get(&url, Some(bearer), cancel).await?;

        let failed = || Error::Upstream {
            status: reply.status,
            body: "failed to fetch post thread".into(),
        };

        let thread: ThreadSnapshot = match serde_json::from_str(&reply.body) {
            Ok(thread) => thread,
            Err(e) => {
                warn!(post_id, error = %e, "Thread body did not decode");
                return Err(failed());
            }
        };

        if !thread.success || thread.post_id().is_none() {
            warn!(post_id, success = thread.success, "Thread fetch unsuccessful");
            return Err(failed());
        }

        debug!(post_id, comments = thread.comments.len(), "Fetched thread");
        Ok(thread)
    }

    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        submolt: &str,
        bearer: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        let body = serde_json::to_value(CreatePost {
            title,
            content,
            submolt,
        })?;
        self.gateway
            .post(&self.create_post_url(), &body, None, Some(bearer), cancel)
            .await
    }

    pub async fn comment(
        &self,
        post_id: &str,
        content: &str,
        parent_id: Option<&str>,
        bearer: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        let body = serde_json::to_value(CreateComment {
            content,
            parent_id: parent_id.filter(|p| !p.trim().is_empty()),
        })?;
        self.gateway
            .post(&self.comments_url(post_id), &body, None, Some(bearer), cancel)
            .await
    }

    pub async fn upvote_post(
        &self,
        post_id: &str,
        bearer: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        self.gateway
            .post(
                &self.upvote_post_url(post_id),
                &serde_json::json!({}),
                None,
                Some(bearer),
                cancel,
            )
            .await
    }

    pub async fn upvote_comment(
        &self,
        comment_id: &str,
        bearer: &str,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        self.gateway
            .post(
                &self.upvote_comment_url(comment_id),
                &serde_json::json!({}),
                None,
                Some(bearer),
                cancel,
            )
            .await
    }
}
