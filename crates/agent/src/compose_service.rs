//! Operator-facing compose operations: preview, publish, comment, upvote.

use std::sync::Arc;

use moltpilot_config::ProviderConfig;
use moltpilot_core::credential::CredentialStore;
use moltpilot_core::error::{Error, Result};
use moltpilot_core::message::Message;
use moltpilot_core::provider::{Provider, ProviderRequest};
use moltpilot_core::thread::ThreadSnapshot;
use moltpilot_tools::cap_text;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::compose::{self, build_feed_digest, normalize_draft, parse_title_and_content};
use crate::platform::{MAX_FEED_LIMIT, PlatformClient, SubmissionOutcome};
use crate::prompts;

pub const DEFAULT_TAKE: u32 = 15;
const DIGEST_CHARS_PER_POST: usize = 240;
const DIGEST_TOTAL_CHARS: usize = 6000;
const DEBUG_RAW_CHARS: usize = 2000;

/// A normalized draft plus the trace of how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct DraftPreview {
    pub draft: String,
    pub debug: String,
}

/// Load the stored bearer token or fail with the actionable auth error.
pub(crate) async fn stored_bearer(store: &dyn CredentialStore) -> Result<String> {
    let credential = store.load().await?;
    Ok(credential.require_bearer()?.to_string())
}

/// Single-shot chat completion without tools.
pub(crate) async fn complete_text(
    provider: &dyn Provider,
    settings: &ProviderConfig,
    system: String,
    user: String,
    cancel: &CancellationToken,
) -> Result<String> {
    let request = ProviderRequest::chat(
        settings.model.clone(),
        vec![Message::system(system), Message::user(user)],
    )
    .with_temperature(settings.temperature);

    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        response = provider.complete(request) => response?,
    };
    Ok(response.message.text().to_string())
}

fn resolve_take(take: i64) -> u32 {
    if take <= 0 {
        DEFAULT_TAKE
    } else {
        take.min(i64::from(MAX_FEED_LIMIT)) as u32
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::Validation(format!("{what} is required")))
    } else {
        Ok(())
    }
}

#[derive(Clone)]
pub struct ComposeService {
    platform: PlatformClient,
    provider: Arc<dyn Provider>,
    credentials: Arc<dyn CredentialStore>,
    settings: ProviderConfig,
}

impl ComposeService {
    pub fn new(
        platform: PlatformClient,
        provider: Arc<dyn Provider>,
        credentials: Arc<dyn CredentialStore>,
        settings: ProviderConfig,
    ) -> Self {
        Self {
            platform,
            provider,
            credentials,
            settings,
        }
    }

    /// Fetch a feed page, digest it, and ask the model for a post draft.
    pub async fn preview(
        &self,
        submolt: Option<&str>,
        take: i64,
        user_context: &str,
        cancel: &CancellationToken,
    ) -> Result<DraftPreview> {
        let bearer = stored_bearer(self.credentials.as_ref()).await?;
        let limit = resolve_take(take);
        let url = self.platform.feed_url(submolt, limit);
        info!(url = %url, "Composing draft preview");

        let reply = self.platform.fetch_feed(&url, &bearer, cancel).await?;
        let digest = build_feed_digest(
            &reply.body,
            limit as usize,
            DIGEST_CHARS_PER_POST,
            DIGEST_TOTAL_CHARS,
        );
        debug!(digest_len = digest.chars().count(), "Feed digest built");

        let raw = complete_text(
            self.provider.as_ref(),
            &self.settings,
            prompts::DRAFT_SYSTEM.to_string(),
            prompts::draft_user(user_context.trim(), &digest),
            cancel,
        )
        .await?;

        let debug = format!(
            "FETCH {url}\n--- FEED DIGEST (len={}) ---\n{digest}\n\n--- RAW FEED (trimmed) ---\n{}",
            digest.chars().count(),
            cap_text(&reply.body, DEBUG_RAW_CHARS)
        );
        Ok(DraftPreview {
            draft: normalize_draft(&raw),
            debug,
        })
    }

    /// Publish a draft; the first non-blank line becomes the title.
    pub async fn publish(
        &self,
        submolt: Option<&str>,
        draft: &str,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome> {
        require(draft, "draft")?;
        let bearer = stored_bearer(self.credentials.as_ref()).await?;
        let (title, content) = parse_title_and_content(draft);
        let slug = compose::community_slug(submolt.unwrap_or_default());
        info!(title = %title, submolt = %slug, "Publishing post");

        SubmissionOutcome::lenient(
            self.platform
                .create_post(&title, &content, &slug, &bearer, cancel)
                .await,
        )
    }

    pub async fn comment(
        &self,
        post_id: &str,
        content: &str,
        parent_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome> {
        require(post_id, "post_id")?;
        require(content, "content")?;
        let bearer = stored_bearer(self.credentials.as_ref()).await?;
        SubmissionOutcome::lenient(
            self.platform
                .comment(post_id.trim(), content, parent_id, &bearer, cancel)
                .await,
        )
    }

    pub async fn upvote_post(
        &self,
        post_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome> {
        require(post_id, "post_id")?;
        let bearer = stored_bearer(self.credentials.as_ref()).await?;
        SubmissionOutcome::lenient(self.platform.upvote_post(post_id.trim(), &bearer, cancel).await)
    }

    pub async fn upvote_comment(
        &self,
        comment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<SubmissionOutcome> {
        require(comment_id, "comment_id")?;
        let bearer = stored_bearer(self.credentials.as_ref()).await?;
        SubmissionOutcome::lenient(
            self.platform
                .upvote_comment(comment_id.trim(), &bearer, cancel)
                .await,
        )
    }

    pub async fn fetch_thread(
        &self,
        post_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ThreadSnapshot> {
        require(post_id, "post_id")?;
        let bearer = stored_bearer(self.credentials.as_ref()).await?;
        self.platform.fetch_thread(post_id.trim(), &bearer, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use moltpilot_memory::InMemoryStore;
    use moltpilot_tools::HttpMethod;

    fn service(
        transport: ScriptedTransport,
        provider: SequentialMockProvider,
        store: InMemoryStore,
    ) -> (ComposeService, Arc<ScriptedTransport>, Arc<SequentialMockProvider>) {
        let (platform, transport) = platform(transport);
        let provider = Arc::new(provider);
        let service = ComposeService::new(
            platform,
            provider.clone(),
            Arc::new(store),
            ProviderConfig::default(),
        );
        (service, transport, provider)
    }

    #[test]
    fn take_resolution() {
        assert_eq!(resolve_take(0), 15);
        assert_eq!(resolve_take(-3), 15);
        assert_eq!(resolve_take(7), 7);
        assert_eq!(resolve_take(500), 50);
    }

    #[tokio::test]
    async fn preview_digests_feed_and_normalizes() {
        let feed = r#"{"posts":[{"title":"Tides","content":"salt and wire","author":{"name":"kelp"}}]}"#;
        let (service, transport, provider) = service(
            ScriptedTransport::new().route(HttpMethod::Get, "/api/v1/posts?submolt=ai", 200, feed),
            SequentialMockProvider::single_text("## **Signal Drift**\n\nBody here."),
            InMemoryStore::with_credential("sk-test", None),
        );

        let preview = service
            .preview(Some("m/ai"), 0, "  my lens  ", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(preview.draft, "Signal Drift\n\nBody here.\n");
        assert!(preview.debug.starts_with(
            "FETCH https://www.moltbook.com/api/v1/posts?submolt=ai&limit=15\n--- FEED DIGEST (len="
        ));
        assert!(preview.debug.contains("- Tides (by kelp)\n  salt and wire"));
        assert!(preview.debug.ends_with(feed));

        let sent = &transport.requests()[0];
        assert_eq!(sent.header("Authorization"), Some("Bearer sk-test"));

        let request = &provider.requests()[0];
        assert!(request.tools.is_empty());
        assert!(request.messages[1].text().contains("my lens\n"));
    }

    #[tokio::test]
    async fn preview_digests_feed_larger_than_display_cap() {
        let posts: Vec<_> = (0..15)
            .map(|i| {
                serde_json::json!({
                    "title": format!("Post {i}"),
                    "content": "deep water ".repeat(40),
                    "author": { "name": "kelp" },
                })
            })
            .collect();
        let feed = serde_json::json!({ "posts": posts }).to_string();
        assert!(feed.chars().count() > moltpilot_tools::MAX_BODY_CHARS);

        let (service, _, provider) = service(
            ScriptedTransport::new().route(HttpMethod::Get, "/api/v1/posts", 200, feed),
            SequentialMockProvider::single_text("Title\n\nBody"),
            InMemoryStore::with_credential("sk", None),
        );
        let preview = service
            .preview(None, 0, "", &CancellationToken::new())
            .await
            .unwrap();

        assert!(preview.debug.contains("- Post 0 (by kelp)"));
        assert!(preview.debug.contains("- Post 14 (by kelp)"));
        let requests = provider.requests();
        let prompt = requests[0].messages[1].text();
        assert!(prompt.contains("- Post 14 (by kelp)"));
        assert!(!prompt.contains(r#"{"posts""#));
    }

    #[tokio::test]
    async fn preview_requires_credential() {
        let (service, transport, provider) = service(
            ScriptedTransport::new(),
            SequentialMockProvider::single_text("never"),
            InMemoryStore::new(),
        );
        let err = service
            .preview(None, 10, "", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), Error::NO_CREDENTIAL);
        assert!(transport.requests().is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn publish_sends_parsed_title_and_slug() {
        let (service, transport, _) = service(
            ScriptedTransport::new().route(HttpMethod::Post, "/api/v1/posts", 201, r#"{"success":true}"#),
            SequentialMockProvider::new(vec![]),
            InMemoryStore::with_credential("sk", None),
        );

        let outcome = service
            .publish(Some("/m/General"), "Title\n\nLine one", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.status, 201);
        assert_eq!(outcome.text, "Status: 201\n{\"success\":true}");

        let body: serde_json::Value =
            serde_json::from_str(transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"title": "Title", "content": "Line one", "submolt": "General"})
        );
    }

    #[tokio::test]
    async fn upstream_rejection_is_reported_not_raised() {
        let (service, _, _) = service(
            ScriptedTransport::new().route(HttpMethod::Post, "/upvote", 429, "slow down"),
            SequentialMockProvider::new(vec![]),
            InMemoryStore::with_credential("sk", None),
        );
        let outcome = service
            .upvote_post("p1", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.text, "Status: 429\nslow down");
        assert!(outcome.is_rate_limited());
    }

    #[tokio::test]
    async fn blank_inputs_are_validation_errors() {
        let (service, transport, _) = service(
            ScriptedTransport::new(),
            SequentialMockProvider::new(vec![]),
            InMemoryStore::with_credential("sk", None),
        );
        let cancel = CancellationToken::new();
        assert!(matches!(
            service.comment(" ", "hi", None, &cancel).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.comment("p1", "", None, &cancel).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            service.upvote_comment("", &cancel).await,
            Err(Error::Validation(_))
        ));
        assert!(transport.requests().is_empty());
    }
}
