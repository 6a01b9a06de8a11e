//! The single choke point for outbound platform traffic.
//!
//! [`NetworkGateway`] enforces the host allow-list (redirects included),
//! injects the bearer for allow-listed hosts only, and races each request
//! against a cancellation token. Successful bodies come back whole so callers
//! can decode them; text headed for a model or a user is capped when it is
//! rendered. The wire work itself sits behind [`HttpTransport`] so tests can
//! script responses.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moltpilot_core::error::{Error, Result};
use moltpilot_security::HostPolicy;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

/// Maximum characters of a body rendered for a model or a user.
pub const MAX_BODY_CHARS: usize = 4000;

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 5;

/// Marker appended to text cut at a capture cap.
pub const TRIM_MARKER: &str = "\n...[trimmed]";

/// Cap `text` at `max_chars` characters, appending [`TRIM_MARKER`] when cut.
pub fn cap_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{TRIM_MARKER}", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// A fully prepared request: URL already normalized, headers final.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Raw HTTP round-trip. Implementations do not apply policy.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(concat!("moltpilot/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::custom(|attempt| {
                let refusal = redirect_refusal(attempt.url(), attempt.previous().len());
                match refusal {
                    Some(reason) => attempt.error(reason),
                    None => attempt.follow(),
                }
            }))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

/// Why a redirect to `target` after `hops` earlier hops must not be followed.
fn redirect_refusal(target: &Url, hops: usize) -> Option<String> {
    if hops >= MAX_REDIRECTS {
        return Some(format!("too many redirects (last: {target})"));
    }
    HostPolicy::check_url(target.as_str())
        .err()
        .map(|e| format!("redirect refused: {e}"))
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(request.url),
            HttpMethod::Post => self.client.post(request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

/// A successful platform reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    /// The complete body, uncapped
    pub body: String,
}

/// Renders as `Status: {code}\n{body}` with the body capped at
/// [`MAX_BODY_CHARS`]: the text tools hand back to the model.
impl fmt::Display for HttpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Status: {}\n{}",
            self.status,
            cap_text(&self.body, MAX_BODY_CHARS)
        )
    }
}

/// Allow-listed, bearer-aware HTTP access.
#[derive(Clone)]
pub struct NetworkGateway {
    transport: Arc<dyn HttpTransport>,
}

impl NetworkGateway {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// A gateway over the production `reqwest` transport.
    pub fn live() -> Self {
        Self::new(Arc::new(ReqwestTransport::new()))
    }

    /// GET `url`.
    pub async fn get(
        &self,
        url: &str,
        bearer: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        let url = HostPolicy::check_url(url)?;
        let headers = Self::headers(&url, None, bearer);
        self.dispatch(
            TransportRequest {
                method: HttpMethod::Get,
                url,
                headers,
                body: None,
            },
            cancel,
        )
        .await
    }

    /// POST `body` as JSON to `url`.
    pub async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: Option<&HashMap<String, String>>,
        bearer: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        let url = HostPolicy::check_url(url)?;
        let mut headers = Self::headers(&url, headers, bearer);
        if !headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        {
            headers.push(("Content-Type".into(), "application/json".into()));
        }
        self.dispatch(
            TransportRequest {
                method: HttpMethod::Post,
                url,
                headers,
                body: Some(body.to_string()),
            },
            cancel,
        )
        .await
    }

    /// Caller headers first; a present bearer replaces any caller `Authorization`.
    fn headers(
        url: &Url,
        extra: Option<&HashMap<String, String>>,
        bearer: Option<&str>,
    ) -> Vec<(String, String)> {
        let bearer = bearer
            .map(str::trim)
            .filter(|b| !b.is_empty() && HostPolicy::may_carry_bearer(url));

        let mut headers: Vec<(String, String)> = extra
            .into_iter()
            .flatten()
            .filter(|(k, _)| !(bearer.is_some() && k.eq_ignore_ascii_case("authorization")))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        headers.sort();

        if let Some(token) = bearer {
            headers.push(("Authorization".into(), format!("Bearer {token}")));
        }
        headers
    }

    async fn dispatch(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpReply> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let method = request.method;
        let url = request.url.to_string();
        tracing::debug!(%method, url = %url, "Dispatching platform request");

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = self.transport.send(request) => response?,
        };

        if !(200..300).contains(&response.status) {
            tracing::debug!(%method, url = %url, status = response.status, "Platform returned non-success");
            return Err(Error::Upstream {
                status: response.status,
                body: cap_text(&response.body, MAX_BODY_CHARS),
            });
        }

        Ok(HttpReply {
            status: response.status,
            body: response.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedTransport;

    fn gateway(transport: ScriptedTransport) -> (NetworkGateway, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        (NetworkGateway::new(transport.clone()), transport)
    }

    #[tokio::test]
    async fn get_returns_status_and_body() {
        let (gw, _) = gateway(ScriptedTransport::new().route(
            HttpMethod::Get,
            "/api/v1/feed",
            200,
            "{\"posts\":[]}",
        ));
        let reply = gw
            .get(
                "https://www.moltbook.com/api/v1/feed",
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.to_string(), "Status: 200\n{\"posts\":[]}");
    }

    #[tokio::test]
    async fn disallowed_host_never_reaches_transport() {
        let (gw, transport) = gateway(ScriptedTransport::new());
        let cancel = CancellationToken::new();

        let err = gw
            .get("http://evil.example/x", Some("secret"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NetworkPolicy(_)));

        let err = gw
            .post(
                "http://evil.example/x",
                &serde_json::json!({}),
                None,
                Some("secret"),
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NetworkPolicy(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn bearer_injected_and_bare_domain_normalized() {
        let (gw, transport) =
            gateway(ScriptedTransport::new().route(HttpMethod::Get, "/skill.md", 200, "ok"));
        gw.get(
            "https://moltbook.com/skill.md",
            Some("tok-123"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.url.host_str(), Some("www.moltbook.com"));
        assert_eq!(sent.header("authorization"), Some("Bearer tok-123"));
    }

    #[tokio::test]
    async fn blank_bearer_not_sent() {
        let (gw, transport) = gateway(ScriptedTransport::new().route(HttpMethod::Get, "/", 200, ""));
        gw.get("https://www.moltbook.com/", Some("  "), &CancellationToken::new())
            .await
            .unwrap();
        assert!(transport.requests()[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn caller_authorization_replaced_by_bearer() {
        let (gw, transport) =
            gateway(ScriptedTransport::new().route(HttpMethod::Post, "/upvote", 200, "{}"));
        let headers = HashMap::from([
            ("Authorization".to_string(), "Bearer stolen".to_string()),
            ("X-Trace".to_string(), "1".to_string()),
        ]);
        gw.post(
            "https://www.moltbook.com/api/v1/posts/p1/upvote",
            &serde_json::json!({}),
            Some(&headers),
            Some("mine"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let sent = &transport.requests()[0];
        let auth: Vec<_> = sent
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
            .collect();
        assert_eq!(auth.len(), 1);
        assert_eq!(auth[0].1, "Bearer mine");
        assert_eq!(sent.header("x-trace"), Some("1"));
        assert_eq!(sent.header("content-type"), Some("application/json"));
        assert_eq!(sent.body.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn non_success_is_upstream_error() {
        let (gw, _) = gateway(ScriptedTransport::new().route(
            HttpMethod::Post,
            "/comments",
            429,
            "slow down",
        ));
        let err = gw
            .post(
                "https://www.moltbook.com/api/v1/posts/p1/comments",
                &serde_json::json!({"content": "hi"}),
                None,
                Some("tok"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream { status: 429, ref body } if body == "slow down"));
    }

    #[tokio::test]
    async fn long_body_kept_whole_but_rendered_capped() {
        let long = format!("{{\"items\":\"{}\"}}", "x".repeat(MAX_BODY_CHARS + 50));
        let (gw, _) =
            gateway(ScriptedTransport::new().route(HttpMethod::Get, "/big", 200, long.clone()));
        let reply = gw
            .get("https://www.moltbook.com/big", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply.body, long);
        assert!(serde_json::from_str::<serde_json::Value>(&reply.body).is_ok());

        let rendered = reply.to_string();
        assert!(rendered.ends_with(TRIM_MARKER));
        assert_eq!(
            rendered.chars().count(),
            "Status: 200\n".len() + MAX_BODY_CHARS + TRIM_MARKER.len()
        );
    }

    #[tokio::test]
    async fn long_error_body_is_capped() {
        let long = "e".repeat(MAX_BODY_CHARS * 2);
        let (gw, _) = gateway(ScriptedTransport::new().route(HttpMethod::Get, "/", 500, long));
        let err = gw
            .get("https://www.moltbook.com/", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Upstream { status: 500, ref body } if body.ends_with(TRIM_MARKER))
        );
    }

    #[test]
    fn redirects_stay_on_allow_listed_hosts() {
        let same = Url::parse("https://www.moltbook.com/api/v1/feed").unwrap();
        assert!(redirect_refusal(&same, 0).is_none());

        let bare = Url::parse("https://moltbook.com/skill.md").unwrap();
        assert!(redirect_refusal(&bare, 1).is_none());

        let away = Url::parse("https://evil.example/payload").unwrap();
        let reason = redirect_refusal(&away, 0).unwrap();
        assert!(reason.contains("evil.example"));

        let odd_scheme = Url::parse("file:///etc/passwd").unwrap();
        assert!(redirect_refusal(&odd_scheme, 0).is_some());

        assert!(redirect_refusal(&same, MAX_REDIRECTS).is_some());
    }

    #[tokio::test]
    async fn transport_failure_maps_to_transport_error() {
        let (gw, _) = gateway(ScriptedTransport::new().fail(HttpMethod::Get, "/", "connection reset"));
        let err = gw
            .get("https://www.moltbook.com/", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(ref r) if r == "connection reset"));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let (gw, transport) = gateway(ScriptedTransport::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = gw
            .get("https://www.moltbook.com/", None, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn cap_text_respects_char_boundaries() {
        assert_eq!(cap_text("héllo", 2), format!("hé{TRIM_MARKER}"));
        assert_eq!(cap_text("short", 10), "short");
    }
}
