//! HTTP API gateway for moltpilot.
//!
//! Exposes the operator surface (compose, engage, join, heartbeat,
//! credential) as JSON endpoints. Domain errors map to statuses in
//! [`error::ApiError`].
//!
//! Built on Axum.

pub mod api;
pub mod error;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use moltpilot_agent::AgentServices;
use moltpilot_workflow::StatusHandle;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use api::CredentialView;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub services: AgentServices,
    pub status: StatusHandle,
    /// Post engaged by `/api/engage/*` when the request names none.
    pub default_post_id: Option<String>,
    /// Parent of every per-request cancellation token.
    pub shutdown: CancellationToken,
}

impl GatewayState {
    pub fn new(
        services: AgentServices,
        status: StatusHandle,
        default_post_id: Option<String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            services,
            status,
            default_post_id: default_post_id.filter(|p| !p.trim().is_empty()),
            shutdown,
        }
    }

    fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/compose/preview", post(api::preview))
        .route("/api/compose/publish", post(api::publish))
        .route("/api/compose/comment", post(api::comment))
        .route("/api/compose/upvote/post/{post_id}", post(api::upvote_post))
        .route(
            "/api/compose/upvote/comment/{comment_id}",
            post(api::upvote_comment),
        )
        .route("/api/engage/run-once", post(api::engage_run_once))
        .route("/api/engage/thread", get(api::engage_thread))
        .route("/api/engage/status", get(api::engage_status))
        .route("/api/state", get(api::agent_state))
        .route("/api/agent/join", post(api::join))
        .route("/api/agent/heartbeat", post(api::heartbeat))
        .route("/api/credential", post(api::store_credential))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `addr` until `shutdown` fires.
pub async fn serve(addr: &str, state: SharedState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use moltpilot_config::AppConfig;
    use moltpilot_core::ledger::{Ledger, LedgerEntry};
    use moltpilot_memory::InMemoryStore;
    use moltpilot_providers::{SequentialMockProvider, make_text_response};
    use moltpilot_tools::{HttpMethod, NetworkGateway, ScriptedTransport};
    use tower::ServiceExt;

    fn test_state(
        transport: ScriptedTransport,
        store: &InMemoryStore,
        post_id: Option<&str>,
    ) -> SharedState {
        let gateway = Arc::new(NetworkGateway::new(Arc::new(transport)));
        let provider = Arc::new(SequentialMockProvider::repeating(make_text_response(
            "Draft Title\n\nDraft body.",
        )));
        let services = AgentServices::build(
            &AppConfig::default(),
            gateway,
            provider,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
        .unwrap();
        Arc::new(GatewayState::new(
            services,
            StatusHandle::default(),
            post_id.map(String::from),
            CancellationToken::new(),
        ))
    }

    async fn send(
        state: SharedState,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = build_router(state).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let state = test_state(ScriptedTransport::new(), &InMemoryStore::new(), None);
        let (status, body) = send(state, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn compose_without_credential_is_bad_request() {
        let state = test_state(ScriptedTransport::new(), &InMemoryStore::new(), None);
        let (status, body) = send(
            state,
            "POST",
            "/api/compose/preview",
            Some(serde_json::json!({"take": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No API key saved. Join/claim first.");
    }

    #[tokio::test]
    async fn preview_returns_draft_and_debug() {
        let store = InMemoryStore::with_credential("sk", None);
        let transport = ScriptedTransport::new().route(
            HttpMethod::Get,
            "/api/v1/feed",
            200,
            r#"{"posts":[{"title":"A","content":"b"}]}"#,
        );
        let state = test_state(transport, &store, None);
        let (status, body) = send(
            state,
            "POST",
            "/api/compose/preview",
            Some(serde_json::json!({"take": 0, "user_context": "lens"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["draft"], "Draft Title\n\nDraft body.\n");
        assert!(body["debug"].as_str().unwrap().starts_with("FETCH "));
    }

    #[tokio::test]
    async fn upvote_reports_upstream_status_text() {
        let store = InMemoryStore::with_credential("sk", None);
        let transport =
            ScriptedTransport::new().route(HttpMethod::Post, "/posts/p9/upvote", 404, "missing");
        let state = test_state(transport, &store, None);
        let (status, body) = send(state, "POST", "/api/compose/upvote/post/p9", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "Status: 404\nmissing");
    }

    #[tokio::test]
    async fn engage_without_post_id_is_bad_request() {
        let store = InMemoryStore::with_credential("sk", None);
        let state = test_state(ScriptedTransport::new(), &store, None);
        let (status, _) = send(state, "POST", "/api/engage/run-once", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn engage_thread_failure_is_bad_gateway() {
        let store = InMemoryStore::with_credential("sk", None);
        let transport =
            ScriptedTransport::new().route(HttpMethod::Get, "/posts/p1", 500, "upstream down");
        let state = test_state(transport, &store, Some("p1"));
        let (status, body) = send(state, "POST", "/api/engage/run-once", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn engage_run_once_with_query_post_id() {
        let store = InMemoryStore::with_credential("sk", None);
        let thread = serde_json::json!({
            "success": true,
            "post": {"id": "p2", "title": "T", "content": "C"},
            "comments": [{"id": "c1", "content": "hey", "author": {"name": "ann"}}],
        });
        let transport = ScriptedTransport::new()
            .route(HttpMethod::Get, "/posts/p2", 200, thread.to_string())
            .route(HttpMethod::Post, "/upvote", 200, "{}")
            .route(HttpMethod::Post, "/comments", 201, "{}");
        let state = test_state(transport, &store, Some("p1"));
        let (status, body) = send(state, "POST", "/api/engage/run-once?post_id=p2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["replied"], 1);
        assert!(store.contains("c1").await.unwrap());
    }

    #[tokio::test]
    async fn credential_roundtrip_is_masked() {
        let store = InMemoryStore::new();
        store.record(LedgerEntry::now("c1", "p1")).await.unwrap();
        let state = test_state(ScriptedTransport::new(), &store, None);

        let (status, body) = send(
            state.clone(),
            "POST",
            "/api/credential",
            Some(serde_json::json!({"handle": "pilot", "api_key": "moltbook_sk_abcdef123456"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["api_key"], "****123456");
        assert_eq!(body["handle"], "pilot");

        let (status, body) = send(state, "GET", "/api/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["credential"]["has_key"], true);
        assert_eq!(body["recent"].as_array().unwrap().len(), 1);
        assert!(!body.to_string().contains("abcdef123456"));
    }

    #[tokio::test]
    async fn status_defaults_to_never() {
        let state = test_state(ScriptedTransport::new(), &InMemoryStore::new(), None);
        let (status, body) = send(state, "GET", "/api/engage/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["last_result"], "never");
    }
}
