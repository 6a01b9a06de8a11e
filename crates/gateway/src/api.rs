//! JSON handlers for the operator API.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use moltpilot_agent::{DraftPreview, EngagementSummary, HeartbeatOutcome, SubmissionOutcome};
use moltpilot_core::credential::{AgentCredential, CredentialStore};
use moltpilot_core::error::Error;
use moltpilot_core::ledger::{Ledger, LedgerEntry};
use moltpilot_core::thread::ThreadSnapshot;
use moltpilot_security::mask;
use moltpilot_workflow::EngagementStatus;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SharedState;
use crate::error::ApiError;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Ledger entries shown by the state view.
pub const RECENT_LEDGER_ENTRIES: usize = 50;

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub submolt: Option<String>,
    #[serde(default)]
    pub take: i64,
    #[serde(default)]
    pub user_context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub submolt: Option<String>,
    #[serde(default)]
    pub draft: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialRequest {
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub claim_url: Option<String>,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostIdQuery {
    #[serde(default)]
    pub post_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultResponse {
    pub result: String,
    pub status: u16,
}

impl From<SubmissionOutcome> for ResultResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        Self {
            result: outcome.text,
            status: outcome.status,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextResponse {
    pub result: String,
}

/// The stored credential with the key masked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialView {
    pub handle: Option<String>,
    pub claim_url: Option<String>,
    pub api_key: String,
    pub has_key: bool,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
}

impl From<&AgentCredential> for CredentialView {
    fn from(credential: &AgentCredential) -> Self {
        Self {
            handle: credential.handle.clone(),
            claim_url: credential.claim_url.clone(),
            api_key: mask(credential.api_key.as_deref().unwrap_or_default()),
            has_key: credential.bearer().is_some(),
            last_heartbeat_at: credential.last_heartbeat_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub credential: CredentialView,
    pub recent: Vec<LedgerEntry>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// The post to engage: the query parameter, else the configured one.
fn target_post(state: &SharedState, query: PostIdQuery) -> Result<String, ApiError> {
    blank_to_none(query.post_id)
        .or_else(|| state.default_post_id.clone())
        .ok_or_else(|| {
            ApiError(Error::Validation(
                "No post id configured (engagement.post_id).".into(),
            ))
        })
}

pub async fn preview(
    State(state): State<SharedState>,
    Json(req): Json<PreviewRequest>,
) -> ApiResult<DraftPreview> {
    let cancel = state.request_token();
    let preview = state
        .services
        .compose
        .preview(
            blank_to_none(req.submolt).as_deref(),
            req.take,
            req.user_context.as_deref().unwrap_or_default(),
            &cancel,
        )
        .await?;
    Ok(Json(preview))
}

pub async fn publish(
    State(state): State<SharedState>,
    Json(req): Json<PublishRequest>,
) -> ApiResult<ResultResponse> {
    let cancel = state.request_token();
    let outcome = state
        .services
        .compose
        .publish(blank_to_none(req.submolt).as_deref(), &req.draft, &cancel)
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn comment(
    State(state): State<SharedState>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<ResultResponse> {
    let cancel = state.request_token();
    let outcome = state
        .services
        .compose
        .comment(&req.post_id, &req.content, req.parent_id.as_deref(), &cancel)
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn upvote_post(
    State(state): State<SharedState>,
    Path(post_id): Path<String>,
) -> ApiResult<ResultResponse> {
    let cancel = state.request_token();
    let outcome = state.services.compose.upvote_post(&post_id, &cancel).await?;
    Ok(Json(outcome.into()))
}

pub async fn upvote_comment(
    State(state): State<SharedState>,
    Path(comment_id): Path<String>,
) -> ApiResult<ResultResponse> {
    let cancel = state.request_token();
    let outcome = state
        .services
        .compose
        .upvote_comment(&comment_id, &cancel)
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn engage_run_once(
    State(state): State<SharedState>,
    Query(query): Query<PostIdQuery>,
) -> ApiResult<EngagementSummary> {
    let post_id = target_post(&state, query)?;
    info!(post_id = %post_id, "Engagement run requested");
    let cancel = state.request_token();
    let summary = state.services.engagement.run_once(&post_id, &cancel).await?;
    Ok(Json(summary))
}

pub async fn engage_thread(
    State(state): State<SharedState>,
    Query(query): Query<PostIdQuery>,
) -> ApiResult<ThreadSnapshot> {
    let post_id = target_post(&state, query)?;
    let cancel = state.request_token();
    let thread = state.services.compose.fetch_thread(&post_id, &cancel).await?;
    Ok(Json(thread))
}

pub async fn engage_status(State(state): State<SharedState>) -> Json<EngagementStatus> {
    Json(state.status.snapshot().await)
}

pub async fn agent_state(State(state): State<SharedState>) -> ApiResult<StateResponse> {
    let credential = state
        .services
        .credentials
        .load()
        .await
        .map_err(Error::from)?;
    let recent = state
        .services
        .ledger
        .recent(RECENT_LEDGER_ENTRIES)
        .await
        .map_err(Error::from)?;
    Ok(Json(StateResponse {
        credential: CredentialView::from(&credential),
        recent,
    }))
}

pub async fn join(State(state): State<SharedState>) -> ApiResult<TextResponse> {
    let cancel = state.request_token();
    let result = state.services.join.run(&cancel).await?;
    Ok(Json(TextResponse { result }))
}

pub async fn heartbeat(State(state): State<SharedState>) -> ApiResult<HeartbeatOutcome> {
    let cancel = state.request_token();
    let outcome = state.services.heartbeat.run_once(&cancel).await?;
    Ok(Json(outcome))
}

pub async fn store_credential(
    State(state): State<SharedState>,
    Json(req): Json<CredentialRequest>,
) -> ApiResult<CredentialView> {
    let credential = state
        .services
        .store_credential(req.handle.as_deref(), req.claim_url.as_deref(), &req.api_key)
        .await?;
    info!(handle = ?credential.own_handle(), "Credential stored");
    Ok(Json(CredentialView::from(&credential)))
}
