//! Background scheduling: the engagement loop and the heartbeat loop.
//!
//! Both loops run as spawned tokio tasks until their cancellation token
//! fires. The engagement loop runs immediately on start and then every
//! `interval_minutes`; the heartbeat loop first ticks after one full
//! `check_interval_minutes`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moltpilot_agent::{EngagementOrchestrator, HeartbeatRunner};
use moltpilot_config::{EngagementConfig, HeartbeatConfig};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const NO_POST_ID: &str = "No post id configured (engagement.post_id).";
pub const FAILED: &str = "Failed";

/// What the last scheduled engagement run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementStatus {
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_result: String,
    pub last_error: String,
}

impl Default for EngagementStatus {
    fn default() -> Self {
        Self {
            last_run_at: None,
            last_result: "never".into(),
            last_error: String::new(),
        }
    }
}

/// Shared, cloneable handle to the engagement status.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<EngagementStatus>>,
}

impl StatusHandle {
    pub async fn snapshot(&self) -> EngagementStatus {
        self.inner.read().await.clone()
    }

    async fn begin(&self) {
        let mut status = self.inner.write().await;
        status.last_run_at = Some(Utc::now());
        status.last_error.clear();
    }

    async fn finish(&self, result: String) {
        self.inner.write().await.last_result = result;
    }

    async fn fail(&self, error: String) {
        let mut status = self.inner.write().await;
        status.last_result = FAILED.into();
        status.last_error = error;
    }
}

/// Drives scheduled engagement and heartbeat runs.
#[derive(Clone)]
pub struct Scheduler {
    engagement: Arc<EngagementOrchestrator>,
    heartbeat: Arc<HeartbeatRunner>,
    engagement_config: EngagementConfig,
    heartbeat_config: HeartbeatConfig,
    status: StatusHandle,
}

impl Scheduler {
    pub fn new(
        engagement: Arc<EngagementOrchestrator>,
        heartbeat: Arc<HeartbeatRunner>,
        engagement_config: EngagementConfig,
        heartbeat_config: HeartbeatConfig,
    ) -> Self {
        Self {
            engagement,
            heartbeat,
            engagement_config,
            heartbeat_config,
            status: StatusHandle::default(),
        }
    }

    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Spawn the enabled loops. Each stops when `cancel` fires.
    pub fn start(&self, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if self.engagement_config.enabled {
            let scheduler = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                scheduler.engagement_loop(cancel).await;
            }));
        }

        if self.heartbeat_config.enabled {
            let scheduler = self.clone();
            handles.push(tokio::spawn(async move {
                scheduler.heartbeat_loop(cancel).await;
            }));
        }

        info!(loops = handles.len(), "Scheduler started");
        handles
    }

    async fn engagement_loop(&self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            let Some(delay) = self.engagement_tick(&cancel).await else {
                break;
            };
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        info!("Engagement loop stopped");
    }

    /// One scheduled engagement run. Returns how long to wait before the
    /// next one, or `None` when the run was cancelled.
    pub async fn engagement_tick(&self, cancel: &CancellationToken) -> Option<Duration> {
        self.status.begin().await;

        let Some(post_id) = self.engagement_config.post_id() else {
            debug!("No post id configured; idling");
            self.status.finish(NO_POST_ID.into()).await;
            return Some(minutes(self.engagement_config.idle_minutes));
        };

        info!(post_id, "Scheduled engagement run");
        match self.engagement.run_once(post_id, cancel).await {
            Ok(summary) => self.status.finish(summary.to_string()).await,
            Err(e) if e.is_cancelled() => return None,
            Err(e) => {
                error!(post_id, error = %e, "Scheduled engagement failed");
                self.status.fail(e.to_string()).await;
            }
        }
        Some(minutes(self.engagement_config.interval_minutes))
    }

    async fn heartbeat_loop(&self, cancel: CancellationToken) {
        let period = minutes(self.heartbeat_config.check_interval_minutes);
        let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }
            self.heartbeat_tick(&cancel).await;
        }
        info!("Heartbeat loop stopped");
    }

    /// One scheduled heartbeat check. Failures are logged, never raised.
    pub async fn heartbeat_tick(&self, cancel: &CancellationToken) {
        match self.heartbeat.run_once(cancel).await {
            Ok(outcome) => info!(status = ?outcome.status, result = %outcome, "Heartbeat"),
            Err(e) if e.is_cancelled() => debug!("Heartbeat cancelled"),
            Err(e) => error!(error = %e, "Heartbeat failed"),
        }
    }
}

fn minutes(n: u32) -> Duration {
    Duration::from_secs(u64::from(n.max(1)) * 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use moltpilot_agent::{PlatformClient, ToolLoop};
    use moltpilot_config::{PlatformConfig, ProviderConfig};
    use moltpilot_core::credential::CredentialStore;
    use moltpilot_core::ledger::Ledger;
    use moltpilot_memory::InMemoryStore;
    use moltpilot_providers::{SequentialMockProvider, make_text_response};
    use moltpilot_tools::{HttpMethod, NetworkGateway, ScriptedTransport};

    fn thread() -> String {
        serde_json::json!({
            "success": true,
            "post": {"id": "p1", "title": "T", "content": "C"},
            "comments": [{"id": "c1", "content": "hi", "author": {"name": "ann"}}],
        })
        .to_string()
    }

    fn scheduler(
        transport: ScriptedTransport,
        store: &InMemoryStore,
        post_id: Option<&str>,
    ) -> (Scheduler, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        let gateway = Arc::new(NetworkGateway::new(transport.clone()));
        let provider = Arc::new(SequentialMockProvider::repeating(make_text_response(
            "HEARTBEAT_DONE",
        )));
        let tools = Arc::new(moltpilot_tools::default_registry(gateway.clone()).unwrap());

        let engagement = Arc::new(EngagementOrchestrator::new(
            PlatformClient::new(gateway, PlatformConfig::default()),
            provider.clone(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            ProviderConfig::default(),
        ));
        let heartbeat = Arc::new(HeartbeatRunner::new(
            Arc::new(ToolLoop::new(provider, tools, "m")),
            Arc::new(store.clone()),
        ));
        let engagement_config = EngagementConfig {
            post_id: post_id.map(String::from),
            ..Default::default()
        };
        (
            Scheduler::new(engagement, heartbeat, engagement_config, HeartbeatConfig::default()),
            transport,
        )
    }

    #[tokio::test]
    async fn status_starts_as_never() {
        let status = StatusHandle::default().snapshot().await;
        assert_eq!(status.last_result, "never");
        assert!(status.last_run_at.is_none());
    }

    #[tokio::test]
    async fn tick_without_post_id_idles() {
        let store = InMemoryStore::with_credential("sk", None);
        let (scheduler, transport) = scheduler(ScriptedTransport::new(), &store, Some("   "));

        let delay = scheduler.engagement_tick(&CancellationToken::new()).await;
        assert_eq!(delay, Some(Duration::from_secs(60 * 60)));

        let status = scheduler.status().snapshot().await;
        assert_eq!(status.last_result, NO_POST_ID);
        assert!(status.last_run_at.is_some());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn tick_records_summary() {
        let store = InMemoryStore::with_credential("sk", None);
        let transport = ScriptedTransport::new()
            .route(HttpMethod::Get, "/api/v1/posts/p1", 200, thread())
            .route(HttpMethod::Post, "/upvote", 200, "{}")
            .route(HttpMethod::Post, "/comments", 201, "{}");
        let (scheduler, _) = scheduler(transport, &store, Some("p1"));

        let delay = scheduler.engagement_tick(&CancellationToken::new()).await;
        assert_eq!(delay, Some(Duration::from_secs(5 * 60)));

        let status = scheduler.status().snapshot().await;
        assert_eq!(status.last_result, "Engage done. replied=1, upvoted=1, skipped=0");
        assert_eq!(status.last_error, "");
        assert!(store.contains("c1").await.unwrap());
    }

    #[tokio::test]
    async fn failed_tick_records_error_and_keeps_schedule() {
        let store = InMemoryStore::new();
        let (scheduler, _) = scheduler(ScriptedTransport::new(), &store, Some("p1"));

        let delay = scheduler.engagement_tick(&CancellationToken::new()).await;
        assert_eq!(delay, Some(Duration::from_secs(5 * 60)));

        let status = scheduler.status().snapshot().await;
        assert_eq!(status.last_result, FAILED);
        assert_eq!(status.last_error, "No API key saved. Join/claim first.");
    }

    #[tokio::test]
    async fn heartbeat_tick_swallows_errors() {
        let store = InMemoryStore::new();
        let (scheduler, _) = scheduler(ScriptedTransport::new(), &store, None);
        scheduler.heartbeat_tick(&CancellationToken::new()).await;
        assert!(store.load().await.unwrap().last_heartbeat_at.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn loops_stop_on_cancel() {
        let store = InMemoryStore::with_credential("sk", None);
        let (scheduler, _) = scheduler(ScriptedTransport::new(), &store, None);
        let cancel = CancellationToken::new();

        let handles = scheduler.start(cancel.clone());
        assert_eq!(handles.len(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(scheduler.status().snapshot().await.last_result, NO_POST_ID);

        cancel.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_loop_ticks_after_interval() {
        let store = InMemoryStore::with_credential("sk", None);
        let (scheduler, _) = scheduler(ScriptedTransport::new(), &store, None);
        let cancel = CancellationToken::new();
        let handle = {
            let scheduler = scheduler.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { scheduler.heartbeat_loop(cancel).await })
        };

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(store.load().await.unwrap().last_heartbeat_at.is_none());

        tokio::time::sleep(Duration::from_secs(15 * 60)).await;
        assert!(store.load().await.unwrap().last_heartbeat_at.is_some());

        cancel.cancel();
        handle.await.unwrap();
    }
}
