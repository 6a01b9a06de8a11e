//! Configuration loading, validation, and management for moltpilot.
//!
//! Loads configuration from `~/.moltpilot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.moltpilot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Content-platform endpoints
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Chat-completions backend
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Tool-loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Scheduled comment engagement
    #[serde(default)]
    pub engagement: EngagementConfig,

    /// Scheduled heartbeat
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Credential and ledger storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Global feed; `{limit}` is substituted.
    #[serde(default = "default_feed_path")]
    pub feed_path: String,

    /// Per-community feed; `{submolt}` and `{limit}` are substituted.
    #[serde(default = "default_community_feed_path")]
    pub community_feed_path: String,

    /// Single post with comments; `{postId}` is substituted.
    #[serde(default = "default_thread_path")]
    pub thread_path: String,

    #[serde(default = "default_create_post_path")]
    pub create_post_path: String,
}

fn default_base_url() -> String {
    "https://www.moltbook.com".into()
}
fn default_feed_path() -> String {
    "/api/v1/feed?limit={limit}".into()
}
fn default_community_feed_path() -> String {
    "/api/v1/posts?submolt={submolt}&limit={limit}".into()
}
fn default_thread_path() -> String {
    "/api/v1/posts/{postId}".into()
}
fn default_create_post_path() -> String {
    "/api/v1/posts".into()
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            feed_path: default_feed_path(),
            community_feed_path: default_community_feed_path(),
            thread_path: default_thread_path(),
            create_post_path: default_create_post_path(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OpenAI-compatible base URL (the `/chat/completions` suffix is appended)
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_provider_url() -> String {
    "http://localhost:1234/v1".into()
}
fn default_model() -> String {
    "qwen/qwen3-coder-30b".into()
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model turns per tool loop
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
}

fn default_max_steps() -> u32 {
    25
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_engage_interval")]
    pub interval_minutes: u32,

    /// The monitored post
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,

    /// How long to wait before re-checking when no post is configured
    #[serde(default = "default_idle_minutes")]
    pub idle_minutes: u32,
}

fn default_engage_interval() -> u32 {
    5
}
fn default_idle_minutes() -> u32 {
    60
}
fn default_true() -> bool {
    true
}

impl EngagementConfig {
    /// The configured post id, if non-blank.
    pub fn post_id(&self) -> Option<&str> {
        self.post_id.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: default_engage_interval(),
            post_id: None,
            idle_minutes: default_idle_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How often the scheduler asks whether a heartbeat is due
    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u32,

    /// Minimum time between successful heartbeats
    #[serde(default = "default_min_interval_hours")]
    pub min_interval_hours: u32,
}

fn default_check_interval() -> u32 {
    15
}
fn default_min_interval_hours() -> u32 {
    4
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_minutes: default_check_interval(),
            min_interval_hours: default_min_interval_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite connection string
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_database_url() -> String {
    format!(
        "sqlite://{}",
        AppConfig::config_dir().join("moltpilot.db").display()
    )
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    5080
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.moltpilot/config.toml).
    ///
    /// Environment variables override file values:
    /// - `MOLTPILOT_BASE_URL`
    /// - `MOLTPILOT_MODEL`
    /// - `MOLTPILOT_PROVIDER_URL`
    /// - `MOLTPILOT_PROVIDER_API_KEY`
    /// - `MOLTPILOT_POST_ID`
    /// - `MOLTPILOT_DATABASE_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("MOLTPILOT_BASE_URL") {
            self.platform.base_url = url;
        }
        if let Some(model) = get("MOLTPILOT_MODEL") {
            self.provider.model = model;
        }
        if let Some(url) = get("MOLTPILOT_PROVIDER_URL") {
            self.provider.base_url = url;
        }
        if let Some(key) = get("MOLTPILOT_PROVIDER_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(post_id) = get("MOLTPILOT_POST_ID") {
            self.engagement.post_id = Some(post_id);
        }
        if let Some(url) = get("MOLTPILOT_DATABASE_URL") {
            self.storage.database_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".moltpilot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = &self.platform.base_url;
        if !base.starts_with("https://") && !base.starts_with("http://") {
            return Err(ConfigError::ValidationError(format!(
                "platform.base_url must be an http(s) URL, got '{base}'"
            )));
        }

        let templates = [
            ("platform.feed_path", &self.platform.feed_path),
            ("platform.community_feed_path", &self.platform.community_feed_path),
            ("platform.thread_path", &self.platform.thread_path),
            ("platform.create_post_path", &self.platform.create_post_path),
        ];
        for (name, path) in templates {
            if !path.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must start with '/'"
                )));
            }
        }
        if !self.platform.feed_path.contains("{limit}")
            || !self.platform.community_feed_path.contains("{limit}")
        {
            return Err(ConfigError::ValidationError(
                "feed path templates must contain {limit}".into(),
            ));
        }
        if !self.platform.thread_path.contains("{postId}") {
            return Err(ConfigError::ValidationError(
                "platform.thread_path must contain {postId}".into(),
            ));
        }

        if self.provider.temperature < 0.0 || self.provider.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "provider.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be at least 1".into(),
            ));
        }

        if self.engagement.interval_minutes == 0 || self.heartbeat.check_interval_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler intervals must be at least 1 minute".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform: PlatformConfig::default(),
            provider: ProviderConfig::default(),
            agent: AgentConfig::default(),
            engagement: EngagementConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            storage: StorageConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
