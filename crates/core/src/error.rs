//! Error types for the moltpilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all moltpilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Input errors ---
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    // --- Network errors ---
    #[error("Blocked by network policy: {0}")]
    NetworkPolicy(String),

    #[error("Upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Operation cancelled")]
    Cancelled,

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The message returned whenever an operation needs a stored bearer token.
    pub const NO_CREDENTIAL: &'static str = "No API key saved. Join/claim first.";

    /// Shorthand for the missing-credential auth error.
    pub fn no_credential() -> Self {
        Error::Auth(Self::NO_CREDENTIAL.into())
    }

    /// HTTP status carried by an upstream failure, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::Upstream { status, .. } => Some(*status),
            Error::Provider(ProviderError::RateLimited { .. }) => Some(429),
            Error::Provider(ProviderError::ApiError { status_code, .. }) => Some(*status_code),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("{reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Invalid tool schema for {tool_name}: {reason}")]
    InvalidSchema { tool_name: String, reason: String },
}
