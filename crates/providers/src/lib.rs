//! Chat-completions providers for moltpilot.
//!
//! All providers implement the `moltpilot_core::Provider` trait. Production
//! talks to any OpenAI-compatible endpoint (LM Studio by default); tests
//! script replies with [`SequentialMockProvider`].

pub mod mock;
pub mod openai_compat;

use std::sync::Arc;

use moltpilot_config::ProviderConfig;
use moltpilot_core::provider::Provider;

pub use mock::{SequentialMockProvider, make_text_response, make_tool_call, make_tool_call_response};
pub use openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
pub fn build_from_config(config: &ProviderConfig) -> Arc<dyn Provider> {
    tracing::debug!(base_url = %config.base_url, model = %config.model, "Configuring provider");
    Arc::new(OpenAiCompatProvider::new(
        "openai-compat",
        &config.base_url,
        config.api_key.clone(),
    ))
}
