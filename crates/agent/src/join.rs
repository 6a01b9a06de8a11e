//! The join flow: the model reads the platform's skill document and
//! registers itself with the tools it has.

use std::sync::Arc;

use moltpilot_core::credential::CredentialStore;
use moltpilot_core::error::Result;
use moltpilot_core::message::Message;
use moltpilot_core::tool::ToolContext;
use moltpilot_security::{mask, scan_for_leakage};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::loop_runner::ToolLoop;
use crate::prompts;

pub struct JoinService {
    tool_loop: Arc<ToolLoop>,
    credentials: Arc<dyn CredentialStore>,
}

impl JoinService {
    pub fn new(tool_loop: Arc<ToolLoop>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            tool_loop,
            credentials,
        }
    }

    /// Run the join instruction through the tool loop and return its final
    /// text, which should carry the claim link.
    ///
    /// A stored key, when present, is threaded to the tools; registration
    /// itself needs none.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<String> {
        let credential = self.credentials.load().await?;
        let bearer = credential.bearer().map(String::from);
        info!(has_key = bearer.is_some(), "Starting join flow");

        let mut messages = vec![
            Message::system(prompts::JOIN_SYSTEM),
            Message::user(prompts::JOIN_USER),
        ];
        let ctx = ToolContext::new(bearer.clone(), cancel.clone());
        let text = self.tool_loop.run(&mut messages, &ctx).await?.into_text();

        Ok(redact(text, bearer.as_deref()))
    }
}

/// Mask the bearer if the model echoed it back.
pub(crate) fn redact(text: String, bearer: Option<&str>) -> String {
    match bearer {
        Some(key) if scan_for_leakage(&text, &[key]) => {
            warn!("Model output contained the API key; masking it");
            text.replace(key, &mask(key))
        }
        _ => text,
    }
}
