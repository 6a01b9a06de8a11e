//! Outbound HTTP for moltpilot.
//!
//! [`network::NetworkGateway`] is the only way the agent talks to the
//! platform. The two model-callable tools wrap it so that a model running
//! in the tool loop gets exactly the same host policy and bearer handling.

pub mod http_get;
pub mod http_post_json;
pub mod network;

#[cfg(any(test, feature = "test-util"))]
pub mod scripted;

use std::sync::Arc;

use moltpilot_core::error::ToolError;
use moltpilot_core::tool::ToolRegistry;

pub use network::{
    HttpMethod, HttpReply, HttpTransport, MAX_BODY_CHARS, NetworkGateway, ReqwestTransport,
    TRIM_MARKER, cap_text,
};

#[cfg(any(test, feature = "test-util"))]
pub use scripted::ScriptedTransport;

/// The registry handed to the tool loop: `http_get` and `http_post_json`.
pub fn default_registry(gateway: Arc<NetworkGateway>) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(http_get::HttpGetTool::new(gateway.clone())))?;
    registry.register(Box::new(http_post_json::HttpPostJsonTool::new(gateway)))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_both_tools() {
        let gateway = Arc::new(NetworkGateway::new(Arc::new(ScriptedTransport::new())));
        let registry = default_registry(gateway).unwrap();
        assert_eq!(registry.names(), vec!["http_get", "http_post_json"]);
        assert_eq!(registry.definitions().len(), 2);
    }
}
