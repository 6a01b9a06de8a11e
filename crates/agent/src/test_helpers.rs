//! Shared fixtures for agent tests.

use std::sync::Arc;

use moltpilot_config::PlatformConfig;
use moltpilot_core::tool::ToolRegistry;
use moltpilot_tools::NetworkGateway;

use crate::platform::PlatformClient;

pub use moltpilot_providers::{
    SequentialMockProvider, make_text_response, make_tool_call, make_tool_call_response,
};
pub use moltpilot_tools::ScriptedTransport;

/// The default tool registry over a scripted transport.
pub fn registry_with(transport: ScriptedTransport) -> (Arc<ToolRegistry>, Arc<ScriptedTransport>) {
    let transport = Arc::new(transport);
    let gateway = Arc::new(NetworkGateway::new(transport.clone()));
    let registry = moltpilot_tools::default_registry(gateway).unwrap();
    (Arc::new(registry), transport)
}

/// A platform client with default paths over a scripted transport.
pub fn platform(transport: ScriptedTransport) -> (PlatformClient, Arc<ScriptedTransport>) {
    let transport = Arc::new(transport);
    let gateway = Arc::new(NetworkGateway::new(transport.clone()));
    (PlatformClient::new(gateway, PlatformConfig::default()), transport)
}

/// A successful thread payload. Comments are `(id, parent_id, author)`.
pub fn thread_json(post_id: &str, comments: &[(&str, Option<&str>, &str)]) -> String {
    let comments: Vec<_> = comments
        .iter()
        .map(|(id, parent, author)| {
            serde_json::json!({
                "id": id,
                "content": format!("comment {id}"),
                "parent_id": parent,
                "author": { "name": author },
                "replies": [],
            })
        })
        .collect();
    serde_json::json!({
        "success": true,
        "post": { "id": post_id, "title": "Signals", "content": "The tide hums." },
        "comments": comments,
    })
    .to_string()
}
