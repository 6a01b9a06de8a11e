//! `http_get`: fetch an allow-listed URL on the model's behalf.

use std::sync::Arc;

use async_trait::async_trait;
use moltpilot_core::error::{Error, ToolError};
use moltpilot_core::tool::{Tool, ToolContext, ToolResult};

use crate::network::NetworkGateway;

pub struct HttpGetTool {
    gateway: Arc<NetworkGateway>,
}

impl HttpGetTool {
    pub fn new(gateway: Arc<NetworkGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for HttpGetTool {
    fn name(&self) -> &str {
        "http_get"
    }

    fn description(&self) -> &str {
        "Fetch a URL over HTTPS and return status + body text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let url = arguments["url"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' argument".into()))?;

        let outcome = self.gateway.get(url, ctx.bearer(), &ctx.cancel).await;
        into_tool_result(self.name(), outcome)
    }
}

/// Successful and upstream-failed replies both become `Status: {code}\n{body}`
/// so the model sees the status; everything else is an execution failure.
pub(crate) fn into_tool_result(
    tool_name: &str,
    outcome: moltpilot_core::Result<crate::network::HttpReply>,
) -> Result<ToolResult, ToolError> {
    match outcome {
        Ok(reply) => Ok(ToolResult::ok(reply.to_string())),
        Err(Error::Upstream { status, body }) => {
            Ok(ToolResult::failed(format!("Status: {status}\n{body}")))
        }
        Err(e) => Err(ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: e.to_string(),
        }),
    }
}
