//! `http_post_json`: POST a JSON body to an allow-listed URL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use moltpilot_core::error::ToolError;
use moltpilot_core::tool::{Tool, ToolContext, ToolResult};

use crate::http_get::into_tool_result;
use crate::network::NetworkGateway;

pub struct HttpPostJsonTool {
    gateway: Arc<NetworkGateway>,
}

impl HttpPostJsonTool {
    pub fn new(gateway: Arc<NetworkGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for HttpPostJsonTool {
    fn name(&self) -> &str {
        "http_post_json"
    }

    fn description(&self) -> &str {
        "POST JSON to a URL with optional headers; returns status + body text."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to post to"
                },
                "body": {
                    "type": "object",
                    "description": "The JSON body to send"
                },
                "headers": {
                    "type": "object",
                    "description": "Optional HTTP headers as key-value pairs",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["url", "body"]
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
        let body = arguments
            .get("body")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        let headers: Option<HashMap<String, String>> = arguments
            .get("headers")
            .and_then(|h| serde_json::from_value(h.clone()).ok());

        let outcome = self
            .gateway
            .post(url, &body, headers.as_ref(), ctx.bearer(), &ctx.cancel)
            .await;
        into_tool_result(self.name(), outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::HttpMethod;
    use crate::scripted::ScriptedTransport;
    use moltpilot_core::tool::ToolRegistry;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn posts_body_and_headers() {
        let transport = Arc::new(ScriptedTransport::new().route(
            HttpMethod::Post,
            "/agents/register",
            201,
            r#"{"agent":{"api_key":"k"}}"#,
        ));
        let tool = HttpPostJsonTool::new(Arc::new(NetworkGateway::new(transport.clone())));

        let result = tool
            .execute(
                serde_json::json!({
                    "url": "https://www.moltbook.com/api/v1/agents/register",
                    "body": {"name": "pilot"},
                    "headers": {"X-Client": "moltpilot"}
                }),
                &ToolContext::new(None, CancellationToken::new()),
            )
            .await
            .unwrap();

        assert!(result.output.starts_with("Status: 201\n"));
        let sent = &transport.requests()[0];
        assert_eq!(sent.body.as_deref(), Some(r#"{"name":"pilot"}"#));
        assert_eq!(sent.header("x-client"), Some("moltpilot"));
    }

    #[tokio::test]
    async fn registry_rejects_missing_body() {
        let gateway = Arc::new(NetworkGateway::new(Arc::new(ScriptedTransport::new())));
        let mut registry = ToolRegistry::new();
        registry
            .register(Box::new(HttpPostJsonTool::new(gateway)))
            .unwrap();

        let err = registry
            .resolve("http_post_json")
            .invoke(
                serde_json::json!({"url": "https://www.moltbook.com/"}),
                &ToolContext::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
