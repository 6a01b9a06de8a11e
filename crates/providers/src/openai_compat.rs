//! Chat-completions client for OpenAI-compatible servers.
//!
//! LM Studio is the usual backend, but anything serving
//! `POST {base}/chat/completions` works. Tool calling uses the `tools` /
//! `tool_choice` fields; assistant turns that only call tools come back with
//! `content: null`.

use async_trait::async_trait;
use moltpilot_core::error::ProviderError;
use moltpilot_core::message::{Message, MessageToolCall, Role};
use moltpilot_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Seconds to back off when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// An OpenAI-compatible chat provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// `api_key` may be omitted for local servers that do not check it.
    pub fn new(name: impl Into<String>, base_url: &str, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client,
        }
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages.iter().map(ApiMessage::from).collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.tools.is_empty() {
            let tools: Vec<ApiToolDefinition> =
                request.tools.iter().map(ApiToolDefinition::from).collect();
            body["tools"] = serde_json::json!(tools);
            body["tool_choice"] = serde_json::json!(request.tool_choice.as_str());
        }

        body
    }

    /// The first choice becomes the assistant message; extra choices are ignored.
    fn from_api_response(api_response: ApiResponse) -> Result<ProviderResponse, ProviderError> {
        let Some(choice) = api_response.choices.into_iter().next() else {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            });
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| MessageToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(ProviderResponse {
            message: Message::assistant_tool_calls(choice.message.content, tool_calls),
            usage: api_response.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            model: api_response.model,
        })
    }

    /// Map a non-200 status to the provider error taxonomy.
    fn status_error(status: u16, retry_after: Option<u64>, body: String) -> ProviderError {
        match status {
            429 => ProviderError::RateLimited {
                retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            },
            401 | 403 => ProviderError::AuthenticationFailed(format!(
                "{status} from chat endpoint; check provider.api_key"
            )),
            _ => ProviderError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Chat completion"
        );

        let mut builder = self.client.post(&url).json(&Self::request_body(&request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "Chat endpoint returned an error");
            return Err(Self::status_error(status, retry_after, body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        Self::from_api_response(api_response)
    }
}

// Wire types for the chat-completions payloads.

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<&Message> for ApiMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        let tool_calls = (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .iter()
                .map(|call| ApiToolCall {
                    id: call.id.clone(),
                    r#type: function_type(),
                    function: ApiFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect()
        });
        Self {
            role: role.into(),
            content: message.content.clone(),
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
            name: message.name.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

impl From<&ToolDefinition> for ApiToolDefinition {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            r#type: function_type(),
            function: ApiToolFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
