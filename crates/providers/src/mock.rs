//! Scripted provider for tests.

use std::sync::Mutex;

use moltpilot_core::error::ProviderError;
use moltpilot_core::message::{Message, MessageToolCall};
use moltpilot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue. Once the
/// queue is exhausted, calls fail with an `ApiError`, unless the provider was
/// built with [`SequentialMockProvider::repeating`], in which case the last
/// response is returned forever.
pub struct SequentialMockProvider {
    responses: Vec<Result<ProviderResponse, ProviderError>>,
    repeat_last: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    /// Responses and failures, in order.
    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses,
            repeat_last: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, None),
            make_text_response(answer),
        ])
    }

    /// Return `response` on every call.
    pub fn repeating(response: ProviderResponse) -> Self {
        let mut provider = Self::new(vec![response]);
        provider.repeat_last = true;
        provider
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let index = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| ProviderError::NotConfigured("mock poisoned".into()))?;
            requests.push(request);
            requests.len() - 1
        };

        let index = if self.repeat_last {
            index.min(self.responses.len().saturating_sub(1))
        } else {
            index
        };

        match self.responses.get(index) {
            Some(response) => response.clone(),
            None => Err(ProviderError::ApiError {
                status_code: 500,
                message: format!(
                    "SequentialMockProvider: no more responses (call #{index}, have {})",
                    self.responses.len()
                ),
            }),
        }
    }
}

fn mock_usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional content.
pub fn make_tool_call_response(
    tool_calls: Vec<MessageToolCall>,
    content: Option<&str>,
) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_tool_calls(content.map(String::from), tool_calls),
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call with id `call_{id}`.
pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{id}"),
        name: name.to_string(),
        arguments: args.to_string(),
    }
}
