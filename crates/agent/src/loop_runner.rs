//! The bounded tool loop: model turn, tool calls, tool results, repeat.

use std::fmt;
use std::sync::Arc;

use moltpilot_core::error::{Error, Result};
use moltpilot_core::message::{Message, MessageToolCall};
use moltpilot_core::provider::{Provider, ProviderRequest, ToolChoice};
use moltpilot_core::tool::{ResolvedTool, ToolContext, ToolRegistry};
use tracing::{debug, info, warn};

/// Default model-turn budget.
pub const DEFAULT_MAX_STEPS: u32 = 25;

/// How a loop run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model answered without requesting tools.
    Done(String),
    /// The step budget ran out while the model was still calling tools.
    BudgetExceeded { max_steps: u32 },
}

impl LoopOutcome {
    /// The text reported to callers.
    pub fn into_text(self) -> String {
        match self {
            LoopOutcome::Done(text) => text,
            budget @ LoopOutcome::BudgetExceeded { .. } => budget.to_string(),
        }
    }
}

impl fmt::Display for LoopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopOutcome::Done(text) => f.write_str(text),
            LoopOutcome::BudgetExceeded { max_steps } => {
                write!(f, "Stopped after {max_steps} steps without finishing.")
            }
        }
    }
}

/// Drives a model through tool calls until it answers or the budget runs out.
///
/// Tool failures are fed back to the model as text; only provider failures
/// and cancellation end a run with an error.
pub struct ToolLoop {
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    model: String,
    temperature: f32,
    max_steps: u32,
}

impl ToolLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            temperature: 0.7,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Set the maximum number of model turns.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Run the loop over `messages`, appending every assistant and tool turn.
    pub async fn run(&self, messages: &mut Vec<Message>, ctx: &ToolContext) -> Result<LoopOutcome> {
        let definitions = self.tools.definitions();
        info!(
            model = %self.model,
            messages = messages.len(),
            max_steps = self.max_steps,
            "Starting tool loop"
        );

        for step in 0..self.max_steps {
            if ctx.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let mut request = ProviderRequest::chat(self.model.clone(), messages.clone())
                .with_tools(definitions.clone())
                .with_temperature(self.temperature);
            request.tool_choice = ToolChoice::Auto;

            debug!(step, "Tool loop step");
            let response = tokio::select! {
                _ = ctx.cancel.cancelled() => return Err(Error::Cancelled),
                response = self.provider.complete(request) => response?,
            };
            let message = response.message;

            if message.is_empty() {
                debug!(step, "Model returned an empty message");
                return Ok(LoopOutcome::Done(String::new()));
            }

            let calls = message.tool_calls.clone();
            let content = message.text().to_string();
            messages.push(message);

            if calls.is_empty() {
                info!(steps = step + 1, "Tool loop finished");
                return Ok(LoopOutcome::Done(content));
            }

            for call in &calls {
                let output = self.execute_call(call, ctx).await;
                messages.push(Message::tool_result(&call.id, &call.name, output));
            }
        }

        warn!(max_steps = self.max_steps, "Tool loop budget exhausted");
        Ok(LoopOutcome::BudgetExceeded {
            max_steps: self.max_steps,
        })
    }

    /// Execute one tool call, always producing the text fed back to the model.
    async fn execute_call(&self, call: &MessageToolCall, ctx: &ToolContext) -> String {
        let raw = if call.arguments.trim().is_empty() {
            "{}"
        } else {
            call.arguments.as_str()
        };

        let arguments: serde_json::Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Unparseable tool arguments");
                return format!("Error executing tool '{}': {e}", call.name);
            }
        };

        let tool = self.tools.resolve(&call.name);
        if let ResolvedTool::NotFound(name) = &tool {
            warn!(tool = %name, "Model requested an unknown tool");
            return format!("Error: Unknown tool '{name}'");
        }

        debug!(tool = %call.name, call_id = %call.id, "Executing tool");
        match tool.invoke(arguments, ctx).await {
            Ok(result) => result.output,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                format!("Error executing tool '{}': {e}", call.name)
            }
        }
    }
}
