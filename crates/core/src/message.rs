//! Conversation message types.
//!
//! A transcript is an ordered `Vec<Message>` that lives for one tool-loop
//! invocation or one direct model call. Assistant messages may carry tool-call
//! requests; tool messages answer exactly one of them by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and persona
    System,
    /// The task or prompt
    User,
    /// The model
    Assistant,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content. Assistant turns that only request tools may have none.
    #[serde(default)]
    pub content: Option<String>,

    /// Tool calls requested by the assistant, in the order the model issued them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// If this is a tool result, the name of the tool that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, Some(content.into()))
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, Some(content.into()))
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, Some(content.into()))
    }

    /// Create an assistant message that only requests tools.
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<MessageToolCall>) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content);
        msg.tool_calls = tool_calls;
        msg
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut msg = Self::with_role(Role::Tool, Some(content.into()));
        msg.tool_call_id = Some(tool_call_id.into());
        msg.name = Some(name.into());
        msg
    }

    /// The text content, or `""` when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// True when the message carries neither text nor tool calls.
    pub fn is_empty(&self) -> bool {
        self.text().trim().is_empty() && self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Correlation id echoed back in the tool message
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as raw JSON text (may be malformed)
    pub arguments: String,
}
