//! Tool trait: the abstraction over what the model may call.
//!
//! Tools are registered with their JSON-schema parameter spec. The registry
//! compiles each schema once and validates arguments before the executor
//! runs, so executors can rely on required fields being present.

use std::collections::BTreeMap;

use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool considers the call successful
    pub success: bool,

    /// The text fed back to the model
    pub output: String,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Per-invocation values a tool may need.
///
/// The bearer travels with the call instead of living on a shared client,
/// so two concurrent runs never see each other's credential.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub bearer: Option<String>,
    pub cancel: CancellationToken,
}

impl ToolContext {
    pub fn new(bearer: Option<String>, cancel: CancellationToken) -> Self {
        Self { bearer, cancel }
    }

    pub fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "http_get").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with arguments already validated against the schema.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A tool plus its compiled argument schema.
pub struct RegisteredTool {
    tool: Box<dyn Tool>,
    schema: JSONSchema,
}

impl RegisteredTool {
    pub fn name(&self) -> &str {
        self.tool.name()
    }

    /// Check `arguments` against the compiled schema.
    pub fn validate(&self, arguments: &serde_json::Value) -> std::result::Result<(), ToolError> {
        if let Err(errors) = self.schema.validate(arguments) {
            let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(ToolError::InvalidArguments(format!(
                "{}: {}",
                self.tool.name(),
                messages.join("; ")
            )));
        }
        Ok(())
    }

    /// Validate, then execute.
    pub async fn invoke(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError> {
        self.validate(&arguments)?;
        self.tool.execute(arguments, ctx).await
    }
}

/// Outcome of looking a tool up by name.
pub enum ResolvedTool<'a> {
    Found(&'a RegisteredTool),
    /// Sentinel for names the registry does not know.
    NotFound(String),
}

impl ResolvedTool<'_> {
    pub async fn invoke(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError> {
        match self {
            ResolvedTool::Found(tool) => tool.invoke(arguments, ctx).await,
            ResolvedTool::NotFound(name) => Err(ToolError::NotFound(name.clone())),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, ResolvedTool::Found(_))
    }
}

/// A registry of available tools, keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    ///
    /// Fails if the tool's parameter schema is not a valid JSON Schema.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        let raw = tool.parameters_schema();
        let schema = JSONSchema::compile(&raw).map_err(|e| ToolError::InvalidSchema {
            tool_name: name.clone(),
            reason: e.to_string(),
        })?;
        self.tools.insert(name, RegisteredTool { tool, schema });
        Ok(())
    }

    /// Look up a tool by name; unknown names resolve to the `NotFound` sentinel.
    pub fn resolve(&self, name: &str) -> ResolvedTool<'_> {
        match self.tools.get(name) {
            Some(tool) => ResolvedTool::Found(tool),
            None => ResolvedTool::NotFound(name.to_string()),
        }
    }

    /// All tool definitions, in name order (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.tool.to_definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
