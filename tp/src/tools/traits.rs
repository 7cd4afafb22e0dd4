//! Tool trait and call/result types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::context::ToolContext;
use super::ToolError;

/// A tool the planner can invoke against the task store
///
/// Handlers return `Ok(payload)` or a typed error; the executor is the
/// layer that turns either into a `ToolResult`, so handlers never worry
/// about the partial-failure contract.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (matches the name the planner emits)
    fn name(&self) -> &'static str;

    /// One-line purpose, embedded in the planner prompt
    fn description(&self) -> &'static str;

    /// JSON Schema for the tool's arguments
    fn input_schema(&self) -> Value;

    /// Execute against the task store
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// One planned invocation of a tool, as the planner emitted it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,

    /// Argument object; shape is validated against the tool's schema
    #[serde(default)]
    pub arguments: Value,
}

/// Tool name + schema as presented to the LLM
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Outcome of executing one ToolCall
///
/// Exactly one of `result` / `error` is set, matching `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(name: impl Into<String>, result: Value) -> Self {
        debug!("ToolResult::success: called");
        Self {
            name: name.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error result
    pub fn error(name: impl Into<String>, error: impl Into<String>) -> Self {
        debug!("ToolResult::error: called");
        Self {
            name: name.into(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Short human-readable form for prompts and fallback text
    pub fn summary(&self) -> String {
        if self.success {
            let payload = self
                .result
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| "ok".to_string());
            format!("{}: {}", self.name, payload)
        } else {
            format!(
                "{} failed: {}",
                self.name,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
