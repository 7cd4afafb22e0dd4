//! ToolExecutor - registry plus the only call path into the Task Store
//!
//! Every failure mode at this boundary becomes an error ToolResult:
//! unknown tool, malformed arguments, handler error, timeout. Nothing a
//! planner emits can raise past the executor.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::time::timeout;
use tracing::debug;

use super::builtin::{CreateTaskTool, FetchTasksTool, NoOpTool, ReorderTasksTool, UpdateTaskStatusTool};
use super::{Tool, ToolCall, ToolContext, ToolDefinition, ToolResult};

const DEFAULT_TOOL_TIMEOUT_MS: u64 = 5_000;

/// Registry and execution boundary for tools
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
    tool_timeout: Duration,
}

impl ToolExecutor {
    /// Create an executor with the standard built-in tool set
    pub fn standard() -> Self {
        debug!("ToolExecutor::standard: called");
        let mut executor = Self::empty();
        executor.add_tool(Box::new(CreateTaskTool));
        executor.add_tool(Box::new(FetchTasksTool));
        executor.add_tool(Box::new(UpdateTaskStatusTool));
        executor.add_tool(Box::new(ReorderTasksTool));
        executor.add_tool(Box::new(NoOpTool));
        executor
    }

    /// Create an empty executor (for testing)
    pub fn empty() -> Self {
        debug!("ToolExecutor::empty: called");
        Self {
            tools: HashMap::new(),
            tool_timeout: Duration::from_millis(DEFAULT_TOOL_TIMEOUT_MS),
        }
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.tool_timeout = Duration::from_millis(timeout_ms);
        self
    }

    /// Register a tool, replacing any existing tool of the same name
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        debug!(tool_name = %tool.name(), "ToolExecutor::add_tool: called");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Tool definitions for the planner prompt, sorted by name for
    /// deterministic prompt rendering
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        debug!("ToolExecutor::definitions: called");
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Whether a tool name is registered
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Execute one tool call
    pub async fn execute(&self, tool_call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        debug!(tool_name = %tool_call.name, "ToolExecutor::execute: called");
        let tool = match self.tools.get(&tool_call.name) {
            Some(tool) => tool,
            None => {
                debug!(tool_name = %tool_call.name, "ToolExecutor::execute: unknown tool");
                return ToolResult::error(&tool_call.name, format!("Unknown tool: {}", tool_call.name));
            }
        };

        if let Err(detail) = validate_arguments(&tool.input_schema(), &tool_call.arguments) {
            debug!(tool_name = %tool_call.name, %detail, "ToolExecutor::execute: invalid arguments");
            return ToolResult::error(&tool_call.name, format!("Invalid arguments: {detail}"));
        }

        match timeout(self.tool_timeout, tool.execute(tool_call.arguments.clone(), ctx)).await {
            Ok(Ok(payload)) => ToolResult::success(&tool_call.name, payload),
            Ok(Err(e)) => ToolResult::error(&tool_call.name, e.to_string()),
            Err(_) => ToolResult::error(
                &tool_call.name,
                format!("Tool timed out after {}ms", self.tool_timeout.as_millis()),
            ),
        }
    }
}

/// Validate an argument object against a tool's JSON schema
///
/// Covers what the built-in schemas actually use: object shape, required
/// keys, unknown keys, and primitive/array type tags. Null arguments are
/// treated as an empty object so `no_op` style calls need no `{}`.
fn validate_arguments(schema: &Value, args: &Value) -> Result<(), String> {
    let properties = schema.get("properties").and_then(Value::as_object);
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let args_obj = match args {
        Value::Null => {
            if required.is_empty() {
                return Ok(());
            }
            return Err(format!("missing required parameter: {}", required[0]));
        }
        Value::Object(map) => map,
        other => return Err(format!("arguments must be an object, got {other}")),
    };

    for name in &required {
        if !args_obj.contains_key(*name) {
            return Err(format!("missing required parameter: {name}"));
        }
    }

    let Some(properties) = properties else {
        return Ok(());
    };

    for (name, value) in args_obj {
        let Some(prop) = properties.get(name) else {
            return Err(format!("unknown parameter: {name}"));
        };
        let Some(expected) = prop.get("type").and_then(Value::as_str) else {
            continue;
        };
        if !type_matches(expected, value) {
            return Err(format!("parameter {name} must be of type {expected}"));
        }
    }

    Ok(())
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use taskboard::TaskStore;

    fn ctx() -> ToolContext {
        ToolContext::new(Arc::new(TaskStore::open_in_memory().unwrap()), "session-1")
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            arguments,
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let executor = ToolExecutor::standard();
        let result = executor.execute(&call("launch_rocket", json!({})), &ctx()).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_missing_required_argument_is_error_result() {
        let executor = ToolExecutor::standard();
        let result = executor.execute(&call("create_task", json!({})), &ctx()).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("title"));
    }

    #[tokio::test]
    async fn test_wrong_argument_type_is_error_result() {
        let executor = ToolExecutor::standard();
        let result = executor
            .execute(&call("create_task", json!({"title": 42})), &ctx())
            .await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("type string"));
    }

    #[tokio::test]
    async fn test_unknown_argument_is_error_result() {
        let executor = ToolExecutor::standard();
        let result = executor
            .execute(&call("no_op", json!({"surprise": true})), &ctx())
            .await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("unknown parameter"));
    }

    #[tokio::test]
    async fn test_null_arguments_ok_without_required() {
        let executor = ToolExecutor::standard();
        let result = executor.execute(&call("no_op", Value::Null), &ctx()).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_error_result() {
        let executor = ToolExecutor::standard();
        let result = executor
            .execute(&call("update_task_status", json!({"task_id": 999, "status": "done"})), &ctx())
            .await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("not found"));
    }

    struct PoisonedStoreTool;

    #[async_trait]
    impl Tool for PoisonedStoreTool {
        fn name(&self) -> &'static str {
            "poisoned"
        }
        fn description(&self) -> &'static str {
            "Fails as if the store lock were poisoned"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            Err(ToolError::Store(taskboard::StoreError::LockPoisoned))
        }
    }

    #[tokio::test]
    async fn test_store_lock_failure_is_error_result() {
        let mut executor = ToolExecutor::empty();
        executor.add_tool(Box::new(PoisonedStoreTool));
        let result = executor.execute(&call("poisoned", json!({})), &ctx()).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("lock poisoned"));
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn description(&self) -> &'static str {
            "Sleeps forever"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(json!("never"))
        }
    }

    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let mut executor = ToolExecutor::empty().with_timeout(20);
        executor.add_tool(Box::new(SlowTool));
        let result = executor.execute(&call("slow", json!({})), &ctx()).await;
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
    }

    #[test]
    fn test_definitions_are_sorted_and_complete() {
        let executor = ToolExecutor::standard();
        let names: Vec<String> = executor.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            vec!["create_task", "fetch_tasks", "no_op", "reorder_tasks", "update_task_status"]
        );
    }
}
