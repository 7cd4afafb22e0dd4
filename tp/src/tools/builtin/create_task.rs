//! create_task tool

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolError};

/// Create a new task in the store
///
/// Performs a best-effort title dedup: if an existing non-done task has
/// the same trimmed title (case-insensitive), that task is returned
/// instead of creating a duplicate. This protects against a retried
/// planner emitting the same create twice; it is a heuristic, not a
/// uniqueness guarantee.
pub struct CreateTaskTool;

#[async_trait]
impl Tool for CreateTaskTool {
    fn name(&self) -> &'static str {
        "create_task"
    }

    fn description(&self) -> &'static str {
        "Create a new task with a title and optional description, project, and categories"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Short task title"
                },
                "description": {
                    "type": "string",
                    "description": "Longer free-form details"
                },
                "project": {
                    "type": "string",
                    "description": "Project tag to group the task under"
                },
                "categories": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Free-form category tags"
                }
            },
            "required": ["title"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let title = args
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments {
                detail: "title must be a string".to_string(),
            })?;
        debug!(%title, "CreateTaskTool::execute: called");

        // Best-effort dedup against existing non-done tasks
        let normalized = title.trim().to_lowercase();
        for task in ctx.store.list(None)? {
            if task.status != taskboard::TaskStatus::Done && task.title.trim().to_lowercase() == normalized {
                debug!(existing_id = task.id, "CreateTaskTool::execute: duplicate title, returning existing");
                return Ok(json!({
                    "task": task,
                    "created": false,
                    "note": format!("A task titled \"{}\" already exists", task.title),
                }));
            }
        }

        let description = args.get("description").and_then(Value::as_str).unwrap_or("");
        let project = args.get("project").and_then(Value::as_str);
        let categories: Vec<String> = args
            .get("categories")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();

        let task = ctx.store.create(title, description, project, &categories)?;
        Ok(json!({"task": task, "created": true}))
    }
}
