//! update_task_status tool

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use taskboard::TaskStatus;

use crate::tools::{Tool, ToolContext, ToolError};

/// Move a task to a new lifecycle status
pub struct UpdateTaskStatusTool;

#[async_trait]
impl Tool for UpdateTaskStatusTool {
    fn name(&self) -> &'static str {
        "update_task_status"
    }

    fn description(&self) -> &'static str {
        "Set a task's status to open, in_progress, or done"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id": {
                    "type": "integer",
                    "description": "Id of the task to update"
                },
                "status": {
                    "type": "string",
                    "description": "New status: open, in_progress, or done"
                }
            },
            "required": ["task_id", "status"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let task_id = args
            .get("task_id")
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolError::InvalidArguments {
                detail: "task_id must be an integer".to_string(),
            })?;
        let status_str = args
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments {
                detail: "status must be a string".to_string(),
            })?;
        debug!(task_id, status = %status_str, "UpdateTaskStatusTool::execute: called");

        let status = TaskStatus::parse(status_str)?;
        let task = ctx.store.update_status(task_id, status)?;
        Ok(json!({"task": task}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolContext;
    use std::sync::Arc;
    use taskboard::TaskStore;

    fn ctx() -> ToolContext {
        ToolContext::new(Arc::new(TaskStore::open_in_memory().unwrap()), "s1")
    }

    #[tokio::test]
    async fn test_updates_status() {
        let ctx = ctx();
        let task = ctx.store.create("A", "", None, &[]).unwrap();

        let out = UpdateTaskStatusTool
            .execute(json!({"task_id": task.id, "status": "in_progress"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["task"]["status"], json!("in_progress"));
    }

    #[tokio::test]
    async fn test_unknown_task_errors() {
        let ctx = ctx();
        let err = UpdateTaskStatusTool
            .execute(json!({"task_id": 42, "status": "done"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_invalid_status_errors() {
        let ctx = ctx();
        let task = ctx.store.create("A", "", None, &[]).unwrap();
        let err = UpdateTaskStatusTool
            .execute(json!({"task_id": task.id, "status": "bad_status"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad_status"));
    }
}
