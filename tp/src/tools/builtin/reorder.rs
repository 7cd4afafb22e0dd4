//! reorder_tasks tool

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolError};

/// Reassign manual ordering positions from an id sequence
pub struct ReorderTasksTool;

#[async_trait]
impl Tool for ReorderTasksTool {
    fn name(&self) -> &'static str {
        "reorder_tasks"
    }

    fn description(&self) -> &'static str {
        "Reorder tasks by listing task ids in the desired priority order; unlisted tasks keep their relative order afterwards"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_id_sequence": {
                    "type": "array",
                    "items": {"type": "integer"},
                    "description": "Task ids in the desired order, highest priority first"
                }
            },
            "required": ["task_id_sequence"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let ids: Vec<i64> = args
            .get("task_id_sequence")
            .and_then(Value::as_array)
            .ok_or_else(|| ToolError::InvalidArguments {
                detail: "task_id_sequence must be an array of integers".to_string(),
            })?
            .iter()
            .map(|v| {
                v.as_i64().ok_or_else(|| ToolError::InvalidArguments {
                    detail: format!("task_id_sequence entries must be integers, got {v}"),
                })
            })
            .collect::<Result<_, _>>()?;
        debug!(?ids, "ReorderTasksTool::execute: called");

        ctx.store.reorder(&ids)?;
        let order: Vec<String> = ctx.store.list(None)?.iter().map(|t| t.summary()).collect();
        Ok(json!({"reordered": ids.len(), "order": order}))
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
    async fn test_reorders() {
        let ctx = ctx();
        let a = ctx.store.create("A", "", None, &[]).unwrap();
        let b = ctx.store.create("B", "", None, &[]).unwrap();

        let out = ReorderTasksTool
            .execute(json!({"task_id_sequence": [b.id, a.id]}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["reordered"], json!(2));

        let titles: Vec<String> = ctx.store.list(None).unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_unknown_id_errors() {
        let ctx = ctx();
        ctx.store.create("A", "", None, &[]).unwrap();
        let err = ReorderTasksTool
            .execute(json!({"task_id_sequence": [999]}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("999"));
    }

    #[tokio::test]
    async fn test_non_integer_entry_errors() {
        let ctx = ctx();
        let err = ReorderTasksTool
            .execute(json!({"task_id_sequence": ["first"]}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("integers"));
    }
}
