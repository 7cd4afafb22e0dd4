//! fetch_tasks tool

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use taskboard::TaskStatus;

use crate::tools::{Tool, ToolContext, ToolError};

/// List tasks, optionally filtered by status
pub struct FetchTasksTool;

#[async_trait]
impl Tool for FetchTasksTool {
    fn name(&self) -> &'static str {
        "fetch_tasks"
    }

    fn description(&self) -> &'static str {
        "List tasks in priority order, optionally filtered by status (open, in_progress, done)"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {
                    "type": "string",
                    "description": "Filter to one status: open, in_progress, or done"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let status = match args.get("status").and_then(Value::as_str) {
            Some(s) => Some(TaskStatus::parse(s)?),
            None => None,
        };
        debug!(?status, "FetchTasksTool::execute: called");

        let tasks = ctx.store.list(status)?;
        let summaries: Vec<String> = tasks.iter().map(|t| t.summary()).collect();
        Ok(json!({
            "count": tasks.len(),
            "tasks": tasks,
            "summaries": summaries,
        }))
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
    async fn test_fetch_all() {
        let ctx = ctx();
        ctx.store.create("A", "", None, &[]).unwrap();
        ctx.store.create("B", "", None, &[]).unwrap();

        let out = FetchTasksTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(out["count"], json!(2));
        assert_eq!(out["summaries"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_filtered() {
        let ctx = ctx();
        let a = ctx.store.create("A", "", None, &[]).unwrap();
        ctx.store.create("B", "", None, &[]).unwrap();
        ctx.store.update_status(a.id, TaskStatus::Done).unwrap();

        let out = FetchTasksTool.execute(json!({"status": "open"}), &ctx).await.unwrap();
        assert_eq!(out["count"], json!(1));
        assert_eq!(out["tasks"][0]["title"], json!("B"));
    }

    #[tokio::test]
    async fn test_invalid_status_errors() {
        let ctx = ctx();
        let err = FetchTasksTool
            .execute(json!({"status": "someday"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("someday"));
    }
}
