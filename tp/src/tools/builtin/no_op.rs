//! no_op tool

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolError};

/// Explicit "do nothing" signal from the planner
///
/// Having a registered no-op keeps the planner honest: deciding to take
/// no action is still an explicit, traced decision rather than an empty
/// tool list that could also mean a parse failure.
pub struct NoOpTool;

#[async_trait]
impl Tool for NoOpTool {
    fn name(&self) -> &'static str {
        "no_op"
    }

    fn description(&self) -> &'static str {
        "Take no action; use when the user's message requires no task changes"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        debug!("NoOpTool::execute: called");
        Ok(json!({"message": "No action taken"}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolContext;
    use std::sync::Arc;
    use taskboard::TaskStore;

    #[tokio::test]
    async fn test_no_op_succeeds() {
        let ctx = ToolContext::new(Arc::new(TaskStore::open_in_memory().unwrap()), "s1");
        let out = NoOpTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(out["message"], json!("No action taken"));
    }
}
