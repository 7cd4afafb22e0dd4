//! Action stage
//!
//! Executes the planner's tool calls in order. One result per call, no
//! early exit on failure: a failing call is recorded and iteration moves
//! on, so the synthesizer always sees the complete picture.

use serde_json::json;
use tracing::debug;

use crate::steps::StepDraft;
use crate::tools::{ToolCall, ToolContext, ToolExecutor, ToolResult};
use crate::trace::TraceRecorder;

/// Action stage: runs a planned batch of tool calls
pub struct ActionStage {
    executor: ToolExecutor,
}

/// What the action stage hands back to the orchestrator
pub struct ActionOutput {
    pub results: Vec<ToolResult>,
    pub step: StepDraft,
}

impl ActionStage {
    pub fn new(executor: ToolExecutor) -> Self {
        debug!("ActionStage::new: called");
        Self { executor }
    }

    /// Tool definitions for the planner prompt
    pub fn definitions(&self) -> Vec<crate::tools::ToolDefinition> {
        self.executor.definitions()
    }

    /// Execute every call in order, producing exactly one result each
    pub async fn execute_all(
        &self,
        tool_calls: &[ToolCall],
        ctx: &ToolContext,
        recorder: &mut TraceRecorder,
    ) -> ActionOutput {
        debug!(call_count = tool_calls.len(), "ActionStage::execute_all: called");
        let mut results = Vec::with_capacity(tool_calls.len());

        for call in tool_calls {
            let span = recorder.start_span(
                format!("tool.execute.{}", call.name),
                json!({"arguments": call.arguments}),
            );
            recorder.record_event("tool.request", json!({"name": call.name, "arguments": call.arguments}));

            let result = self.executor.execute(call, ctx).await;

            recorder.record_event(
                "tool.response",
                json!({"name": result.name, "success": result.success, "result": result.result, "error": result.error}),
            );
            recorder.end(span, json!({"success": result.success, "result": result.result}));
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        debug!(succeeded, failed, "ActionStage::execute_all: batch done");

        let detail: Vec<_> = tool_calls
            .iter()
            .zip(&results)
            .map(|(call, result)| {
                json!({
                    "name": call.name,
                    "arguments": call.arguments,
                    "success": result.success,
                    "result": result.result,
                    "error": result.error,
                })
            })
            .collect();

        ActionOutput {
            step: StepDraft {
                input_data: json!({"tool_calls": tool_calls}),
                output_data: Some(json!({
                    "total": results.len(),
                    "succeeded": succeeded,
                    "failed": failed,
                    "results": detail,
                })),
                rendered_prompt: None,
                llm_model: None,
                error: if failed > 0 {
                    Some(format!("{failed} of {} tool call(s) failed", results.len()))
                } else {
                    None
                },
            },
            results,
        }
    }
}
