//! Planner stage
//!
//! Stateless: (conversation, user_text, tool schema) in, decision out.
//! Provider failures become a decision with `llm_failed` set and a
//! retry-apology as the candidate text; the stage itself never errors.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::prompts::{PlannerPromptContext, PromptLoader};
use crate::steps::StepDraft;
use crate::tools::ToolDefinition;
use crate::trace::TraceRecorder;

use super::decision::{parse_decision, PlannerDecision};

const RETRY_APOLOGY: &str =
    "I'm having trouble reaching the language model right now. Please try again in a moment.";

/// Planner stage: one LLM call that decides which tools to run
pub struct PlannerStage {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    temperature: f32,
    max_tokens: u32,
    context_window: usize,
}

/// What the planner hands back to the orchestrator
pub struct PlannerOutput {
    pub decision: PlannerDecision,
    pub step: StepDraft,
}

impl PlannerStage {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        temperature: f32,
        max_tokens: u32,
        context_window: usize,
    ) -> Self {
        debug!(context_window, "PlannerStage::new: called");
        Self {
            llm,
            prompts,
            temperature,
            max_tokens,
            context_window,
        }
    }

    /// Run the planner for one turn
    pub async fn run(
        &self,
        conversation: &[ChatMessage],
        user_text: &str,
        tools: &[ToolDefinition],
        recorder: &mut TraceRecorder,
    ) -> PlannerOutput {
        debug!(user_text_len = user_text.len(), "PlannerStage::run: called");

        let window = bounded_window(conversation, self.context_window);
        let prompt_context = PlannerPromptContext::new(tools, window, user_text);
        let rendered = match self.prompts.render_planner(&prompt_context) {
            Ok(rendered) => rendered,
            Err(e) => {
                // Template failure is as fatal to planning as a provider
                // failure; degrade the same way.
                warn!(error = %e, "PlannerStage::run: prompt rendering failed");
                return self.failure_output(window, user_text, e.to_string(), recorder);
            }
        };

        let mut messages: Vec<ChatMessage> = window.to_vec();
        messages.push(ChatMessage::user(user_text));

        let generation = recorder.start_generation(
            "planner.llm",
            json!({"messages": messages, "user_text": user_text}),
            self.llm.model(),
        );

        let request = CompletionRequest {
            system_prompt: rendered.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        match self.llm.complete(request).await {
            Ok(response) => {
                let registered: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
                let decision = parse_decision(&response.content, |name| registered.contains(&name));
                debug!(
                    tool_call_count = decision.tool_calls.len(),
                    "PlannerStage::run: decision parsed"
                );

                let output = json!({
                    "assistant_text": decision.assistant_text,
                    "tool_calls": decision.tool_calls,
                });
                recorder.end(generation, output.clone());

                PlannerOutput {
                    step: StepDraft {
                        input_data: json!({"user_text": user_text, "context_messages": window.len()}),
                        output_data: Some(output),
                        rendered_prompt: Some(rendered),
                        llm_model: Some(response.model),
                        error: None,
                    },
                    decision,
                }
            }
            Err(e) => {
                warn!(error = %e, "PlannerStage::run: LLM call failed");
                recorder.end(generation, json!({"error": e.to_string()}));

                let decision = PlannerDecision::provider_failure(RETRY_APOLOGY);
                PlannerOutput {
                    step: StepDraft {
                        input_data: json!({"user_text": user_text, "context_messages": window.len()}),
                        output_data: Some(json!({"assistant_text": decision.assistant_text, "tool_calls": []})),
                        rendered_prompt: Some(rendered),
                        llm_model: Some(self.llm.model().to_string()),
                        error: Some(e.to_string()),
                    },
                    decision,
                }
            }
        }
    }

    fn failure_output(
        &self,
        window: &[ChatMessage],
        user_text: &str,
        error: String,
        recorder: &mut TraceRecorder,
    ) -> PlannerOutput {
        recorder.record_event("planner.render_failed", json!({"error": error}));
        let decision = PlannerDecision::provider_failure(RETRY_APOLOGY);
        PlannerOutput {
            step: StepDraft {
                input_data: json!({"user_text": user_text, "context_messages": window.len()}),
                output_data: None,
                rendered_prompt: None,
                llm_model: Some(self.llm.model().to_string()),
                error: Some(error),
            },
            decision,
        }
    }
}

/// Trailing window of the conversation the planner is allowed to see
fn bounded_window(conversation: &[ChatMessage], window: usize) -> &[ChatMessage] {
    let start = conversation.len().saturating_sub(window);
    &conversation[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlmClient;
    use crate::tools::ToolExecutor;
    use crate::trace::{NullSink, TraceRecorder};

    fn stage(client: MockLlmClient) -> PlannerStage {
        PlannerStage::new(Arc::new(client), Arc::new(PromptLoader::embedded_only()), 0.2, 512, 10)
    }

    fn recorder() -> TraceRecorder {
        TraceRecorder::new("t1", "s1", Arc::new(NullSink))
    }

    #[tokio::test]
    async fn test_planner_parses_tool_calls() {
        let raw = r#"{"reply": "Creating it", "tool_calls": [{"name": "create_task", "arguments": {"title": "Review report"}}]}"#;
        let stage = stage(MockLlmClient::with_texts(vec![raw]));
        let mut rec = recorder();

        let out = stage
            .run(&[], "Create a task to review the report", &ToolExecutor::standard().definitions(), &mut rec)
            .await;

        assert!(!out.decision.llm_failed);
        assert_eq!(out.decision.tool_calls.len(), 1);
        assert_eq!(out.step.llm_model.as_deref(), Some("mock-model"));
        assert!(out.step.rendered_prompt.as_deref().unwrap().contains("create_task"));
        assert!(out.step.error.is_none());
    }

    #[tokio::test]
    async fn test_planner_failure_degrades() {
        let stage = stage(MockLlmClient::always_failing("connection refused"));
        let mut rec = recorder();

        let out = stage
            .run(&[], "hello", &ToolExecutor::standard().definitions(), &mut rec)
            .await;

        assert!(out.decision.llm_failed);
        assert!(out.decision.tool_calls.is_empty());
        assert!(out.decision.assistant_text.contains("try again"));
        assert!(out.step.error.as_deref().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_planner_records_generation() {
        let stage = stage(MockLlmClient::with_texts(vec!["just prose"]));
        let mut rec = recorder();
        let root = rec.start_span("chat.turn", json!({}));

        stage.run(&[], "hi", &ToolExecutor::standard().definitions(), &mut rec).await;
        rec.end(root, json!({}));

        assert!(rec.node_names().contains(&"planner.llm"));
    }

    #[tokio::test]
    async fn test_window_bounds_context() {
        let conversation: Vec<ChatMessage> = (0..20).map(|i| ChatMessage::user(format!("msg {i}"))).collect();
        let window = bounded_window(&conversation, 10);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content, "msg 10");
    }
}
