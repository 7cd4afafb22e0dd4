//! Synthesizer stage
//!
//! Turns the turn's tool results into the final user-facing text. If the
//! LLM provider is down, a template fallback built straight from the
//! results guarantees the user still gets a real answer.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::prompts::{PromptLoader, SynthesizerPromptContext};
use crate::steps::StepDraft;
use crate::tools::ToolResult;
use crate::trace::TraceRecorder;

/// Synthesizer stage: one LLM call that writes the final reply
pub struct SynthesizerStage {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    temperature: f32,
    max_tokens: u32,
    context_window: usize,
}

/// What the synthesizer hands back to the orchestrator
pub struct SynthesizerOutput {
    pub final_text: String,
    pub step: StepDraft,
}

impl SynthesizerStage {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        temperature: f32,
        max_tokens: u32,
        context_window: usize,
    ) -> Self {
        debug!(context_window, "SynthesizerStage::new: called");
        Self {
            llm,
            prompts,
            temperature,
            max_tokens,
            context_window,
        }
    }

    /// Produce the final text for one turn
    pub async fn run(
        &self,
        conversation: &[ChatMessage],
        user_text: &str,
        results: &[ToolResult],
        recorder: &mut TraceRecorder,
    ) -> SynthesizerOutput {
        debug!(result_count = results.len(), "SynthesizerStage::run: called");

        let start = conversation.len().saturating_sub(self.context_window);
        let window = &conversation[start..];

        let prompt_context = SynthesizerPromptContext::new(window, user_text, results);
        let rendered = match self.prompts.render_synthesizer(&prompt_context) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(error = %e, "SynthesizerStage::run: prompt rendering failed, using fallback");
                let final_text = fallback_text(results);
                recorder.record_event("synthesizer.render_failed", json!({"error": e.to_string()}));
                return SynthesizerOutput {
                    step: StepDraft {
                        input_data: json!({"user_text": user_text, "result_count": results.len()}),
                        output_data: Some(json!({"final_text": final_text, "fallback": true})),
                        rendered_prompt: None,
                        llm_model: Some(self.llm.model().to_string()),
                        error: Some(e.to_string()),
                    },
                    final_text,
                };
            }
        };

        let mut messages: Vec<ChatMessage> = window.to_vec();
        messages.push(ChatMessage::user(user_text));

        let generation = recorder.start_generation(
            "synthesizer.llm",
            json!({"messages": messages, "results": results}),
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
                let final_text = response.content.trim().to_string();
                recorder.end(generation, json!({"final_text": final_text}));
                SynthesizerOutput {
                    step: StepDraft {
                        input_data: json!({"user_text": user_text, "result_count": results.len()}),
                        output_data: Some(json!({"final_text": final_text, "fallback": false})),
                        rendered_prompt: Some(rendered),
                        llm_model: Some(response.model),
                        error: None,
                    },
                    final_text,
                }
            }
            Err(e) => {
                warn!(error = %e, "SynthesizerStage::run: LLM call failed, using fallback");
                let final_text = fallback_text(results);
                recorder.end(generation, json!({"final_text": final_text, "error": e.to_string()}));
                SynthesizerOutput {
                    step: StepDraft {
                        input_data: json!({"user_text": user_text, "result_count": results.len()}),
                        output_data: Some(json!({"final_text": final_text, "fallback": true})),
                        rendered_prompt: Some(rendered),
                        llm_model: Some(self.llm.model().to_string()),
                        error: Some(e.to_string()),
                    },
                    final_text,
                }
            }
        }
    }
}

/// Deterministic reply built straight from the tool results
fn fallback_text(results: &[ToolResult]) -> String {
    if results.is_empty() {
        return "I couldn't generate a full reply right now. No task changes were made.".to_string();
    }

    let mut lines = vec!["Here's what happened:".to_string()];
    for result in results {
        if result.success {
            lines.push(format!("- {}", result.summary()));
        } else {
            lines.push(format!(
                "- I couldn't complete {}: {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlmClient;
    use crate::trace::NullSink;

    fn stage(client: MockLlmClient) -> SynthesizerStage {
        SynthesizerStage::new(Arc::new(client), Arc::new(PromptLoader::embedded_only()), 0.2, 512, 10)
    }

    fn recorder() -> TraceRecorder {
        TraceRecorder::new("t1", "s1", Arc::new(NullSink))
    }

    #[tokio::test]
    async fn test_returns_completion_verbatim() {
        let stage = stage(MockLlmClient::with_texts(vec!["Created \"Review report\" for you."]));
        let mut rec = recorder();

        let results = vec![ToolResult::success("create_task", json!({"task": {"title": "Review report"}}))];
        let out = stage.run(&[], "create it", &results, &mut rec).await;

        assert_eq!(out.final_text, "Created \"Review report\" for you.");
        assert!(out.step.error.is_none());
        assert_eq!(out.step.output_data.as_ref().unwrap()["fallback"], json!(false));
    }

    #[tokio::test]
    async fn test_fallback_on_llm_failure() {
        let stage = stage(MockLlmClient::always_failing("provider down"));
        let mut rec = recorder();

        let results = vec![
            ToolResult::success("create_task", json!({"task": {"title": "A"}})),
            ToolResult::error("fetch_tasks", "store exploded"),
        ];
        let out = stage.run(&[], "do things", &results, &mut rec).await;

        assert!(out.final_text.contains("create_task"));
        assert!(out.final_text.contains("store exploded"));
        assert!(out.step.error.as_deref().unwrap().contains("provider down"));
        assert_eq!(out.step.output_data.as_ref().unwrap()["fallback"], json!(true));
    }

    #[tokio::test]
    async fn test_fallback_with_no_results_still_speaks() {
        let stage = stage(MockLlmClient::always_failing("provider down"));
        let mut rec = recorder();

        let out = stage.run(&[], "hello", &[], &mut rec).await;
        assert!(!out.final_text.is_empty());
        assert!(out.final_text.contains("No task changes"));
    }

    #[tokio::test]
    async fn test_records_generation_span() {
        let stage = stage(MockLlmClient::with_texts(vec!["ok"]));
        let mut rec = recorder();
        let root = rec.start_span("chat.turn", json!({}));

        stage.run(&[], "hi", &[], &mut rec).await;
        rec.end(root, json!({}));

        assert!(rec.node_names().contains(&"synthesizer.llm"));
    }
}
