//! TurnOrchestrator - drives one turn through the pipeline
//!
//! started → planning → acting (skipped when the planner emits no tool
//! calls) → synthesizing → completed. Stage-level failures (LLM errors,
//! tool errors) are absorbed by the stages themselves; the orchestrator
//! only errors on its own machinery, e.g. a step-log write failing under
//! the abort policy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::{eyre, Result};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use taskboard::TaskStore;

use crate::config::{StepLogPolicy, TurnConfig};
use crate::llm::{ChatMessage, LlmClient};
use crate::prompts::PromptLoader;
use crate::steps::{Step, StepDraft, StepLogger, StepType, TurnStatus};
use crate::tools::{ToolContext, ToolExecutor, ToolResult};
use crate::trace::{TraceRecorder, TraceSink};

use super::action::ActionStage;
use super::planner::PlannerStage;
use super::synthesizer::SynthesizerStage;

/// Cooperative cancellation checked between stages
///
/// Cancellation never interrupts a stage mid-flight; the turn stops at
/// the next stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        debug!("CancelFlag::cancel: called");
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Input for one turn
pub struct TurnRequest {
    pub session_id: String,
    pub user_text: String,
    /// Routing label carried on the turn record and trace root
    pub domain: String,
    /// Prior conversation, oldest first
    pub conversation: Vec<ChatMessage>,
    /// Optional cooperative cancellation handle
    pub cancel: Option<CancelFlag>,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_text: user_text.into(),
            domain: "task_management".to_string(),
            conversation: Vec::new(),
            cancel: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_conversation(mut self, conversation: Vec<ChatMessage>) -> Self {
        self.conversation = conversation;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Outcome of one turn
#[derive(Debug)]
pub struct TurnResult {
    pub turn_id: String,
    pub final_text: String,
    pub tool_results: Vec<ToolResult>,
    pub status: TurnStatus,
    /// The step records appended this turn, in order. Kept in memory so
    /// callers still see them when the continue policy swallowed a write.
    pub steps: Vec<Step>,
}

/// Drives the planner → action → synthesizer pipeline for one turn at a time
pub struct TurnOrchestrator {
    planner: PlannerStage,
    action: ActionStage,
    synthesizer: SynthesizerStage,
    steps: Arc<StepLogger>,
    sink: Arc<dyn TraceSink>,
    store: Arc<TaskStore>,
    step_policy: StepLogPolicy,
}

impl TurnOrchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: ToolExecutor,
        prompts: Arc<PromptLoader>,
        steps: Arc<StepLogger>,
        sink: Arc<dyn TraceSink>,
        store: Arc<TaskStore>,
        turn_config: &TurnConfig,
        temperature: f32,
        max_tokens: u32,
        step_policy: StepLogPolicy,
    ) -> Self {
        debug!("TurnOrchestrator::new: called");
        Self {
            planner: PlannerStage::new(
                llm.clone(),
                prompts.clone(),
                temperature,
                max_tokens,
                turn_config.context_window,
            ),
            action: ActionStage::new(executor),
            synthesizer: SynthesizerStage::new(llm, prompts, temperature, max_tokens, turn_config.context_window),
            steps,
            sink,
            store,
            step_policy,
        }
    }

    /// Run one full turn
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnResult> {
        let turn_id = Uuid::now_v7().to_string();
        info!(%turn_id, session_id = %request.session_id, "TurnOrchestrator::run_turn: started");

        if let Err(e) =
            self.steps
                .begin_turn(&turn_id, &request.session_id, &request.user_text, &request.domain)
        {
            match self.step_policy {
                StepLogPolicy::Continue => {
                    warn!(%turn_id, error = %e, "TurnOrchestrator::run_turn: could not record turn start, continuing");
                }
                StepLogPolicy::Abort => {
                    return Err(eyre!("Failed to record turn start: {e}"));
                }
            }
        }

        let mut recorder = TraceRecorder::new(&turn_id, &request.session_id, self.sink.clone());
        let root = recorder.start_span(
            "chat.turn",
            json!({
                "user_text": request.user_text,
                "session_id": request.session_id,
                "domain": request.domain,
            }),
        );
        let mut steps: Vec<Step> = Vec::new();

        // Planning
        let planner_out = self
            .planner
            .run(
                &request.conversation,
                &request.user_text,
                &self.action.definitions(),
                &mut recorder,
            )
            .await;
        if let Err(e) = self.log_step(&turn_id, StepType::PlannerLlm, planner_out.step, &mut steps) {
            return self.abort(&turn_id, root, recorder, e).await;
        }

        // Planner provider failure: nothing for the synthesizer to add,
        // return the retry text directly.
        if planner_out.decision.llm_failed {
            warn!(%turn_id, "TurnOrchestrator::run_turn: planner LLM failed, short-circuiting");
            let final_text = planner_out.decision.assistant_text;
            recorder.end(root, json!({"final_text": final_text, "total_steps": steps.len(), "short_circuit": true}));
            recorder.flush().await;
            self.record_completion(&turn_id, &final_text)?;
            return Ok(TurnResult {
                turn_id,
                final_text,
                tool_results: Vec::new(),
                status: TurnStatus::Completed,
                steps,
            });
        }

        if let Err(e) = self.check_cancel(&request) {
            return self.abort(&turn_id, root, recorder, e).await;
        }

        // Acting, only when the planner asked for it
        let tool_results = if planner_out.decision.tool_calls.is_empty() {
            debug!(%turn_id, "TurnOrchestrator::run_turn: no tool calls, skipping action stage");
            Vec::new()
        } else {
            let ctx = ToolContext::new(self.store.clone(), &request.session_id);
            let action_out = self
                .action
                .execute_all(&planner_out.decision.tool_calls, &ctx, &mut recorder)
                .await;
            if let Err(e) = self.log_step(&turn_id, StepType::ActionExec, action_out.step, &mut steps) {
                return self.abort(&turn_id, root, recorder, e).await;
            }
            action_out.results
        };

        if let Err(e) = self.check_cancel(&request) {
            return self.abort(&turn_id, root, recorder, e).await;
        }

        // Synthesizing always runs, even with nothing to report
        let synth_out = self
            .synthesizer
            .run(&request.conversation, &request.user_text, &tool_results, &mut recorder)
            .await;
        if let Err(e) = self.log_step(&turn_id, StepType::SynthesizerLlm, synth_out.step, &mut steps) {
            return self.abort(&turn_id, root, recorder, e).await;
        }
        let final_text = synth_out.final_text;

        recorder.end(root, json!({"final_text": final_text, "total_steps": steps.len()}));
        recorder.flush().await;

        self.record_completion(&turn_id, &final_text)?;
        info!(%turn_id, steps_logged = steps.len(), "TurnOrchestrator::run_turn: completed");

        Ok(TurnResult {
            turn_id,
            final_text,
            tool_results,
            status: TurnStatus::Completed,
            steps,
        })
    }

    /// Append one step, honoring the configured failure policy
    ///
    /// The returned record lands in `steps` either way; when the continue
    /// policy swallows a write failure the record is rebuilt from the draft
    /// so the caller still gets the full in-memory sequence.
    fn log_step(
        &self,
        turn_id: &str,
        step_type: StepType,
        draft: StepDraft,
        steps: &mut Vec<Step>,
    ) -> Result<()> {
        match self.steps.log_step(turn_id, step_type, draft.clone()) {
            Ok(step) => {
                steps.push(step);
                Ok(())
            }
            Err(e) => match self.step_policy {
                StepLogPolicy::Continue => {
                    warn!(%turn_id, error = %e, "TurnOrchestrator::log_step: step log write failed, continuing with degraded observability");
                    steps.push(Step {
                        turn_id: turn_id.to_string(),
                        step_number: steps.len() as i64 + 1,
                        step_type,
                        input_data: draft.input_data,
                        output_data: draft.output_data,
                        rendered_prompt: draft.rendered_prompt,
                        llm_model: draft.llm_model,
                        error: draft.error,
                        created_at: chrono::Utc::now(),
                    });
                    Ok(())
                }
                StepLogPolicy::Abort => Err(eyre!("Step log write failed: {e}")),
            },
        }
    }

    /// Flip the turn record to completed, honoring the failure policy
    fn record_completion(&self, turn_id: &str, final_text: &str) -> Result<()> {
        match self.steps.complete_turn(turn_id, final_text) {
            Ok(()) => Ok(()),
            Err(e) => match self.step_policy {
                StepLogPolicy::Continue => {
                    warn!(%turn_id, error = %e, "TurnOrchestrator::record_completion: could not record turn completion");
                    Ok(())
                }
                StepLogPolicy::Abort => Err(eyre!("Failed to record turn completion: {e}")),
            },
        }
    }

    fn check_cancel(&self, request: &TurnRequest) -> Result<()> {
        if request.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(eyre!("Turn cancelled"));
        }
        Ok(())
    }

    /// Unrecoverable orchestration failure: mark everything and bail
    async fn abort(
        &self,
        turn_id: &str,
        root: crate::trace::SpanHandle,
        mut recorder: TraceRecorder,
        error: eyre::Report,
    ) -> Result<TurnResult> {
        warn!(%turn_id, error = %error, "TurnOrchestrator::abort: turn errored");
        recorder.end(root, json!({"error": error.to_string()}));
        recorder.flush().await;
        if let Err(e) = self.steps.fail_turn(turn_id) {
            warn!(%turn_id, error = %e, "TurnOrchestrator::abort: could not record turn failure");
        }
        Err(error)
    }
}
