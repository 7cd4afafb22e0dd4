//! Step log record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StepLogError;

/// Which pipeline stage produced a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Planner LLM call
    PlannerLlm,
    /// Tool execution batch
    ActionExec,
    /// Synthesizer LLM call
    SynthesizerLlm,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::PlannerLlm => "planner_llm",
            StepType::ActionExec => "action_exec",
            StepType::SynthesizerLlm => "synthesizer_llm",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StepLogError> {
        match s {
            "planner_llm" => Ok(StepType::PlannerLlm),
            "action_exec" => Ok(StepType::ActionExec),
            "synthesizer_llm" => Ok(StepType::SynthesizerLlm),
            _ => Err(StepLogError::InvalidStepType { step_type: s.to_string() }),
        }
    }
}

/// One appended step record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Turn this step belongs to
    pub turn_id: String,

    /// 1-based position within the turn, assigned by the logger
    pub step_number: i64,

    /// Pipeline stage
    pub step_type: StepType,

    /// Stage input (messages, tool calls, etc.)
    pub input_data: Value,

    /// Stage output, if the stage produced one
    pub output_data: Option<Value>,

    /// Full prompt text sent to the LLM (LLM steps only)
    pub rendered_prompt: Option<String>,

    /// Model identifier (LLM steps only)
    pub llm_model: Option<String>,

    /// Error description if the stage degraded or failed
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Fields a caller supplies when appending a step
///
/// The logger fills in `step_number` and `created_at`.
#[derive(Debug, Clone, Default)]
pub struct StepDraft {
    pub input_data: Value,
    pub output_data: Option<Value>,
    pub rendered_prompt: Option<String>,
    pub llm_model: Option<String>,
    pub error: Option<String>,
}

/// Terminal or in-flight state of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    InProgress,
    Completed,
    Failed,
}

impl TurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStatus::InProgress => "in_progress",
            TurnStatus::Completed => "completed",
            TurnStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self, StepLogError> {
        match s {
            "in_progress" => Ok(TurnStatus::InProgress),
            "completed" => Ok(TurnStatus::Completed),
            "failed" => Ok(TurnStatus::Failed),
            _ => Err(StepLogError::InvalidTurnStatus { status: s.to_string() }),
        }
    }
}

/// One turn's summary row, linking its steps to a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn_id: String,
    pub session_id: String,
    pub user_text: String,
    /// Caller-supplied routing label, e.g. "task_management"
    pub domain: String,
    pub final_text: Option<String>,
    pub status: TurnStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_type_round_trips() {
        for st in [StepType::PlannerLlm, StepType::ActionExec, StepType::SynthesizerLlm] {
            assert_eq!(StepType::parse(st.as_str()).unwrap(), st);
        }
    }

    #[test]
    fn test_step_type_rejects_unknown() {
        assert!(StepType::parse("observer_llm").is_err());
    }

    #[test]
    fn test_turn_status_round_trips() {
        for ts in [TurnStatus::InProgress, TurnStatus::Completed, TurnStatus::Failed] {
            assert_eq!(TurnStatus::parse(ts.as_str()).unwrap(), ts);
        }
    }
}
