//! Turn pipeline: planner → action → synthesizer
//!
//! The orchestrator drives one turn at a time through the three stages,
//! recording a trace tree and appending one step-log row per stage.
//! Handled failures (LLM errors, tool errors) stay inside their stage;
//! only orchestration machinery failures surface as errors.

mod action;
mod decision;
mod orchestrator;
mod planner;
mod synthesizer;

pub use action::ActionStage;
pub use decision::{parse_decision, PlannerDecision};
pub use orchestrator::{CancelFlag, TurnOrchestrator, TurnRequest, TurnResult};
pub use planner::PlannerStage;
pub use synthesizer::SynthesizerStage;
