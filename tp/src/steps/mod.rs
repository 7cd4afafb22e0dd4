//! Append-only step logging
//!
//! Each turn produces one `turns` row plus an `agent_steps` row per
//! pipeline stage. Rows are never updated after insert (turns flip to a
//! terminal status once, steps are append-only), which makes the log a
//! faithful replay source for any past turn.

mod logger;
mod types;

pub use logger::StepLogger;
pub use types::{Step, StepDraft, StepType, TurnRecord, TurnStatus};

use thiserror::Error;

/// Step log failures
#[derive(Debug, Error)]
pub enum StepLogError {
    #[error("Turn not found: {turn_id}")]
    TurnNotFound { turn_id: String },

    #[error("Invalid step type: {step_type}")]
    InvalidStepType { step_type: String },

    #[error("Invalid turn status: {status}")]
    InvalidTurnStatus { status: String },

    #[error("Invalid timestamp in step log: {value}")]
    InvalidTimestamp { value: String },

    #[error("Step log lock poisoned")]
    LockPoisoned,

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
