//! Task domain type
//!
//! A task carries a status lifecycle and timestamp bookkeeping: entering
//! `in_progress` stamps `started_at`, entering `done` stamps `completed_at`,
//! and leaving `done` clears `completed_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Parse from the wire/database string form
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        debug!(%s, "TaskStatus::parse: called");
        match s {
            "open" => Ok(TaskStatus::Open),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(StoreError::InvalidStatus {
                status: other.to_string(),
            }),
        }
    }

    /// Database/wire string form
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single task record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Row id assigned by the store
    pub id: i64,

    /// Task title (required, non-empty)
    pub title: String,

    /// Optional longer description
    pub description: String,

    /// Optional project tag
    pub project: Option<String>,

    /// Free-form category tags
    pub categories: Vec<String>,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// Manual ordering position (lower sorts first)
    pub position: i64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Stamped when the task first enters in_progress
    pub started_at: Option<DateTime<Utc>>,

    /// Stamped when the task enters done, cleared when it leaves
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Apply a status change with timestamp bookkeeping
    pub fn set_status(&mut self, status: TaskStatus) {
        debug!(id = self.id, from = %self.status, to = %status, "Task::set_status: called");
        match status {
            TaskStatus::InProgress => {
                if self.started_at.is_none() {
                    self.started_at = Some(Utc::now());
                }
                self.completed_at = None;
            }
            TaskStatus::Done => {
                self.completed_at = Some(Utc::now());
            }
            TaskStatus::Open => {
                self.completed_at = None;
            }
        }
        self.status = status;
    }

    /// One-line human-readable summary, e.g. `[3] Review report (open)`
    pub fn summary(&self) -> String {
        format!("[{}] {} ({})", self.id, self.title, self.status)
    }
}
