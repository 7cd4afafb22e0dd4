//! Task store error types

use thiserror::Error;

/// Errors that can occur during task store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task not found: {id}")]
    NotFound { id: i64 },

    #[error("Invalid status '{status}' (expected open, in_progress, or done)")]
    InvalidStatus { status: String },

    #[error("Task title must not be empty")]
    EmptyTitle,

    #[error("Reorder list does not match stored tasks: {detail}")]
    InvalidReorder { detail: String },

    #[error("Task store lock poisoned")]
    LockPoisoned,

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = StoreError::NotFound { id: 42 };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_invalid_status_message() {
        let err = StoreError::InvalidStatus {
            status: "bad_status".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bad_status"));
        assert!(msg.contains("in_progress"));
    }
}
