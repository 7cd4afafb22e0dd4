//! Tool registry, executor, and built-in tools
//!
//! The executor is the only component in the agent core that touches the
//! task store. Every failure (unknown tool, bad arguments, store error,
//! timeout) is absorbed into an error `ToolResult` so a planned batch
//! always yields one result per call.

pub mod builtin;
mod context;
mod executor;
mod traits;

pub use context::ToolContext;
pub use executor::ToolExecutor;
pub use traits::{Tool, ToolCall, ToolDefinition, ToolResult};

use thiserror::Error;

/// Typed errors a tool handler can raise
///
/// These never cross the executor boundary; they become `ToolResult`
/// error strings.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {detail}")]
    InvalidArguments { detail: String },

    #[error("{0}")]
    Store(#[from] taskboard::StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
