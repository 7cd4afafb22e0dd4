//! ToolContext - shared state handed to tool handlers

use std::sync::Arc;

use tracing::debug;

use taskboard::TaskStore;

/// Context passed to every tool execution
///
/// The task store handle is the only mutable surface tools get; the
/// session id is carried for dedup heuristics and diagnostics.
#[derive(Clone)]
pub struct ToolContext {
    /// Task store all built-in tools operate on
    pub store: Arc<TaskStore>,

    /// Session this turn belongs to
    pub session_id: String,
}

impl ToolContext {
    pub fn new(store: Arc<TaskStore>, session_id: impl Into<String>) -> Self {
        let session_id = session_id.into();
        debug!(%session_id, "ToolContext::new: called");
        Self { store, session_id }
    }
}
