//! Trace tree node types
//!
//! A turn's trace is a tree: the root span, nested spans and generations
//! (with duration), and point-in-time events as leaves. Nodes live in an
//! arena owned by the recorder; the export form is the recursive tree.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// What kind of node an arena entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A span with duration
    Span,
    /// A span semantically tagged as an LLM call
    Generation,
    /// A point-in-time annotation, always a leaf
    Event,
}

/// One entry in the recorder's node arena
#[derive(Debug, Clone)]
pub struct NodeEntry {
    pub kind: NodeKind,
    pub name: String,
    pub input: Value,
    /// Set when the node ends; None while open (events end immediately)
    pub output: Option<Value>,
    /// Model identifier, generations only
    pub model: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Child arena indices, in creation order
    pub children: Vec<usize>,
}

impl NodeEntry {
    pub fn ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Handle to a span or generation in a recorder's arena
///
/// Only meaningful for the recorder that issued it. Ending twice is a
/// no-op, so cleanup code may end defensively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanHandle(pub(crate) usize);

/// Exported trace tree for one turn, as sent to the sink
#[derive(Debug, Clone, Serialize)]
pub struct TraceExport {
    pub turn_id: String,
    pub session_id: String,
    pub root: Option<ExportNode>,
}

/// Recursive export form of a trace node
#[derive(Debug, Clone, Serialize)]
pub struct ExportNode {
    pub kind: NodeKind,
    pub name: String,
    pub input: Value,
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub children: Vec<ExportNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_serializes_snake_case() {
        let json = serde_json::to_string(&NodeKind::Generation).unwrap();
        assert_eq!(json, "\"generation\"");
    }

    #[test]
    fn test_export_skips_missing_model() {
        let node = ExportNode {
            kind: NodeKind::Span,
            name: "chat.turn".to_string(),
            input: serde_json::json!({}),
            output: None,
            model: None,
            started_at: Utc::now(),
            ended_at: None,
            children: vec![],
        };
        let json = serde_json::to_string(&node).unwrap();
        assert!(!json.contains("model"));
    }
}
