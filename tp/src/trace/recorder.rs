//! TraceRecorder - turn-local hierarchical span recording
//!
//! One recorder exists per turn, so concurrent turns cannot contaminate
//! each other's span nesting. New spans become children of whatever is
//! currently on top of the recorder's stack; callers never pass parent
//! handles. Recording operations cannot fail, and exporting to the sink
//! is best-effort: any sink error is logged and swallowed.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use super::node::{ExportNode, NodeEntry, NodeKind, SpanHandle, TraceExport};
use super::sink::TraceSink;

/// Records one turn's trace tree and exports it on flush
pub struct TraceRecorder {
    turn_id: String,
    session_id: String,
    nodes: Vec<NodeEntry>,
    /// Stack of open span/generation indices; top is "current"
    stack: Vec<usize>,
    /// Arena index of the root span
    root: Option<usize>,
    sink: Arc<dyn TraceSink>,
}

impl TraceRecorder {
    /// Create a recorder for one turn
    pub fn new(turn_id: impl Into<String>, session_id: impl Into<String>, sink: Arc<dyn TraceSink>) -> Self {
        let turn_id = turn_id.into();
        debug!(%turn_id, "TraceRecorder::new: called");
        Self {
            turn_id,
            session_id: session_id.into(),
            nodes: Vec::new(),
            stack: Vec::new(),
            root: None,
            sink,
        }
    }

    /// Start a span as a child of the current span (or as the root)
    pub fn start_span(&mut self, name: impl Into<String>, input: Value) -> SpanHandle {
        self.start_node(NodeKind::Span, name.into(), input, None)
    }

    /// Start an LLM-generation span as a child of the current span
    pub fn start_generation(&mut self, name: impl Into<String>, input: Value, model: impl Into<String>) -> SpanHandle {
        self.start_node(NodeKind::Generation, name.into(), input, Some(model.into()))
    }

    /// Attach a point-in-time event under the current span
    pub fn record_event(&mut self, name: impl Into<String>, payload: Value) {
        let name = name.into();
        debug!(turn_id = %self.turn_id, %name, "TraceRecorder::record_event: called");
        let now = Utc::now();
        let idx = self.nodes.len();
        self.nodes.push(NodeEntry {
            kind: NodeKind::Event,
            name,
            input: payload,
            output: None,
            model: None,
            started_at: now,
            ended_at: Some(now),
            children: Vec::new(),
        });
        self.attach_to_current(idx);
    }

    /// End a span with the given output
    ///
    /// Idempotent: ending an already-ended handle changes nothing. Any
    /// still-open nodes above the handle on the stack are popped with it.
    pub fn end(&mut self, handle: SpanHandle, output: Value) {
        debug!(turn_id = %self.turn_id, node = handle.0, "TraceRecorder::end: called");
        let entry = match self.nodes.get_mut(handle.0) {
            Some(entry) => entry,
            None => return,
        };
        if entry.ended() {
            debug!(turn_id = %self.turn_id, node = handle.0, "TraceRecorder::end: already ended, ignoring");
            return;
        }
        entry.output = Some(output);
        entry.ended_at = Some(Utc::now());

        if let Some(pos) = self.stack.iter().rposition(|&idx| idx == handle.0) {
            self.stack.truncate(pos);
        }
    }

    /// Export the recorded tree to the sink
    ///
    /// Safe to call with nothing recorded. Sink failures are logged and
    /// swallowed; tracing must never fail a turn.
    pub async fn flush(&self) {
        debug!(turn_id = %self.turn_id, node_count = self.nodes.len(), "TraceRecorder::flush: called");
        let export = TraceExport {
            turn_id: self.turn_id.clone(),
            session_id: self.session_id.clone(),
            root: self.root.map(|idx| self.export_node(idx)),
        };
        if let Err(e) = self.sink.export(&export).await {
            warn!(turn_id = %self.turn_id, error = %e, "TraceRecorder::flush: sink export failed, trace dropped");
        }
    }

    /// Recorded output of a node, for tests and diagnostics
    pub fn node_output(&self, handle: SpanHandle) -> Option<&Value> {
        self.nodes.get(handle.0).and_then(|n| n.output.as_ref())
    }

    /// Names of all recorded nodes in creation order
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    fn start_node(&mut self, kind: NodeKind, name: String, input: Value, model: Option<String>) -> SpanHandle {
        debug!(turn_id = %self.turn_id, %name, ?kind, "TraceRecorder::start_node: called");
        let idx = self.nodes.len();
        self.nodes.push(NodeEntry {
            kind,
            name,
            input,
            output: None,
            model,
            started_at: Utc::now(),
            ended_at: None,
            children: Vec::new(),
        });
        self.attach_to_current(idx);
        self.stack.push(idx);
        SpanHandle(idx)
    }

    fn attach_to_current(&mut self, idx: usize) {
        match self.stack.last().copied() {
            Some(parent) => self.nodes[parent].children.push(idx),
            None => {
                if self.root.is_none() {
                    self.root = Some(idx);
                }
                // Nodes recorded after the root closed are dropped from the
                // tree; they still exist in the arena for diagnostics.
            }
        }
    }

    fn export_node(&self, idx: usize) -> ExportNode {
        let entry = &self.nodes[idx];
        ExportNode {
            kind: entry.kind,
            name: entry.name.clone(),
            input: entry.input.clone(),
            output: entry.output.clone(),
            model: entry.model.clone(),
            started_at: entry.started_at,
            ended_at: entry.ended_at,
            children: entry.children.iter().map(|&child| self.export_node(child)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::sink::{FailingSink, NullSink, RecordingSink};
    use serde_json::json;

    fn recorder() -> TraceRecorder {
        TraceRecorder::new("turn-1", "session-1", Arc::new(NullSink))
    }

    #[test]
    fn test_nesting_follows_stack() {
        let mut rec = recorder();
        let root = rec.start_span("chat.turn", json!({}));
        let child = rec.start_span("planner", json!({}));
        rec.end(child, json!({"ok": true}));
        let sibling = rec.start_span("action", json!({}));
        rec.end(sibling, json!({}));
        rec.end(root, json!({}));

        // root has two children, both direct
        assert_eq!(rec.nodes[root.0].children, vec![child.0, sibling.0]);
        assert!(rec.nodes[child.0].children.is_empty());
    }

    #[test]
    fn test_generation_records_model() {
        let mut rec = recorder();
        let root = rec.start_span("chat.turn", json!({}));
        let generation = rec.start_generation("planner.llm", json!({"messages": []}), "llama3.1");
        rec.end(generation, json!({"text": "hi"}));
        rec.end(root, json!({}));

        assert_eq!(rec.nodes[generation.0].kind, NodeKind::Generation);
        assert_eq!(rec.nodes[generation.0].model.as_deref(), Some("llama3.1"));
    }

    #[test]
    fn test_event_is_leaf_under_current() {
        let mut rec = recorder();
        let root = rec.start_span("chat.turn", json!({}));
        rec.record_event("tool.request", json!({"name": "no_op"}));
        rec.end(root, json!({}));

        let event_idx = rec.nodes[root.0].children[0];
        assert_eq!(rec.nodes[event_idx].kind, NodeKind::Event);
        assert!(rec.nodes[event_idx].ended());
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut rec = recorder();
        let span = rec.start_span("once", json!({}));
        rec.end(span, json!({"first": true}));
        let first_output = rec.node_output(span).cloned();
        let first_ended = rec.nodes[span.0].ended_at;

        rec.end(span, json!({"second": true}));

        assert_eq!(rec.node_output(span).cloned(), first_output);
        assert_eq!(rec.nodes[span.0].ended_at, first_ended);
    }

    #[test]
    fn test_open_node_has_no_output() {
        let mut rec = recorder();
        let span = rec.start_span("open", json!({}));
        assert!(rec.node_output(span).is_none());
    }

    #[test]
    fn test_end_pops_unclosed_children() {
        let mut rec = recorder();
        let root = rec.start_span("chat.turn", json!({}));
        let _forgotten = rec.start_span("leaked", json!({}));
        rec.end(root, json!({}));

        // Stack is fully unwound; new spans would become orphans, not
        // children of the leaked span.
        assert!(rec.stack.is_empty());
    }

    #[tokio::test]
    async fn test_flush_empty_is_safe() {
        let rec = recorder();
        rec.flush().await;
    }

    #[tokio::test]
    async fn test_flush_exports_tree() {
        let sink = Arc::new(RecordingSink::new());
        let mut rec = TraceRecorder::new("turn-2", "session-2", sink.clone());
        let root = rec.start_span("chat.turn", json!({"user_text": "hi"}));
        rec.end(root, json!({"final_text": "hello"}));
        rec.flush().await;

        let exports = sink.exports();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].turn_id, "turn-2");
        assert_eq!(exports[0].root.as_ref().unwrap().name, "chat.turn");
    }

    #[tokio::test]
    async fn test_failing_sink_never_panics() {
        let mut rec = TraceRecorder::new("turn-3", "session-3", Arc::new(FailingSink));
        let root = rec.start_span("chat.turn", json!({}));
        rec.end(root, json!({}));
        rec.flush().await;
    }
}
