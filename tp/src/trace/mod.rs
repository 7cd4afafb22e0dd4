//! Hierarchical turn tracing
//!
//! Each turn owns one `TraceRecorder`. Stages open spans and generations,
//! attach events, and the orchestrator flushes the finished tree to the
//! configured sink after the turn completes. Export is best-effort and
//! never affects turn outcome.

mod node;
mod recorder;
mod sink;

pub use node::{ExportNode, NodeKind, SpanHandle, TraceExport};
pub use recorder::TraceRecorder;
pub use sink::{create_sink, FailingSink, HttpSink, NullSink, RecordingSink, TraceSink};
