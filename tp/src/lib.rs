//! TaskPilot - LLM agent core for personal task management
//!
//! Each user message is processed as one **turn**: a planner LLM call
//! decides which task tools to run, the action stage executes them in
//! order against the task store, and a synthesizer LLM call writes the
//! final reply. Every turn records a hierarchical trace (best-effort)
//! and an append-only step log (source of truth for replay).
//!
//! # Modules
//!
//! - [`llm`] - LLM client trait with Ollama and OpenAI implementations
//! - [`tools`] - Tool registry, executor, and the built-in task tools
//! - [`turn`] - Planner/action/synthesizer stages and the orchestrator
//! - [`trace`] - Turn-local trace recording and export sinks
//! - [`steps`] - Append-only step logging to SQLite
//! - [`prompts`] - Handlebars prompt templates
//! - [`config`] - Configuration types and loading

pub mod cli;
pub mod config;
pub mod llm;
pub mod prompts;
pub mod steps;
pub mod tools;
pub mod trace;
pub mod turn;

// Re-export commonly used types
pub use config::{Config, LlmConfig, StepLogPolicy, StepsConfig, StoreConfig, TraceConfig, TurnConfig};
pub use llm::{create_client, ChatMessage, CompletionRequest, CompletionResponse, LlmClient, LlmError, Role};
pub use prompts::{PlannerPromptContext, PromptLoader, SynthesizerPromptContext};
pub use steps::{Step, StepDraft, StepLogError, StepLogger, StepType, TurnRecord, TurnStatus};
pub use tools::{Tool, ToolCall, ToolContext, ToolDefinition, ToolError, ToolExecutor, ToolResult};
pub use trace::{create_sink, NullSink, SpanHandle, TraceExport, TraceRecorder, TraceSink};
pub use turn::{CancelFlag, PlannerDecision, TurnOrchestrator, TurnRequest, TurnResult};
