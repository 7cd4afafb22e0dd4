//! Prompt templates for the planner and synthesizer stages

mod embedded;
mod loader;

pub use loader::{PlannerPromptContext, PromptLoader, SynthesizerPromptContext};
