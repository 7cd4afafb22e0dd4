//! Prompt loading and rendering
//!
//! Loads templates from a user override directory or falls back to the
//! embedded defaults, then renders them with handlebars.

use std::path::PathBuf;

use eyre::{eyre, Result};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use crate::llm::ChatMessage;
use crate::tools::{ToolDefinition, ToolResult};

use super::embedded;

/// Tool line as rendered into the planner prompt
#[derive(Debug, Clone, Serialize)]
struct ToolLine {
    name: String,
    description: String,
    schema: String,
}

/// Context for rendering the planner template
#[derive(Debug, Clone, Serialize)]
pub struct PlannerPromptContext {
    tools: Vec<ToolLine>,
    conversation: Vec<ChatMessage>,
    user_text: String,
}

impl PlannerPromptContext {
    pub fn new(tools: &[ToolDefinition], conversation: &[ChatMessage], user_text: &str) -> Self {
        debug!(
            tool_count = tools.len(),
            context_len = conversation.len(),
            "PlannerPromptContext::new: called"
        );
        Self {
            tools: tools
                .iter()
                .map(|t| ToolLine {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    schema: t.input_schema.to_string(),
                })
                .collect(),
            conversation: conversation.to_vec(),
            user_text: user_text.to_string(),
        }
    }
}

/// Context for rendering the synthesizer template
#[derive(Debug, Clone, Serialize)]
pub struct SynthesizerPromptContext {
    conversation: Vec<ChatMessage>,
    user_text: String,
    results: Vec<String>,
    had_actions: bool,
}

impl SynthesizerPromptContext {
    pub fn new(conversation: &[ChatMessage], user_text: &str, results: &[ToolResult]) -> Self {
        debug!(result_count = results.len(), "SynthesizerPromptContext::new: called");
        Self {
            conversation: conversation.to_vec(),
            user_text: user_text.to_string(),
            results: results.iter().map(ToolResult::summary).collect(),
            had_actions: !results.is_empty(),
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    hbs: Handlebars<'static>,
    /// User override directory (e.g. `~/.taskpilot/prompts/`)
    user_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader with the default override directory
    pub fn new() -> Self {
        let user_dir = dirs::home_dir().map(|home| home.join(".taskpilot").join("prompts"));
        debug!(?user_dir, "PromptLoader::new: called");
        Self {
            hbs: Handlebars::new(),
            user_dir: user_dir.filter(|d| d.exists()),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Handlebars::new(),
            user_dir: None,
        }
    }

    /// Load a template by name: user override first, then embedded
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref user_dir) = self.user_dir {
            let path = user_dir.join(format!("{name}.pmt"));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found user override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render the planner prompt
    pub fn render_planner(&self, context: &PlannerPromptContext) -> Result<String> {
        debug!("PromptLoader::render_planner: called");
        let template = self.load_template("planner")?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render planner prompt: {}", e))
    }

    /// Render the synthesizer prompt
    pub fn render_synthesizer(&self, context: &SynthesizerPromptContext) -> Result<String> {
        debug!("PromptLoader::render_synthesizer: called");
        let template = self.load_template("synthesizer")?;
        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render synthesizer prompt: {}", e))
    }
}

impl Default for PromptLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definitions() -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "create_task".to_string(),
            description: "Create a new task".to_string(),
            input_schema: json!({"type": "object", "properties": {"title": {"type": "string"}}}),
        }]
    }

    #[test]
    fn test_planner_prompt_embeds_tools_and_message() {
        let loader = PromptLoader::embedded_only();
        let context = PlannerPromptContext::new(
            &definitions(),
            &[ChatMessage::user("earlier message")],
            "Create a task to review the report",
        );
        let prompt = loader.render_planner(&context).unwrap();

        assert!(prompt.contains("create_task"));
        assert!(prompt.contains("Create a new task"));
        assert!(prompt.contains("earlier message"));
        assert!(prompt.contains("Create a task to review the report"));
    }

    #[test]
    fn test_synthesizer_prompt_embeds_results() {
        let loader = PromptLoader::embedded_only();
        let results = vec![
            ToolResult::success("create_task", json!({"task": {"title": "Review report"}})),
            ToolResult::error("fetch_tasks", "store unavailable"),
        ];
        let context = SynthesizerPromptContext::new(&[], "please create it", &results);
        let prompt = loader.render_synthesizer(&context).unwrap();

        assert!(prompt.contains("Review report"));
        assert!(prompt.contains("fetch_tasks failed"));
        assert!(prompt.contains("please create it"));
    }

    #[test]
    fn test_synthesizer_prompt_without_actions() {
        let loader = PromptLoader::embedded_only();
        let context = SynthesizerPromptContext::new(&[], "hello", &[]);
        let prompt = loader.render_synthesizer(&context).unwrap();
        assert!(prompt.contains("No actions were taken"));
    }

    #[test]
    fn test_unknown_template_errors() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("observer").is_err());
    }
}
