//! Planner decision parsing
//!
//! The planner LLM is asked for a single JSON object with a `reply`
//! string and a `tool_calls` array. Real models wrap that in prose or
//! code fences, so parsing is lenient about the envelope but fail-closed
//! about the content: anything that doesn't yield well-formed calls to
//! registered tools degrades to "no tool calls, raw text is the answer".
//! A turn never dies because the planner's output didn't parse.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::tools::ToolCall;

/// Structured outcome of the planner stage
#[derive(Debug, Clone)]
pub struct PlannerDecision {
    /// Candidate answer text (used directly when no tools run)
    pub assistant_text: String,

    /// Tool calls to execute, in order
    pub tool_calls: Vec<ToolCall>,

    /// Set when the LLM provider itself failed; the orchestrator
    /// short-circuits the rest of the pipeline in that case
    pub llm_failed: bool,
}

impl PlannerDecision {
    /// Decision representing a provider failure
    pub fn provider_failure(text: impl Into<String>) -> Self {
        Self {
            assistant_text: text.into(),
            tool_calls: Vec::new(),
            llm_failed: false,
        }
        .failed()
    }

    fn failed(mut self) -> Self {
        self.llm_failed = true;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    reply: String,
    #[serde(default)]
    tool_calls: Vec<RawToolCall>,
}

#[derive(Debug, Deserialize)]
struct RawToolCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Parse a raw planner completion into a decision
///
/// `is_registered` checks tool names against the registry; a reference
/// to any unregistered tool invalidates the whole call list (the model
/// is hallucinating, so trust only its prose).
pub fn parse_decision(raw: &str, is_registered: impl Fn(&str) -> bool) -> PlannerDecision {
    debug!(raw_len = raw.len(), "parse_decision: called");

    let Some(json_text) = extract_json_object(raw) else {
        debug!("parse_decision: no JSON object found, treating as direct answer");
        return direct_answer(raw);
    };

    let parsed: RawDecision = match serde_json::from_str(json_text) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "parse_decision: JSON did not match decision shape");
            return direct_answer(raw);
        }
    };

    for call in &parsed.tool_calls {
        if !is_registered(&call.name) {
            debug!(tool_name = %call.name, "parse_decision: unregistered tool referenced");
            return direct_answer(raw);
        }
    }

    let assistant_text = if parsed.reply.trim().is_empty() {
        raw.trim().to_string()
    } else {
        parsed.reply
    };

    PlannerDecision {
        assistant_text,
        tool_calls: parsed
            .tool_calls
            .into_iter()
            .map(|c| ToolCall {
                name: c.name,
                arguments: c.arguments,
            })
            .collect(),
        llm_failed: false,
    }
}

fn direct_answer(raw: &str) -> PlannerDecision {
    PlannerDecision {
        assistant_text: raw.trim().to_string(),
        tool_calls: Vec::new(),
        llm_failed: false,
    }
}

/// Find the JSON object in a completion: fenced block first, then the
/// outermost brace pair
fn extract_json_object(raw: &str) -> Option<&str> {
    if let Some(fence_start) = raw.find("```") {
        let after_fence = &raw[fence_start + 3..];
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(fence_end) = body.find("```") {
            let candidate = body[..fence_end].trim();
            if candidate.starts_with('{') {
                return Some(candidate);
            }
        }
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end > start {
        Some(&raw[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn registered(name: &str) -> bool {
        matches!(name, "create_task" | "fetch_tasks" | "no_op")
    }

    #[test]
    fn test_parses_plain_json() {
        let raw = r#"{"reply": "Creating it now", "tool_calls": [{"name": "create_task", "arguments": {"title": "Review report"}}]}"#;
        let decision = parse_decision(raw, registered);

        assert_eq!(decision.assistant_text, "Creating it now");
        assert_eq!(decision.tool_calls.len(), 1);
        assert_eq!(decision.tool_calls[0].name, "create_task");
        assert_eq!(decision.tool_calls[0].arguments["title"], json!("Review report"));
        assert!(!decision.llm_failed);
    }

    #[test]
    fn test_parses_fenced_json() {
        let raw = "Here is my plan:\n```json\n{\"reply\": \"ok\", \"tool_calls\": [{\"name\": \"fetch_tasks\", \"arguments\": {}}]}\n```\nDone.";
        let decision = parse_decision(raw, registered);
        assert_eq!(decision.tool_calls.len(), 1);
        assert_eq!(decision.tool_calls[0].name, "fetch_tasks");
    }

    #[test]
    fn test_prose_becomes_direct_answer() {
        let raw = "You have three open tasks; I'd start with the report.";
        let decision = parse_decision(raw, registered);
        assert!(decision.tool_calls.is_empty());
        assert_eq!(decision.assistant_text, raw);
    }

    #[test]
    fn test_malformed_json_degrades_to_direct_answer() {
        let raw = r#"{"reply": "oops", "tool_calls": [{"name": }]}"#;
        let decision = parse_decision(raw, registered);
        assert!(decision.tool_calls.is_empty());
        assert_eq!(decision.assistant_text, raw);
    }

    #[test]
    fn test_unregistered_tool_invalidates_call_list() {
        let raw = r#"{"reply": "on it", "tool_calls": [{"name": "delete_everything", "arguments": {}}]}"#;
        let decision = parse_decision(raw, registered);
        assert!(decision.tool_calls.is_empty());
        // Raw text survives so the user still sees something sensible
        assert!(decision.assistant_text.contains("on it"));
    }

    #[test]
    fn test_empty_tool_calls_is_direct_answer() {
        let raw = r#"{"reply": "Nothing to do, you're all caught up.", "tool_calls": []}"#;
        let decision = parse_decision(raw, registered);
        assert!(decision.tool_calls.is_empty());
        assert_eq!(decision.assistant_text, "Nothing to do, you're all caught up.");
    }

    #[test]
    fn test_missing_arguments_defaults_to_null() {
        let raw = r#"{"reply": "noop", "tool_calls": [{"name": "no_op"}]}"#;
        let decision = parse_decision(raw, registered);
        assert_eq!(decision.tool_calls.len(), 1);
        assert!(decision.tool_calls[0].arguments.is_null());
    }

    #[test]
    fn test_provider_failure_flag() {
        let decision = PlannerDecision::provider_failure("Please try again");
        assert!(decision.llm_failed);
        assert!(decision.tool_calls.is_empty());
    }

    proptest::proptest! {
        // Prose with no braces can never smuggle in a tool call
        #[test]
        fn prop_braceless_text_is_direct_answer(raw in "[^{}]{0,200}") {
            let decision = parse_decision(&raw, |_| true);
            proptest::prop_assert!(decision.tool_calls.is_empty());
            proptest::prop_assert!(!decision.llm_failed);
            proptest::prop_assert_eq!(decision.assistant_text, raw.trim().to_string());
        }
    }
}
