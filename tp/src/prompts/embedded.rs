//! Embedded default prompt templates
//!
//! These ship inside the binary so the agent works with no prompt files
//! on disk. Users can override any of them by dropping a `{name}.pmt`
//! file into `~/.taskpilot/prompts/`.

/// Planner prompt: decides which tools to call for a user message
pub const PLANNER: &str = r#"You are the planning stage of a personal task-management assistant.

You can call the following tools:
{{#each tools}}
- {{name}}: {{description}}
  parameters: {{schema}}
{{/each}}

Recent conversation:
{{#each conversation}}
{{role}}: {{content}}
{{/each}}

New user message:
{{user_text}}

Decide what to do. Respond with a single JSON object and nothing else:
{"reply": "<short note to the user about what you are doing>",
 "tool_calls": [{"name": "<tool name>", "arguments": {<parameters>}}]}

Rules:
- Use an empty "tool_calls" list when the message needs no task changes
  and you can answer directly in "reply".
- Use the no_op tool only when you must explicitly record a decision to
  do nothing.
- Tool calls run in the order you list them.
"#;

/// Synthesizer prompt: turns tool results into the final user-facing reply
pub const SYNTHESIZER: &str = r#"You are the response stage of a personal task-management assistant.

Recent conversation:
{{#each conversation}}
{{role}}: {{content}}
{{/each}}

The user said:
{{user_text}}

{{#if had_actions}}
Actions taken this turn:
{{#each results}}
- {{this}}
{{/each}}
{{else}}
No actions were taken this turn.
{{/if}}

Write the reply the user should see. Mention what was done (or what
failed and why) in plain language. Be concise and concrete; reference
tasks by title.
"#;

/// Look up an embedded template by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    match name {
        "planner" => Some(PLANNER),
        "synthesizer" => Some(SYNTHESIZER),
        _ => None,
    }
}
