//! taskpilot configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main taskpilot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Trace sink configuration
    pub trace: TraceConfig,

    /// Step log configuration
    pub steps: StepsConfig,

    /// Turn pipeline configuration
    pub turn: TurnConfig,

    /// Task store configuration
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .taskpilot.yml
        let local_config = PathBuf::from(".taskpilot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/taskpilot/taskpilot.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("taskpilot").join("taskpilot.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("ollama" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the API key (openai provider only)
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3.1".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 2048,
            timeout_ms: 60_000,
        }
    }
}

/// Trace sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Whether to export traces at all
    pub enabled: bool,

    /// Trace ingestion endpoint
    pub endpoint: String,

    /// Environment variable containing the sink auth token
    #[serde(rename = "auth-token-env")]
    pub auth_token_env: String,

    /// Export request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:3000/api/traces".to_string(),
            auth_token_env: "TASKPILOT_TRACE_TOKEN".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// What to do when a step-log write fails mid-turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepLogPolicy {
    /// Proceed with the turn, warn about degraded observability
    #[default]
    Continue,
    /// Fail the turn on the first step-log write failure
    Abort,
}

/// Step log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StepsConfig {
    /// Path to the step log database (default: ~/.taskpilot/steps.db)
    #[serde(rename = "db-path")]
    pub db_path: Option<PathBuf>,

    /// Failure policy for step-log writes
    #[serde(rename = "on-failure")]
    pub on_failure: StepLogPolicy,
}

impl Default for StepsConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            on_failure: StepLogPolicy::Continue,
        }
    }
}

/// Turn pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// How many trailing conversation messages the planner sees
    #[serde(rename = "context-window")]
    pub context_window: usize,

    /// Per-tool-call timeout in milliseconds
    #[serde(rename = "tool-timeout-ms")]
    pub tool_timeout_ms: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            context_window: 10,
            tool_timeout_ms: 5_000,
        }
    }
}

/// Task store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the task database (default: ~/.taskpilot/tasks.db)
    #[serde(rename = "db-path")]
    pub db_path: Option<PathBuf>,
}

/// Resolve a data file path under ~/.taskpilot, creating the directory
pub fn default_data_path(file_name: &str) -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| eyre::eyre!("Could not determine home directory"))?;
    let dir = home.join(".taskpilot");
    fs::create_dir_all(&dir)?;
    Ok(dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.turn.context_window, 10);
        assert_eq!(config.steps.on_failure, StepLogPolicy::Continue);
        assert!(!config.trace.enabled);
    }

    #[test]
    fn test_parse_yaml_with_kebab_case() {
        let yaml = r#"
llm:
  provider: openai
  model: gpt-4o-mini
  base-url: https://api.openai.com
  max-tokens: 1024
steps:
  on-failure: abort
turn:
  context-window: 4
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.steps.on_failure, StepLogPolicy::Abort);
        assert_eq!(config.turn.context_window, 4);
        // Unspecified sections fall back to defaults
        assert_eq!(config.turn.tool_timeout_ms, 5_000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.llm.provider, "ollama");
    }
}
