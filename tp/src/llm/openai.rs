//! OpenAI-compatible API client implementation
//!
//! Implements the LlmClient trait against the Chat Completions API.
//! Works with any OpenAI-compatible endpoint given a base URL and an
//! API key environment variable.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, Role};
use crate::config::LlmConfig;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

/// OpenAI-compatible chat client
#[derive(Debug)]
pub struct OpenAiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in the config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "OpenAiClient::from_config: called");
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            LlmError::InvalidResponse(format!("API key not found: set the {} environment variable", config.api_key_env))
        })?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(model = %self.model, message_count = request.messages.len(), "OpenAiClient::build_request_body: called");
        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        for msg in &request.messages {
            let role = match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(serde_json::json!({ "role": role, "content": msg.content }));
        }

        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(model = %self.model, "OpenAiClient::complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                warn!(attempt, ?backoff, "OpenAiClient::complete: retrying after transient error");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            let response = match self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) if e.is_timeout() => {
                    last_error = Some(LlmError::Timeout(self.timeout));
                    continue;
                }
                Err(e) => {
                    last_error = Some(LlmError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if status >= 400 {
                let message = response.text().await.unwrap_or_default();
                let err = LlmError::ApiError { status, message };
                if is_retryable_status(status) {
                    last_error = Some(err);
                    continue;
                }
                return Err(err);
            }

            let parsed: ChatCompletionResponse = response.json().await.map_err(LlmError::Network)?;
            let content = parsed
                .choices
                .first()
                .and_then(|c| c.message.content.clone())
                .ok_or_else(|| LlmError::InvalidResponse("Completion has no choices".to_string()))?;

            debug!(model = %parsed.model, "OpenAiClient::complete: response received");
            return Ok(CompletionResponse {
                content: content.trim().to_string(),
                model: parsed.model,
            });
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Retries exhausted".to_string())))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
    }

    #[test]
    #[serial]
    fn test_from_config_requires_api_key() {
        std::env::remove_var("TASKPILOT_TEST_OPENAI_KEY");
        let config = LlmConfig {
            provider: "openai".to_string(),
            api_key_env: "TASKPILOT_TEST_OPENAI_KEY".to_string(),
            ..LlmConfig::default()
        };
        let err = OpenAiClient::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("TASKPILOT_TEST_OPENAI_KEY"));
    }

    #[test]
    #[serial]
    fn test_from_config_reads_key_and_trims_base_url() {
        std::env::set_var("TASKPILOT_TEST_OPENAI_KEY", "sk-test");
        let config = LlmConfig {
            provider: "openai".to_string(),
            api_key_env: "TASKPILOT_TEST_OPENAI_KEY".to_string(),
            base_url: "https://api.example.com/".to_string(),
            ..LlmConfig::default()
        };
        let client = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "https://api.example.com");
        std::env::remove_var("TASKPILOT_TEST_OPENAI_KEY");
    }
}
