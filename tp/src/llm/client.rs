//! LlmClient trait definition

use async_trait::async_trait;
#[allow(unused_imports)]
use tracing::debug;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// The turn pipeline holds conversation state itself; every `complete`
/// call carries the full message window it needs.
#[async_trait]
pub trait LlmClient: Send + Sync + std::fmt::Debug {
    /// Send a single completion request (resolves when the full text is available)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier this client is configured for
    fn model(&self) -> &str;
}

/// Test support: canned-response client used by unit and integration tests
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    /// Mock LLM client for unit tests
    ///
    /// Returns canned responses in order; `Err` entries simulate provider
    /// failures for the fallback paths.
    #[derive(Debug)]
    pub struct MockLlmClient {
        responses: Vec<Result<CompletionResponse, String>>,
        repeat_last: bool,
        call_count: AtomicUsize,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<CompletionResponse, String>>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self {
                responses,
                repeat_last: false,
                call_count: AtomicUsize::new(0),
            }
        }

        /// All calls succeed with the given texts, in order
        pub fn with_texts(texts: Vec<&str>) -> Self {
            Self::new(
                texts
                    .into_iter()
                    .map(|t| Ok(CompletionResponse::text(t, "mock-model")))
                    .collect(),
            )
        }

        /// Every call fails with the given message
        pub fn always_failing(message: &str) -> Self {
            Self {
                responses: vec![Err(message.to_string())],
                repeat_last: true,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            debug!("MockLlmClient::complete: called");
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            let entry = match self.responses.get(idx) {
                Some(entry) => entry,
                None if self.repeat_last => match self.responses.last() {
                    Some(entry) => entry,
                    None => return Err(LlmError::InvalidResponse("No mock responses".to_string())),
                },
                None => return Err(LlmError::InvalidResponse("No more mock responses".to_string())),
            };
            match entry {
                Ok(response) => Ok(response.clone()),
                Err(message) => Err(LlmError::InvalidResponse(message.clone())),
            }
        }

        fn model(&self) -> &str {
            "mock-model"
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_responses_in_order() {
            let client = MockLlmClient::with_texts(vec!["one", "two"]);
            let req = CompletionRequest {
                system_prompt: "Test".to_string(),
                messages: vec![],
                temperature: 0.0,
                max_tokens: 100,
            };

            assert_eq!(client.complete(req.clone()).await.unwrap().content, "one");
            assert_eq!(client.complete(req.clone()).await.unwrap().content, "two");
            assert_eq!(client.call_count(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::with_texts(vec![]);
            let req = CompletionRequest {
                system_prompt: "Test".to_string(),
                messages: vec![],
                temperature: 0.0,
                max_tokens: 100,
            };
            assert!(client.complete(req).await.is_err());
        }

        #[tokio::test]
        async fn test_always_failing_never_succeeds() {
            let client = MockLlmClient::always_failing("down");
            let req = CompletionRequest {
                system_prompt: "Test".to_string(),
                messages: vec![],
                temperature: 0.0,
                max_tokens: 100,
            };
            assert!(client.complete(req.clone()).await.is_err());
            assert!(client.complete(req).await.is_err());
        }
    }
}
