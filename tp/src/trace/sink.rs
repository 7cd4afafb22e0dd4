//! Trace sinks
//!
//! A sink receives one exported trace tree per turn. The HTTP sink posts
//! to a Langfuse-style ingestion endpoint; errors propagate to the
//! recorder, which logs and drops them - tracing is best-effort by design.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::node::TraceExport;
use crate::config::TraceConfig;

/// Destination for exported turn traces
#[async_trait]
pub trait TraceSink: Send + Sync {
    /// Deliver one turn's trace tree
    async fn export(&self, trace: &TraceExport) -> eyre::Result<()>;
}

/// Sink that discards everything (tracing disabled)
pub struct NullSink;

#[async_trait]
impl TraceSink for NullSink {
    async fn export(&self, trace: &TraceExport) -> eyre::Result<()> {
        debug!(turn_id = %trace.turn_id, "NullSink::export: discarding trace");
        Ok(())
    }
}

/// HTTP sink posting trace trees as JSON
pub struct HttpSink {
    endpoint: String,
    auth_token: Option<String>,
    http: reqwest::Client,
}

impl HttpSink {
    /// Create a sink from configuration
    ///
    /// A missing auth token is not an error; the sink just posts without
    /// authorization and lets the endpoint reject it (best-effort either way).
    pub fn from_config(config: &TraceConfig) -> Self {
        debug!(endpoint = %config.endpoint, "HttpSink::from_config: called");
        let auth_token = std::env::var(&config.auth_token_env).ok();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            endpoint: config.endpoint.clone(),
            auth_token,
            http,
        }
    }
}

#[async_trait]
impl TraceSink for HttpSink {
    async fn export(&self, trace: &TraceExport) -> eyre::Result<()> {
        debug!(turn_id = %trace.turn_id, endpoint = %self.endpoint, "HttpSink::export: called");
        let mut request = self.http.post(&self.endpoint).json(trace);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(eyre::eyre!("trace sink returned {}", response.status()));
        }
        Ok(())
    }
}

/// Choose a sink from configuration
pub fn create_sink(config: &TraceConfig) -> Arc<dyn TraceSink> {
    debug!(enabled = config.enabled, "create_sink: called");
    if config.enabled {
        Arc::new(HttpSink::from_config(config))
    } else {
        Arc::new(NullSink)
    }
}

/// Test support: sink that stores every export in memory
pub struct RecordingSink {
    exports: Mutex<Vec<TraceExport>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            exports: Mutex::new(Vec::new()),
        }
    }

    pub fn exports(&self) -> Vec<TraceExport> {
        self.exports.lock().expect("recording sink lock poisoned").clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TraceSink for RecordingSink {
    async fn export(&self, trace: &TraceExport) -> eyre::Result<()> {
        self.exports
            .lock()
            .expect("recording sink lock poisoned")
            .push(trace.clone());
        Ok(())
    }
}

/// Test support: sink that fails every export
pub struct FailingSink;

#[async_trait]
impl TraceSink for FailingSink {
    async fn export(&self, _trace: &TraceExport) -> eyre::Result<()> {
        Err(eyre::eyre!("sink unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_sink_accepts_everything() {
        let sink = NullSink;
        let export = TraceExport {
            turn_id: "t".to_string(),
            session_id: "s".to_string(),
            root: None,
        };
        assert!(sink.export(&export).await.is_ok());
    }

    #[tokio::test]
    async fn test_recording_sink_stores_exports() {
        let sink = RecordingSink::new();
        let export = TraceExport {
            turn_id: "t".to_string(),
            session_id: "s".to_string(),
            root: None,
        };
        sink.export(&export).await.unwrap();
        assert_eq!(sink.exports().len(), 1);
    }

    #[test]
    fn test_create_sink_disabled_is_null() {
        let config = TraceConfig::default();
        // Just verify it constructs; behavior covered by NullSink test
        let _sink = create_sink(&config);
    }
}
