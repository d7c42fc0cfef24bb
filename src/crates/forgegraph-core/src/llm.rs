//! Chat-model collaborator interface.
//!
//! forgegraph is an orchestration engine, not an LLM client library: the
//! engine and the prebuilt workflows consume a [`ChatModel`] trait object
//! and never construct provider clients themselves. Implementations live
//! with the application (HTTP clients for hosted providers, local runtimes,
//! test doubles) and are injected as `Arc<dyn ChatModel>`, never reached
//! through process-wide globals, so runs stay independently testable.
//!
//! Failures surface as [`CollaboratorError`] with distinguishable kinds;
//! whether a node retries, degrades, or propagates is that node's decision,
//! not the engine's.

use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Failure of an external collaborator (model, retriever, job queue).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Credentials missing or rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (DNS, connect, reset, TLS).
    #[error("network failure: {0}")]
    Network(String),

    /// The provider accepted the connection but refused or failed the
    /// request (rate limit, invalid model, 5xx, malformed response).
    #[error("provider error: {0}")]
    Provider(String),

    /// The collaborator did not answer in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Result alias for collaborator calls.
pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

/// A single generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerateRequest {
    /// Request with the default sampling settings.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            max_tokens: 2048,
            temperature: 0.7,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A completed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
    pub finish_reason: Option<String>,
}

impl GenerateResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tokens_used: None,
            finish_reason: None,
        }
    }
}

/// Incremental text chunks from a streaming generation.
pub type TokenStream = Pin<Box<dyn Stream<Item = CollabResult<String>> + Send>>;

/// Provider-agnostic chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete response.
    async fn generate(&self, request: GenerateRequest) -> CollabResult<GenerateResponse>;

    /// Stream the response as text chunks. The default implementation
    /// wraps [`generate`](Self::generate) in a single-chunk stream, so
    /// non-streaming providers work everywhere streaming is accepted.
    async fn generate_stream(&self, request: GenerateRequest) -> CollabResult<TokenStream> {
        let response = self.generate(request).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok(response.content)
        })))
    }

    /// Whether the provider is reachable and configured.
    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    struct CannedModel;

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn generate(&self, request: GenerateRequest) -> CollabResult<GenerateResponse> {
            Ok(GenerateResponse::new(format!("echo: {}", request.prompt)))
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_generate() {
        let model = CannedModel;
        let mut stream = model
            .generate_stream(GenerateRequest::new("hi"))
            .await
            .unwrap();

        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk, "echo: hi");
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn request_builder_defaults() {
        let request = GenerateRequest::new("q")
            .with_system_prompt("sys")
            .with_temperature(0.0);
        assert_eq!(request.max_tokens, 2048);
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.system_prompt.as_deref(), Some("sys"));
    }

    #[test]
    fn error_kinds_are_distinguishable() {
        let errors = [
            CollaboratorError::Auth("no key".into()),
            CollaboratorError::Network("reset".into()),
            CollaboratorError::Provider("rate limited".into()),
            CollaboratorError::Timeout(Duration::from_secs(30)),
        ];
        assert!(matches!(errors[0], CollaboratorError::Auth(_)));
        assert!(matches!(errors[3], CollaboratorError::Timeout(_)));
    }
}
