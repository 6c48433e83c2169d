//! LLM provider abstraction
//!
//! Provides a common interface for the hosted chat, vision and
//! speech-to-text models.

mod error;
mod groq;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use groq::{GroqModels, GroqService, DEFAULT_GROQ_BASE_URL};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request (text, or text plus images)
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Turn a voice recording into text
    async fn transcribe(&self, audio: &AudioClip) -> Result<String, LlmError>;

    /// Get the model ID used for plain chat
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %response.model,
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    has_image = request.has_image(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "LLM request failed"
                );
            }
        }

        result
    }

    async fn transcribe(&self, audio: &AudioClip) -> Result<String, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.transcribe(audio).await;
        let duration = start.elapsed();

        match &result {
            Ok(text) => {
                tracing::info!(
                    bytes = audio.data.len(),
                    duration_ms = %duration.as_millis(),
                    chars = text.chars().count(),
                    "Transcription completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    bytes = audio.data.len(),
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Transcription failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
