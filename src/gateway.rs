//! Bounded access to the hosted models
//!
//! Every call is wrapped in a timeout. Callers on the chat path use
//! [`AiGateway::reply`], which turns any failure into a fixed apology
//! string so the user always gets an answer.

use crate::llm::{AudioClip, ImageSource, LlmError, LlmRequest, LlmService};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

pub const AI_ERROR_REPLY: &str = "⚠️ Error connecting to AI.";
pub const MISSING_KEY_REPLY: &str = "⚠️ Server Error: Missing API Key.";
pub const EMPTY_REPLY: &str = "⚠️ No response from AI.";

pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_TOKENS: u32 = 1024;
const CHAT_TEMPERATURE: f32 = 0.3;
const OCR_TEMPERATURE: f32 = 0.0;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("No model API key configured")]
    NotConfigured,
    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("Model returned an empty response")]
    EmptyResponse,
}

impl GatewayError {
    /// Fixed text shown to the user in place of a reply
    pub fn apology(&self) -> &'static str {
        match self {
            GatewayError::NotConfigured => MISSING_KEY_REPLY,
            GatewayError::EmptyResponse => EMPTY_REPLY,
            GatewayError::Timeout(_) | GatewayError::Llm(_) => AI_ERROR_REPLY,
        }
    }
}

pub struct AiGateway {
    llm: Option<Arc<dyn LlmService>>,
    timeout: Duration,
    max_tokens: u32,
}

impl AiGateway {
    /// `llm` is `None` when no API key was configured
    pub fn new(llm: Option<Arc<dyn LlmService>>, timeout: Duration) -> Self {
        Self {
            llm,
            timeout,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_some()
    }

    /// System prompt + user text, trimmed reply
    pub async fn complete(&self, system: &str, text: &str) -> Result<String, GatewayError> {
        let request = LlmRequest::chat(system, text)
            .with_max_tokens(self.max_tokens)
            .with_temperature(CHAT_TEMPERATURE);
        self.run(&request).await
    }

    /// Like [`complete`](Self::complete) but never fails
    pub async fn reply(&self, system: &str, text: &str) -> String {
        match self.complete(system, text).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Substituting apology for model reply");
                e.apology().to_string()
            }
        }
    }

    /// Read the text out of an image with the vision model
    pub async fn extract_text(
        &self,
        ocr_prompt: &str,
        image: ImageSource,
    ) -> Result<String, GatewayError> {
        let request = LlmRequest::vision(ocr_prompt, image)
            .with_max_tokens(self.max_tokens)
            .with_temperature(OCR_TEMPERATURE);
        self.run(&request).await
    }

    pub async fn transcribe(&self, audio: &AudioClip) -> Result<String, GatewayError> {
        let llm = self.llm.as_ref().ok_or(GatewayError::NotConfigured)?;
        let text = timeout(self.timeout, llm.transcribe(audio))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))??;
        non_empty(text)
    }

    async fn run(&self, request: &LlmRequest) -> Result<String, GatewayError> {
        let llm = self.llm.as_ref().ok_or(GatewayError::NotConfigured)?;
        let response = timeout(self.timeout, llm.complete(request))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))??;
        non_empty(response.text)
    }
}

fn non_empty(text: String) -> Result<String, GatewayError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(GatewayError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLlmService;

    fn gateway(mock: &Arc<MockLlmService>) -> AiGateway {
        AiGateway::new(Some(mock.clone() as Arc<dyn LlmService>), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_reply_passes_prompt_and_trims() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue_text("  Hello (សួស្តី)\n");

        let reply = gateway(&mock).reply("SYSTEM", "hello").await;

        assert_eq!(reply, "Hello (សួស្តី)");
        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some("SYSTEM"));
        assert_eq!(requests[0].max_tokens, Some(1024));
        assert_eq!(requests[0].temperature, Some(0.3));
    }

    #[tokio::test]
    async fn test_reply_without_key() {
        let gateway = AiGateway::new(None, Duration::from_secs(5));
        assert!(!gateway.is_configured());
        assert_eq!(gateway.reply("s", "hi").await, MISSING_KEY_REPLY);
    }

    #[tokio::test]
    async fn test_reply_on_error() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue_error(LlmError::rate_limit("quota"));
        assert_eq!(gateway(&mock).reply("s", "hi").await, AI_ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_reply_on_empty() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue_text("   ");
        assert_eq!(gateway(&mock).reply("s", "hi").await, EMPTY_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_apology() {
        let mock = Arc::new(MockLlmService::new().with_delay(Duration::from_secs(120)));
        mock.queue_text("too late");

        let gateway = AiGateway::new(
            Some(mock.clone() as Arc<dyn LlmService>),
            Duration::from_secs(60),
        );
        let err = gateway.complete("s", "hi").await.unwrap_err();

        assert!(matches!(err, GatewayError::Timeout(_)));
        assert_eq!(err.apology(), AI_ERROR_REPLY);
    }

    #[tokio::test]
    async fn test_extract_text_uses_vision_request() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue_text("こんにちは");

        let text = gateway(&mock)
            .extract_text("OCR", ImageSource::from_bytes("image/jpeg", b"img"))
            .await
            .unwrap();

        assert_eq!(text, "こんにちは");
        let request = &mock.recorded_requests()[0];
        assert!(request.has_image());
        assert_eq!(request.temperature, Some(0.0));
    }

    #[tokio::test]
    async fn test_transcribe_empty_is_error() {
        let mock = Arc::new(MockLlmService::new());
        mock.queue_transcript(Ok(" ".to_string()));

        let clip = AudioClip {
            data: vec![1, 2, 3],
            file_name: "voice.ogg".to_string(),
            media_type: "audio/ogg".to_string(),
        };
        let err = gateway(&mock).transcribe(&clip).await.unwrap_err();
        assert!(matches!(err, GatewayError::EmptyResponse));
    }
}
