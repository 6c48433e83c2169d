//! Common types for LLM interactions

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

/// LLM request: one system prompt plus one user turn
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub content: Vec<ContentBlock>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    /// System prompt + user text, the shape of every tutoring call
    pub fn chat(system: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            content: vec![ContentBlock::text(user_text)],
            max_tokens: None,
            temperature: None,
        }
    }

    /// Instruction + image in a single user turn, no system prompt
    pub fn vision(instruction: impl Into<String>, image: ImageSource) -> Self {
        Self {
            system: None,
            content: vec![ContentBlock::text(instruction), ContentBlock::Image { source: image }],
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn has_image(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::Image { .. }))
    }
}

/// Content block in the user turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

impl ContentBlock {
    pub fn text(s: impl Into<String>) -> Self {
        ContentBlock::Text { text: s.into() }
    }
}

/// Image source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    Base64 { media_type: String, data: String },
}

impl ImageSource {
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        ImageSource::Base64 {
            media_type: media_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    /// `data:` URI as accepted by OpenAI-compatible `image_url` parts
    pub fn to_data_url(&self) -> String {
        match self {
            ImageSource::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        }
    }
}

/// Recorded audio handed to the transcription endpoint
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub file_name: String,
    pub media_type: String,
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    /// Model that actually served the request
    pub model: String,
    pub usage: Usage,
}

/// Usage statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let source = ImageSource::from_bytes("image/jpeg", b"abc");
        assert_eq!(source.to_data_url(), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn test_vision_request_has_image() {
        let request = LlmRequest::vision("read", ImageSource::from_bytes("image/png", b"\x89PNG"));
        assert!(request.has_image());
        assert!(request.system.is_none());
        assert!(!LlmRequest::chat("sys", "hi").has_image());
    }
}
