//! Groq provider implementation (`OpenAI`-compatible API)
//!
//! Chat and vision go through `chat/completions`; voice notes through
//! `audio/transcriptions`.

use super::types::{AudioClip, ContentBlock, LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Model names used for each kind of request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroqModels {
    pub chat: String,
    pub vision: String,
    pub transcription: String,
}

impl Default for GroqModels {
    fn default() -> Self {
        Self {
            chat: "llama-3.3-70b-versatile".to_string(),
            vision: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            transcription: "whisper-large-v3-turbo".to_string(),
        }
    }
}

/// Groq service implementation
pub struct GroqService {
    client: Client,
    api_key: String,
    models: GroqModels,
    base_url: String,
}

impl GroqService {
    pub fn new(api_key: String, models: GroqModels, base_url: &str) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            models,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> ChatRequest {
        let mut messages = Vec::new();

        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: MessageContent::Text(system.clone()),
            });
        }

        // Plain string content for text-only turns; parts only when an image is attached
        let content = if request.has_image() {
            MessageContent::Parts(
                request
                    .content
                    .iter()
                    .map(|block| match block {
                        ContentBlock::Text { text } => ContentPart::Text { text: text.clone() },
                        ContentBlock::Image { source } => ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: source.to_data_url(),
                            },
                        },
                    })
                    .collect(),
            )
        } else {
            MessageContent::Text(
                request
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        ContentBlock::Image { .. } => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        };
        messages.push(ChatMessage {
            role: "user".to_string(),
            content,
        });

        let model = if request.has_image() {
            &self.models.vision
        } else {
            &self.models.chat
        };

        ChatRequest {
            model: model.clone(),
            messages,
            max_completion_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        }
    }

    fn normalize_response(resp: ChatResponse) -> Result<LlmResponse, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            model: resp.model,
            usage: Usage {
                input_tokens: u64::from(resp.usage.prompt_tokens),
                output_tokens: u64::from(resp.usage.completion_tokens),
            },
        })
    }

    /// Read the body and turn non-success statuses into classified errors
    async fn read_body(response: reqwest::Response) -> Result<String, LlmError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(LlmError::from_status(status.as_u16(), &error_resp.error.message));
            }
            return Err(LlmError::from_status(status.as_u16(), &body));
        }

        Ok(body)
    }
}

#[async_trait]
impl LlmService for GroqService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let chat_request = self.translate_request(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e))?;

        let body = Self::read_body(response).await?;
        let chat_response: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(chat_response)
    }

    async fn transcribe(&self, audio: &AudioClip) -> Result<String, LlmError> {
        let part = Part::bytes(audio.data.clone())
            .file_name(audio.file_name.clone())
            .mime_str(&audio.media_type)
            .map_err(|e| LlmError::invalid_request(format!("Bad audio media type: {e}")))?;
        let form = Form::new()
            .text("model", self.models.transcription.clone())
            .text("response_format", "json")
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e))?;

        let body = Self::read_body(response).await?;
        let transcription: TranscriptionResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse transcription: {e} - body: {body}"))
        })?;

        Ok(transcription.text)
    }

    fn model_id(&self) -> &str {
        &self.models.chat
    }
}

// Chat completions API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: ChatUsage,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[allow(clippy::struct_field_names)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
