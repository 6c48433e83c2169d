//! Mock implementations for testing
//!
//! These mocks let the gateway, broadcaster and router run without
//! network access.

use crate::llm::{AudioClip, LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use crate::registry::UserId;
use crate::transport::{ChatAction, DeliveryError, DownloadedFile, OutgoingMessage, Transport};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    transcripts: Mutex<VecDeque<Result<String, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    delay: Option<Duration>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            transcripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep this long before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_text(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(LlmResponse {
            text: text.to_string(),
            model: "mock-model".to_string(),
            usage: Usage::default(),
        }));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_transcript(&self, result: Result<String, LlmError>) {
        self.transcripts.lock().unwrap().push_back(result);
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    async fn transcribe(&self, _audio: &AudioClip) -> Result<String, LlmError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.transcripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock transcript queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Transport
// ============================================================================

/// Records everything sent; recipients in `failing` get a delivery error
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<(UserId, OutgoingMessage)>>,
    actions: Mutex<Vec<(UserId, ChatAction)>>,
    failing: Mutex<HashSet<UserId>>,
    files: Mutex<HashMap<String, DownloadedFile>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, chat: UserId) {
        self.failing.lock().unwrap().insert(chat);
    }

    pub fn add_file(&self, file_id: &str, file: DownloadedFile) {
        self.files.lock().unwrap().insert(file_id.to_string(), file);
    }

    pub fn sent(&self) -> Vec<(UserId, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts delivered to one chat, in order
    pub fn texts_for(&self, chat: UserId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| *to == chat)
            .map(|(_, msg)| msg.text.clone())
            .collect()
    }

    pub fn actions(&self) -> Vec<(UserId, ChatAction)> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, chat: UserId, message: OutgoingMessage) -> Result<(), DeliveryError> {
        if self.failing.lock().unwrap().contains(&chat) {
            return Err(DeliveryError::Send {
                chat,
                message: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        self.sent.lock().unwrap().push((chat, message));
        Ok(())
    }

    async fn send_chat_action(&self, chat: UserId, action: ChatAction) {
        self.actions.lock().unwrap().push((chat, action));
    }

    async fn download(&self, file_id: &str) -> Result<DownloadedFile, DeliveryError> {
        self.files
            .lock()
            .unwrap()
            .get(file_id)
            .cloned()
            .ok_or_else(|| DeliveryError::Download {
                file_id: file_id.to_string(),
                message: "Bad Request: invalid file_id".to_string(),
            })
    }
}
