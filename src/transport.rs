//! Outbound side of the chat platform
//!
//! The router only talks to [`Transport`]; the Telegram implementation lives
//! in [`telegram`], test doubles in `crate::testing`.

pub mod telegram;

use crate::registry::UserId;
use async_trait::async_trait;
use thiserror::Error;

pub use telegram::TelegramTransport;

/// How the platform should render the message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
    #[default]
    Plain,
    Markdown,
}

/// A single message to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub format: TextFormat,
    /// Reply keyboard, rows of button labels
    pub keyboard: Option<Vec<Vec<String>>>,
}

impl OutgoingMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Plain,
            keyboard: None,
        }
    }

    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Markdown,
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, rows: Vec<Vec<String>>) -> Self {
        self.keyboard = Some(rows);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
}

/// File fetched from the platform's storage
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    /// Guessed from the stored file path
    pub media_type: String,
}

impl DownloadedFile {
    pub fn new(bytes: Vec<u8>, path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            bytes,
            file_name,
            media_type,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Failed to deliver to {chat}: {message}")]
    Send { chat: UserId, message: String },
    #[error("Failed to download file {file_id}: {message}")]
    Download { file_id: String, message: String },
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, chat: UserId, message: OutgoingMessage) -> Result<(), DeliveryError>;

    /// Best-effort activity indicator
    async fn send_chat_action(&self, chat: UserId, action: ChatAction);

    async fn download(&self, file_id: &str) -> Result<DownloadedFile, DeliveryError>;
}
