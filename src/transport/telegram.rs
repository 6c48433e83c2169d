//! Telegram Bot API transport

use super::{ChatAction, DeliveryError, DownloadedFile, OutgoingMessage, TextFormat, Transport};
use crate::registry::UserId;
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup, ParseMode};

pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn keyboard(rows: Vec<Vec<String>>) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = rows
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect())
        .collect();
    KeyboardMarkup::new(rows).resize_keyboard()
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, chat: UserId, message: OutgoingMessage) -> Result<(), DeliveryError> {
        let mut request = self.bot.send_message(ChatId(chat.0), message.text);
        if message.format == TextFormat::Markdown {
            // Legacy Markdown: the texts use `**bold**` and backticks, not MarkdownV2 escaping
            #[allow(deprecated)]
            {
                request = request.parse_mode(ParseMode::Markdown);
            }
        }
        if let Some(rows) = message.keyboard {
            request = request.reply_markup(keyboard(rows));
        }

        request.await.map(|_| ()).map_err(|e| DeliveryError::Send {
            chat,
            message: e.to_string(),
        })
    }

    async fn send_chat_action(&self, chat: UserId, action: ChatAction) {
        let action = match action {
            ChatAction::Typing => teloxide::types::ChatAction::Typing,
        };
        if let Err(e) = self.bot.send_chat_action(ChatId(chat.0), action).await {
            tracing::debug!(chat = %chat, error = %e, "Failed to send chat action");
        }
    }

    async fn download(&self, file_id: &str) -> Result<DownloadedFile, DeliveryError> {
        let download_error = |e: &dyn std::fmt::Display| DeliveryError::Download {
            file_id: file_id.to_string(),
            message: e.to_string(),
        };

        let file = self
            .bot
            .get_file(file_id.to_string())
            .await
            .map_err(|e| download_error(&e))?;

        let mut bytes = Vec::new();
        self.bot
            .download_file(&file.path, &mut bytes)
            .await
            .map_err(|e| download_error(&e))?;

        tracing::debug!(file_id, path = %file.path, bytes = bytes.len(), "Downloaded file");
        Ok(DownloadedFile::new(bytes, &file.path))
    }
}
