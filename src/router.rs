//! Inbound message dispatch
//!
//! Every inbound event produces exactly one [`Reply`]. Progress notices and
//! the typing indicator go out on the side and are not replies.

pub mod command;
pub mod replies;

use crate::broadcast::{Broadcaster, ADMIN_BROADCAST_DELAY};
use crate::chunker::{chunk, DEFAULT_MAX_MESSAGE_LEN};
use crate::gateway::{AiGateway, GatewayError};
use crate::llm::{AudioClip, ImageSource};
use crate::mode::{ModeSetting, TutorMode, UnknownMode};
use crate::prompts::{GrammarLanguage, PromptCatalog, PromptKey};
use crate::registry::{UserId, UserRegistry};
use crate::session::SessionStore;
use crate::state_machine::Event;
use crate::transport::{ChatAction, DownloadedFile, OutgoingMessage, Transport};
use command::{Command, MenuButton};
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One message from a user, already stripped of platform details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat: UserId,
    pub sender_name: Option<String>,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Text(String),
    /// Largest available size of a photo
    Photo { file_id: String },
    Voice { file_id: String },
}

/// Final answer to an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Sent as-is
    Direct(OutgoingMessage),
    /// Model output; split to the transport limit and sent as plain text
    Chunked(String),
    /// Nothing is sent
    Ignore,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    UnknownMode(#[from] UnknownMode),
    #[error("/{0} requires an argument")]
    MissingArgument(&'static str),
}

impl ValidationError {
    fn hint(&self) -> OutgoingMessage {
        match self {
            ValidationError::UnknownMode(_) => OutgoingMessage::markdown(replies::UNKNOWN_MODE),
            ValidationError::MissingArgument(command) => replies::usage(command),
        }
    }
}

/// What non-admins get back from admin-only commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AdminDeniedPolicy {
    #[default]
    Silent,
    Notice,
}

impl FromStr for AdminDeniedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "silent" | "ignore" => Ok(Self::Silent),
            "notice" | "deny" => Ok(Self::Notice),
            other => Err(format!("expected `silent` or `notice`, got `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub max_message_len: NonZeroUsize,
    pub admin: Option<UserId>,
    pub admin_denied: AdminDeniedPolicy,
    /// Username used to accept `/cmd@username`
    pub bot_username: String,
    pub broadcast_delay: Duration,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            admin: None,
            admin_denied: AdminDeniedPolicy::default(),
            bot_username: String::new(),
            broadcast_delay: ADMIN_BROADCAST_DELAY,
        }
    }
}

pub struct MessageRouter {
    sessions: Arc<dyn SessionStore>,
    registry: Arc<UserRegistry>,
    prompts: Arc<PromptCatalog>,
    gateway: Arc<AiGateway>,
    transport: Arc<dyn Transport>,
    broadcaster: Broadcaster,
    settings: RouterSettings,
}

impl MessageRouter {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        registry: Arc<UserRegistry>,
        prompts: Arc<PromptCatalog>,
        gateway: Arc<AiGateway>,
        transport: Arc<dyn Transport>,
        settings: RouterSettings,
    ) -> Self {
        let broadcaster = Broadcaster::new(registry.clone(), transport.clone());
        Self {
            sessions,
            registry,
            prompts,
            gateway,
            transport,
            broadcaster,
            settings,
        }
    }

    /// Register the sender, compute the reply and deliver it
    pub async fn handle(&self, inbound: Inbound) {
        let chat = inbound.chat;
        self.registry.register_if_absent(chat).await;
        let reply = self.respond(inbound).await;
        self.deliver(chat, reply).await;
    }

    pub async fn respond(&self, inbound: Inbound) -> Reply {
        let Inbound {
            chat,
            sender_name,
            kind,
        } = inbound;

        match kind {
            InboundKind::Text(text) if text.starts_with('/') => {
                self.on_command(chat, sender_name.as_deref(), &text).await
            }
            InboundKind::Text(text) => {
                self.sessions.apply(chat, Event::MessageReceived).await;
                match MenuButton::from_label(&text) {
                    Some(button) => self.on_button(chat, button).await,
                    None => self.on_text(chat, &text).await,
                }
            }
            InboundKind::Photo { file_id } => self.on_photo(chat, &file_id).await,
            InboundKind::Voice { file_id } => self.on_voice(chat, &file_id).await,
        }
    }

    async fn deliver(&self, chat: UserId, reply: Reply) {
        match reply {
            Reply::Direct(message) => {
                if let Err(e) = self.transport.send(chat, message).await {
                    tracing::warn!(chat = %chat, error = %e, "Failed to send reply");
                }
            }
            Reply::Chunked(text) => {
                let pieces = chunk(&text, self.settings.max_message_len);
                let total = pieces.len();
                for (i, piece) in pieces.into_iter().enumerate() {
                    if let Err(e) = self.transport.send(chat, OutgoingMessage::plain(piece)).await {
                        tracing::warn!(
                            chat = %chat,
                            chunk = i,
                            total,
                            error = %e,
                            "Failed to send reply chunk"
                        );
                        break;
                    }
                }
            }
            Reply::Ignore => {}
        }
    }

    /// Progress notice; failures only logged
    async fn notify(&self, chat: UserId, text: &str) {
        if let Err(e) = self.transport.send(chat, OutgoingMessage::plain(text)).await {
            tracing::debug!(chat = %chat, error = %e, "Failed to send progress notice");
        }
    }

    fn is_admin(&self, chat: UserId) -> bool {
        self.settings.admin == Some(chat)
    }

    /// Resolve the effective mode for `text` and ask the tutor prompt
    async fn tutor_reply(&self, chat: UserId, text: &str) -> String {
        let result = self.sessions.apply(chat, Event::resolve(text)).await;
        let mode = result
            .resolved_mode()
            .unwrap_or_else(|| crate::mode::detect_mode(text));
        tracing::info!(chat = %chat, mode = %mode, "Answering with tutor prompt");

        self.transport.send_chat_action(chat, ChatAction::Typing).await;
        let prompt = self.prompts.select(PromptKey::Tutor(mode));
        self.gateway.reply(prompt, text).await
    }

    async fn on_text(&self, chat: UserId, text: &str) -> Reply {
        Reply::Chunked(self.tutor_reply(chat, text).await)
    }

    async fn on_button(&self, chat: UserId, button: MenuButton) -> Reply {
        let message = match button {
            MenuButton::Mode(mode) => {
                self.sessions.apply(chat, Event::SetMode(mode.into())).await;
                replies::mode_button(mode)
            }
            MenuButton::GrammarTools => replies::grammar_tools(),
            MenuButton::ScreenshotOcr => replies::ocr_guide(),
            MenuButton::Feedback => replies::usage("feedback"),
            MenuButton::Help => replies::help(),
        };
        Reply::Direct(message)
    }

    async fn on_photo(&self, chat: UserId, file_id: &str) -> Reply {
        if !self.gateway.is_configured() {
            return Reply::Direct(OutgoingMessage::plain(GatewayError::NotConfigured.apology()));
        }
        self.sessions.apply(chat, Event::MessageReceived).await;

        let file = match self.transport.download(file_id).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(chat = %chat, error = %e, "Failed to download photo");
                return Reply::Direct(OutgoingMessage::plain(replies::PHOTO_DOWNLOAD_FAILED));
            }
        };
        self.notify(chat, replies::PHOTO_READING).await;

        let image = ImageSource::from_bytes(image_media_type(&file), &file.bytes);
        let ocr_text = match self
            .gateway
            .extract_text(self.prompts.select(PromptKey::Ocr), image)
            .await
        {
            Ok(text) => text,
            Err(GatewayError::EmptyResponse) => {
                return Reply::Direct(OutgoingMessage::plain(replies::OCR_EMPTY));
            }
            Err(e) => {
                tracing::error!(chat = %chat, error = %e, "OCR failed");
                return Reply::Direct(OutgoingMessage::plain(replies::OCR_FAILED));
            }
        };

        let reply = self.tutor_reply(chat, &ocr_text).await;
        Reply::Chunked(format!("{}{reply}", replies::PHOTO_HEADER))
    }

    async fn on_voice(&self, chat: UserId, file_id: &str) -> Reply {
        if !self.gateway.is_configured() {
            return Reply::Direct(OutgoingMessage::plain(GatewayError::NotConfigured.apology()));
        }
        self.sessions.apply(chat, Event::MessageReceived).await;

        let file = match self.transport.download(file_id).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(chat = %chat, error = %e, "Failed to download voice note");
                return Reply::Direct(OutgoingMessage::plain(replies::VOICE_DOWNLOAD_FAILED));
            }
        };
        self.notify(chat, replies::VOICE_LISTENING).await;

        let transcript = match self.gateway.transcribe(&audio_clip(file)).await {
            Ok(text) => text,
            Err(GatewayError::EmptyResponse) => {
                return Reply::Direct(OutgoingMessage::plain(replies::TRANSCRIPTION_EMPTY));
            }
            Err(e) => {
                tracing::error!(chat = %chat, error = %e, "Transcription failed");
                return Reply::Direct(OutgoingMessage::plain(replies::TRANSCRIPTION_FAILED));
            }
        };

        let reply = self.tutor_reply(chat, &transcript).await;
        Reply::Chunked(format!("{}{reply}", replies::voice_header(&transcript)))
    }

    async fn on_command(&self, chat: UserId, sender_name: Option<&str>, text: &str) -> Reply {
        let command = match Command::parse_text(text, &self.settings.bot_username) {
            Ok(command) => command,
            Err(e) => {
                let name = text.split_whitespace().next().unwrap_or(text);
                tracing::debug!(chat = %chat, command = name, error = %e, "Unrecognized command");
                return Reply::Direct(replies::unknown_command(name));
            }
        };
        tracing::info!(chat = %chat, command = command.name(), "Command received");

        if command.is_admin_only() && !self.is_admin(chat) {
            tracing::warn!(chat = %chat, command = command.name(), "Admin command from non-admin");
            return match self.settings.admin_denied {
                AdminDeniedPolicy::Silent => Reply::Ignore,
                AdminDeniedPolicy::Notice => {
                    Reply::Direct(OutgoingMessage::plain(replies::PERMISSION_DENIED))
                }
            };
        }

        let result = match command {
            Command::Start => Ok(Reply::Direct(replies::welcome(sender_name))),
            Command::Help => Ok(Reply::Direct(replies::help())),
            Command::About => Ok(Reply::Direct(replies::about())),
            Command::Menu => Ok(Reply::Direct(replies::menu())),
            Command::Mode(arg) => self.set_mode(chat, &arg).await,
            Command::Feedback(arg) => match required(&arg, "feedback") {
                Ok(message) => Ok(self.relay_feedback(chat, message).await),
                Err(e) => Err(e),
            },
            Command::Broadcast(arg) => match required(&arg, "broadcast") {
                Ok(message) => {
                    let report = self
                        .broadcaster
                        .broadcast_to_registered(
                            &replies::broadcast_text(message),
                            self.settings.broadcast_delay,
                        )
                        .await;
                    Ok(Reply::Direct(replies::broadcast_report(
                        report.sent,
                        report.failed,
                    )))
                }
                Err(e) => Err(e),
            },
            Command::Stats => {
                let stats = self.sessions.stats().await;
                Ok(Reply::Direct(replies::stats(self.registry.len().await, &stats)))
            }
            Command::Profile => {
                let session = self.sessions.session(chat).await;
                Ok(Reply::Direct(replies::profile(
                    chat,
                    self.registry.contains(chat).await,
                    session.mode,
                    session.message_count,
                )))
            }
            Command::Reset => {
                self.sessions.apply(chat, Event::Reset).await;
                Ok(Reply::Direct(replies::reset_done()))
            }
            Command::Kmgrammar(arg) => {
                self.grammar(chat, GrammarLanguage::Khmer, &arg, "kmgrammar")
                    .await
            }
            Command::Enggrammar(arg) => {
                self.grammar(chat, GrammarLanguage::English, &arg, "enggrammar")
                    .await
            }
            Command::Cngrammar(arg) => {
                self.grammar(chat, GrammarLanguage::Chinese, &arg, "cngrammar")
                    .await
            }
            Command::Explain(arg) => match required(&arg, "explain") {
                Ok(text) => {
                    self.notify(chat, replies::EXPLAIN_PROGRESS).await;
                    let reply = self.direct_prompt(chat, PromptKey::Explain, text).await;
                    Ok(Reply::Chunked(reply))
                }
                Err(e) => Err(e),
            },
            Command::Ko(arg) => {
                self.quick_translate(chat, TutorMode::KoreanLearner, &arg, "ko")
                    .await
            }
            Command::Ja(arg) => {
                self.quick_translate(chat, TutorMode::JapaneseLearner, &arg, "ja")
                    .await
            }
            Command::Ph(arg) => {
                self.quick_translate(chat, TutorMode::FilipinoLearner, &arg, "ph")
                    .await
            }
        };

        result.unwrap_or_else(|e| {
            tracing::debug!(chat = %chat, error = %e, "Invalid command input");
            Reply::Direct(e.hint())
        })
    }

    async fn set_mode(&self, chat: UserId, arg: &str) -> Result<Reply, ValidationError> {
        let Some(name) = arg.split_whitespace().next() else {
            let current = self.sessions.session(chat).await.mode;
            return Ok(Reply::Direct(replies::mode_overview(current)));
        };
        let setting = ModeSetting::from_str(name)?;
        self.sessions.apply(chat, Event::SetMode(setting)).await;
        Ok(Reply::Direct(replies::mode_changed(setting)))
    }

    async fn relay_feedback(&self, chat: UserId, message: &str) -> Reply {
        let Some(admin) = self.settings.admin else {
            return Reply::Direct(OutgoingMessage::plain(replies::FEEDBACK_NO_ADMIN));
        };

        match self
            .transport
            .send(admin, replies::feedback_relay(chat, message))
            .await
        {
            Ok(()) => {
                tracing::info!(chat = %chat, "Feedback relayed to admin");
                Reply::Direct(OutgoingMessage::plain(replies::FEEDBACK_SENT))
            }
            Err(e) => {
                tracing::error!(chat = %chat, error = %e, "Failed to relay feedback");
                Reply::Direct(OutgoingMessage::plain(replies::FEEDBACK_FAILED))
            }
        }
    }

    async fn grammar(
        &self,
        chat: UserId,
        language: GrammarLanguage,
        arg: &str,
        command: &'static str,
    ) -> Result<Reply, ValidationError> {
        let text = required(arg, command)?;
        self.notify(chat, replies::grammar_progress(language)).await;
        Ok(Reply::Chunked(
            self.direct_prompt(chat, PromptKey::Grammar(language), text).await,
        ))
    }

    async fn quick_translate(
        &self,
        chat: UserId,
        mode: TutorMode,
        arg: &str,
        command: &'static str,
    ) -> Result<Reply, ValidationError> {
        let text = required(arg, command)?;
        self.sessions.apply(chat, Event::QuickTranslate(mode)).await;
        self.notify(chat, replies::quick_translate_progress(mode)).await;
        Ok(Reply::Chunked(
            self.direct_prompt(chat, PromptKey::Tutor(mode), text).await,
        ))
    }

    /// Answer with a fixed template, bypassing mode resolution
    async fn direct_prompt(&self, chat: UserId, key: PromptKey, text: &str) -> String {
        self.transport.send_chat_action(chat, ChatAction::Typing).await;
        self.gateway.reply(self.prompts.select(key), text).await
    }
}

fn required<'a>(arg: &'a str, command: &'static str) -> Result<&'a str, ValidationError> {
    let arg = arg.trim();
    if arg.is_empty() {
        Err(ValidationError::MissingArgument(command))
    } else {
        Ok(arg)
    }
}

fn image_media_type(file: &DownloadedFile) -> &str {
    if file.media_type.starts_with("image/") {
        &file.media_type
    } else {
        "image/jpeg"
    }
}

/// Voice notes are stored as `.oga`; transcription endpoints expect `.ogg`
fn audio_clip(file: DownloadedFile) -> AudioClip {
    let file_name = match file.file_name.strip_suffix(".oga") {
        Some(stem) => format!("{stem}.ogg"),
        None => file.file_name,
    };
    AudioClip {
        data: file.bytes,
        file_name,
        media_type: file.media_type,
    }
}
