//! Tutor Bot - Khmer language tutor on Telegram
//!
//! Receives text, screenshots and voice notes, answers through a hosted
//! LLM with a per-user tutoring mode, and sends daily greetings.

mod broadcast;
mod chunker;
mod config;
mod gateway;
mod keep_alive;
mod llm;
mod mode;
mod prompts;
mod registry;
mod router;
mod session;
mod state_machine;
#[cfg(test)]
mod testing;
mod transport;

use broadcast::Broadcaster;
use config::Config;
use gateway::AiGateway;
use llm::{GroqService, LlmService, LoggingService};
use prompts::PromptCatalog;
use registry::{UserId, UserRegistry};
use router::command::Command;
use router::{Inbound, InboundKind, MessageRouter, RouterSettings};
use session::InMemorySessionStore;
use state_machine::SessionContext;
use std::path::Path;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::{TelegramTransport, Transport};

/// JSON logs to stdout plus a daily-rotated file under `log_dir`
fn init_logging(log_dir: &Path) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "bot.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tutor_bot=info,teloxide=warn,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(file_writer),
        )
        .init();

    guard
}

/// Strip a Telegram message down to what the router needs
fn inbound_from(msg: &Message) -> Option<Inbound> {
    let kind = if let Some(text) = msg.text() {
        InboundKind::Text(text.to_string())
    } else if let Some(photo) = msg.photo().and_then(<[_]>::last) {
        InboundKind::Photo {
            file_id: photo.file.id.clone(),
        }
    } else if let Some(voice) = msg.voice() {
        InboundKind::Voice {
            file_id: voice.file.id.clone(),
        }
    } else {
        return None;
    };

    Some(Inbound {
        chat: UserId(msg.chat.id.0),
        sender_name: msg.from.as_ref().map(|user| user.first_name.clone()),
        kind,
    })
}

async fn on_message(msg: Message, router: Arc<MessageRouter>) -> ResponseResult<()> {
    match inbound_from(&msg) {
        Some(inbound) => router.handle(inbound).await,
        None => tracing::debug!(chat = msg.chat.id.0, "Ignoring unsupported message kind"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = config::log_dir_from_env();
    let _log_guard = init_logging(&log_dir);

    // Configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    let prompts = match PromptCatalog::load(config.prompts_dir.as_deref()) {
        Ok(prompts) => Arc::new(prompts),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load prompt templates");
            return Err(e.into());
        }
    };

    // Model access
    let llm: Option<Arc<dyn LlmService>> = match &config.groq_api_key {
        Some(key) => {
            let groq = GroqService::new(key.clone(), config.models.clone(), &config.groq_base_url)?;
            tracing::info!(
                chat = %config.models.chat,
                vision = %config.models.vision,
                transcription = %config.models.transcription,
                "Groq client initialized"
            );
            Some(Arc::new(LoggingService::new(Arc::new(groq))))
        }
        None => {
            tracing::warn!("GROQ_API_KEY not set. Every model call will answer with an apology.");
            None
        }
    };
    let gateway = Arc::new(AiGateway::new(llm, config.ai_timeout));

    // State
    let registry = Arc::new(UserRegistry::new(&config.users_file));
    tracing::info!(
        path = %config.users_file.display(),
        users = registry.len().await,
        "User registry loaded"
    );
    let sessions = Arc::new(InMemorySessionStore::new(SessionContext::new(
        config.auto_detect,
    )));

    // Telegram
    let bot = Bot::new(&config.telegram_token);
    let bot_username = match bot.get_me().await {
        Ok(me) => me.username().to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch bot identity");
            String::new()
        }
    };
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!(error = %e, "Failed to register command menu");
    }
    if let Err(e) = bot.delete_webhook().drop_pending_updates(true).await {
        tracing::warn!(error = %e, "Failed to delete webhook");
    }
    let transport: Arc<dyn Transport> = Arc::new(TelegramTransport::new(bot.clone()));

    let router = Arc::new(MessageRouter::new(
        sessions,
        registry.clone(),
        prompts,
        gateway,
        transport.clone(),
        RouterSettings {
            max_message_len: config.max_message_len,
            admin: config.admin,
            admin_denied: config.admin_denied,
            bot_username: bot_username.clone(),
            ..RouterSettings::default()
        },
    ));

    // Background tasks
    let cancel = CancellationToken::new();
    if let Some(schedule) = config.daily_alerts.clone() {
        let broadcaster = Arc::new(Broadcaster::new(registry, transport));
        tokio::spawn(schedule.run(broadcaster, cancel.clone()));
    }
    if let Some(port) = config.keep_alive_port {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = keep_alive::serve(port, cancel).await {
                tracing::error!(port, error = %e, "Keep-alive server failed");
            }
        });
    }

    tracing::info!(
        bot = %bot_username,
        admin = ?config.admin,
        log_dir = %log_dir.display(),
        "Bot is running"
    );

    let handler = Update::filter_message().endpoint(on_message);
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router])
        .default_handler(|upd| async move {
            tracing::debug!(update_id = upd.id.0, "Unhandled update");
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    cancel.cancel();
    tracing::info!("Bot stopped");
    Ok(())
}
