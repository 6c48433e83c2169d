//! Slash commands and reply-keyboard buttons

use crate::mode::TutorMode;
use teloxide::utils::command::{BotCommands, ParseError};

/// Every command the bot understands.
///
/// Argument-taking commands receive the raw remainder of the message,
/// possibly empty.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "welcome message and main keyboard")]
    Start,
    #[command(description = "usage guide")]
    Help,
    #[command(description = "about this bot")]
    About,
    #[command(description = "show the main keyboard")]
    Menu,
    #[command(description = "show or change the tutoring mode")]
    Mode(String),
    #[command(description = "send feedback to the admin")]
    Feedback(String),
    #[command(description = "admin: message every user")]
    Broadcast(String),
    #[command(description = "admin: bot statistics")]
    Stats,
    #[command(description = "your profile in this bot")]
    Profile,
    #[command(description = "reset mode and message counter")]
    Reset,
    #[command(description = "Khmer grammar correction")]
    Kmgrammar(String),
    #[command(description = "English grammar correction")]
    Enggrammar(String),
    #[command(description = "Chinese grammar correction")]
    Cngrammar(String),
    #[command(description = "explain a sentence in Khmer")]
    Explain(String),
    #[command(description = "quick Khmer → Korean")]
    Ko(String),
    #[command(description = "quick Khmer → Japanese")]
    Ja(String),
    #[command(description = "quick Khmer → Filipino")]
    Ph(String),
}

impl Command {
    /// Parse a message starting with `/`.
    ///
    /// Command names match case-insensitively; arguments keep their case.
    /// Arguments after a command that takes none are dropped, so deep-link
    /// payloads like `/start ref42` still work. Commands addressed to another
    /// bot are rejected.
    pub fn parse_text(text: &str, bot_username: &str) -> Result<Self, ParseError> {
        let text = lowercase_command_name(text);
        match Self::parse(&text, bot_username) {
            Err(ParseError::TooManyArguments { .. }) => {
                let bare = text.split_whitespace().next().unwrap_or(text.as_str());
                Self::parse(bare, bot_username)
            }
            other => other,
        }
    }

    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Help => "help",
            Command::About => "about",
            Command::Menu => "menu",
            Command::Mode(_) => "mode",
            Command::Feedback(_) => "feedback",
            Command::Broadcast(_) => "broadcast",
            Command::Stats => "stats",
            Command::Profile => "profile",
            Command::Reset => "reset",
            Command::Kmgrammar(_) => "kmgrammar",
            Command::Enggrammar(_) => "enggrammar",
            Command::Cngrammar(_) => "cngrammar",
            Command::Explain(_) => "explain",
            Command::Ko(_) => "ko",
            Command::Ja(_) => "ja",
            Command::Ph(_) => "ph",
        }
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(self, Command::Broadcast(_) | Command::Stats)
    }
}

/// `/Mode@TutorBot Korean` becomes `/mode@TutorBot Korean`
fn lowercase_command_name(text: &str) -> String {
    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    let (token, rest) = text.split_at(end);
    match token.split_once('@') {
        Some((name, bot)) => format!("{}@{bot}{rest}", name.to_lowercase()),
        None => format!("{}{rest}", token.to_lowercase()),
    }
}

/// Buttons of the main reply keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuButton {
    Mode(TutorMode),
    GrammarTools,
    ScreenshotOcr,
    Feedback,
    Help,
}

impl MenuButton {
    /// Keyboard layout, row by row
    const LAYOUT: [&'static [MenuButton]; 5] = [
        &[
            MenuButton::Mode(TutorMode::KhmerLearner),
            MenuButton::Mode(TutorMode::Foreigner),
        ],
        &[
            MenuButton::Mode(TutorMode::KoreanLearner),
            MenuButton::Mode(TutorMode::JapaneseLearner),
        ],
        &[MenuButton::Mode(TutorMode::FilipinoLearner)],
        &[MenuButton::GrammarTools, MenuButton::ScreenshotOcr],
        &[MenuButton::Feedback, MenuButton::Help],
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuButton::Mode(TutorMode::KhmerLearner) => "🇰🇭 → 🇺🇸🇨🇳 (Learner)",
            MenuButton::Mode(TutorMode::Foreigner) => "🇺🇸/🇨🇳 → 🇰🇭 (Foreigner)",
            MenuButton::Mode(TutorMode::KoreanLearner) => "🇰🇭 → 🇰🇷 (Korean)",
            MenuButton::Mode(TutorMode::JapaneseLearner) => "🇰🇭 → 🇯🇵 (Japanese)",
            MenuButton::Mode(TutorMode::FilipinoLearner) => "🇰🇭 → 🇵🇭 (Filipino)",
            MenuButton::GrammarTools => "✏️ Grammar Tools",
            MenuButton::ScreenshotOcr => "🖼 Screenshot OCR",
            MenuButton::Feedback => "📩 Feedback",
            MenuButton::Help => "ℹ️ Help / Guide",
        }
    }

    /// Exact label match; anything else is ordinary text
    pub fn from_label(text: &str) -> Option<Self> {
        Self::LAYOUT
            .iter()
            .flat_map(|row| row.iter())
            .copied()
            .find(|button| button.label() == text)
    }

    pub fn keyboard() -> Vec<Vec<String>> {
        Self::LAYOUT
            .iter()
            .map(|row| row.iter().map(|b| b.label().to_string()).collect())
            .collect()
    }
}
