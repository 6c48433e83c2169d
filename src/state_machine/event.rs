//! Events that drive a user's session

use crate::mode::{ModeSetting, TutorMode};

/// Events that trigger session transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Explicit `/mode` command or keyboard mode button
    SetMode(ModeSetting),
    /// One-off translation shortcut (`/ko`, `/ja`, `/ph`); also pins the mode
    QuickTranslate(TutorMode),
    /// Back to `auto` with a zeroed message counter
    Reset,
    /// A non-command message arrived (text, photo or voice)
    MessageReceived,
    /// Pick the mode to answer `text` with
    Resolve { text: String },
}

impl Event {
    pub fn resolve(text: impl Into<String>) -> Self {
        Event::Resolve { text: text.into() }
    }
}
