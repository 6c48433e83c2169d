//! Tutoring modes and script-based auto-detection
//!
//! A user's [`ModeSetting`] is either `Auto` or pinned to one [`TutorMode`].
//! Resolution always produces a concrete `TutorMode`, so everything
//! downstream (prompt lookup, reply formatting) only deals with concrete modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const KHMER_RANGE: std::ops::RangeInclusive<char> = '\u{1780}'..='\u{17FF}';
const CJK_RANGE: std::ops::RangeInclusive<char> = '\u{4E00}'..='\u{9FFF}';

/// Concrete tutoring direction used to pick a prompt template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TutorMode {
    /// Khmer speaker learning English + Chinese
    KhmerLearner,
    /// English/Chinese speaker learning Khmer
    Foreigner,
    KoreanLearner,
    JapaneseLearner,
    FilipinoLearner,
}

impl TutorMode {
    pub const ALL: [TutorMode; 5] = [
        TutorMode::KhmerLearner,
        TutorMode::Foreigner,
        TutorMode::KoreanLearner,
        TutorMode::JapaneseLearner,
        TutorMode::FilipinoLearner,
    ];

    /// Canonical name, as accepted by `/mode` and shown in `/profile`
    pub fn as_str(self) -> &'static str {
        match self {
            TutorMode::KhmerLearner => "learner",
            TutorMode::Foreigner => "foreigner",
            TutorMode::KoreanLearner => "korean",
            TutorMode::JapaneseLearner => "japanese",
            TutorMode::FilipinoLearner => "filipino",
        }
    }

    /// Human-readable label with translation direction
    pub fn label(self) -> &'static str {
        match self {
            TutorMode::KhmerLearner => "Khmer Learner (KM → EN + CN)",
            TutorMode::Foreigner => "Foreigner (EN/CN → KM)",
            TutorMode::KoreanLearner => "Korean Learner (KM → KO)",
            TutorMode::JapaneseLearner => "Japanese Learner (KM → JA)",
            TutorMode::FilipinoLearner => "Filipino Learner (KM → PH)",
        }
    }
}

impl fmt::Display for TutorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user mode assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "mode", rename_all = "snake_case")]
pub enum ModeSetting {
    /// Resolve from the next message's script
    #[default]
    Auto,
    Fixed(TutorMode),
}

impl ModeSetting {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeSetting::Auto => "auto",
            ModeSetting::Fixed(mode) => mode.as_str(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ModeSetting::Auto => "Auto-detect",
            ModeSetting::Fixed(mode) => mode.label(),
        }
    }
}

impl fmt::Display for ModeSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TutorMode> for ModeSetting {
    fn from(mode: TutorMode) -> Self {
        ModeSetting::Fixed(mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for ModeSetting {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let setting = match s.trim().to_lowercase().as_str() {
            "learner" | "khmer" | "student" => TutorMode::KhmerLearner.into(),
            "foreigner" | "en" | "eng" | "english" => TutorMode::Foreigner.into(),
            "korean" | "kr" => TutorMode::KoreanLearner.into(),
            "japanese" | "jp" => TutorMode::JapaneseLearner.into(),
            "filipino" | "tagalog" | "ph" => TutorMode::FilipinoLearner.into(),
            "auto" | "detect" => ModeSetting::Auto,
            _ => return Err(UnknownMode(s.trim().to_string())),
        };
        Ok(setting)
    }
}

/// Which script families appear in a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptSignals {
    pub khmer: bool,
    pub cjk: bool,
    pub latin: bool,
}

impl ScriptSignals {
    pub fn scan(text: &str) -> Self {
        text.chars().fold(Self::default(), |mut signals, ch| {
            signals.khmer |= KHMER_RANGE.contains(&ch);
            signals.cjk |= CJK_RANGE.contains(&ch);
            signals.latin |= ch.is_ascii_alphabetic();
            signals
        })
    }

    fn has_foreign(self) -> bool {
        self.latin || self.cjk
    }
}

/// Infer a tutoring mode from the scripts present in `text`.
///
/// Khmer-only text means a Khmer speaker (learner); Latin/CJK-only text means a
/// foreigner. Mixed scripts and script-less input (emoji, digits) fall back
/// to the learner mode.
pub fn detect_mode(text: &str) -> TutorMode {
    let signals = ScriptSignals::scan(text);

    if signals.has_foreign() && !signals.khmer {
        TutorMode::Foreigner
    } else {
        TutorMode::KhmerLearner
    }
}
