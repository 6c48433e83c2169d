//! Session state types

use crate::mode::ModeSetting;
use serde::{Deserialize, Serialize};

/// What is remembered about one user for the lifetime of the process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub mode: ModeSetting,
    /// Messages processed since start-up or the last reset
    pub message_count: u64,
}

/// How an `auto` setting behaves once a message has been classified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoDetectPolicy {
    /// The first detected mode is written back and sticks until reset
    #[default]
    LockIn,
    /// Detection re-runs for every message; the setting stays `auto`
    EveryMessage,
}

impl std::str::FromStr for AutoDetectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lock-in" | "lockin" | "once" => Ok(Self::LockIn),
            "every-message" | "always" => Ok(Self::EveryMessage),
            other => Err(format!("expected `lock-in` or `every-message`, got `{other}`")),
        }
    }
}

/// Immutable inputs to every transition
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionContext {
    pub policy: AutoDetectPolicy,
}

impl SessionContext {
    pub fn new(policy: AutoDetectPolicy) -> Self {
        Self { policy }
    }
}
