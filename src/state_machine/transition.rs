//! Pure state transition function
//!
//! Given the same session, context and event this always produces the same
//! result. The only impurity-looking step, auto-detection, is itself a pure
//! function of the message text.

use super::{AutoDetectPolicy, Event, SessionContext, UserSession};
use crate::mode::{detect_mode, ModeSetting, TutorMode};

/// What the caller learns from a transition besides the new state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State changed (or not); nothing to report
    Updated,
    /// The effective mode for the message being answered
    Resolved {
        mode: TutorMode,
        /// True when the heuristic ran for this message
        detected: bool,
    },
}

/// Result of a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: UserSession,
    pub outcome: Outcome,
}

impl TransitionResult {
    fn updated(state: UserSession) -> Self {
        Self {
            new_state: state,
            outcome: Outcome::Updated,
        }
    }

    /// The resolved mode, if this was a `Resolve` transition
    pub fn resolved_mode(&self) -> Option<TutorMode> {
        match self.outcome {
            Outcome::Resolved { mode, .. } => Some(mode),
            Outcome::Updated => None,
        }
    }
}

/// Pure transition function
pub fn transition(state: &UserSession, context: &SessionContext, event: Event) -> TransitionResult {
    match event {
        Event::SetMode(mode) => TransitionResult::updated(UserSession { mode, ..*state }),

        Event::QuickTranslate(mode) => TransitionResult::updated(UserSession {
            mode: ModeSetting::Fixed(mode),
            ..*state
        }),

        Event::Reset => TransitionResult::updated(UserSession {
            mode: ModeSetting::Auto,
            message_count: 0,
        }),

        Event::MessageReceived => TransitionResult::updated(UserSession {
            message_count: state.message_count.saturating_add(1),
            ..*state
        }),

        Event::Resolve { text } => match state.mode {
            ModeSetting::Fixed(mode) => TransitionResult {
                new_state: *state,
                outcome: Outcome::Resolved {
                    mode,
                    detected: false,
                },
            },
            ModeSetting::Auto => {
                let mode = detect_mode(&text);
                let new_state = match context.policy {
                    AutoDetectPolicy::LockIn => UserSession {
                        mode: ModeSetting::Fixed(mode),
                        ..*state
                    },
                    AutoDetectPolicy::EveryMessage => *state,
                };
                TransitionResult {
                    new_state,
                    outcome: Outcome::Resolved {
                        mode,
                        detected: true,
                    },
                }
            }
        },
    }
}
