//! Property-based tests for the session state machine
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::*;
use crate::mode::{detect_mode, ModeSetting, TutorMode};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tutor_mode() -> impl Strategy<Value = TutorMode> {
    prop::sample::select(TutorMode::ALL.to_vec())
}

fn arb_setting() -> impl Strategy<Value = ModeSetting> {
    prop_oneof![
        Just(ModeSetting::Auto),
        arb_tutor_mode().prop_map(ModeSetting::Fixed),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z ]{0,20}",
        "[\u{1780}-\u{17FF} ]{0,20}",
        "[\u{4E00}-\u{9FFF}]{0,10}",
        "[\u{1780}-\u{17FF}a-z0-9 ]{0,20}",
    ]
}

fn arb_session() -> impl Strategy<Value = UserSession> {
    (arb_setting(), 0u64..1000).prop_map(|(mode, message_count)| UserSession {
        mode,
        message_count,
    })
}

/// Events that never change an explicitly chosen mode
fn arb_passive_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::MessageReceived),
        arb_text().prop_map(Event::resolve),
    ]
}

fn arb_policy() -> impl Strategy<Value = AutoDetectPolicy> {
    prop_oneof![
        Just(AutoDetectPolicy::LockIn),
        Just(AutoDetectPolicy::EveryMessage),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// After an explicit mode change, resolution ignores message content
    #[test]
    fn prop_explicit_mode_persists(
        start in arb_session(),
        mode in arb_tutor_mode(),
        events in prop::collection::vec(arb_passive_event(), 0..20),
        policy in arb_policy(),
    ) {
        let context = SessionContext::new(policy);
        let mut state = transition(&start, &context, Event::SetMode(mode.into())).new_state;

        for event in events {
            let result = transition(&state, &context, event);
            if let Some(resolved) = result.resolved_mode() {
                prop_assert_eq!(resolved, mode);
            }
            state = result.new_state;
        }
        prop_assert_eq!(state.mode, ModeSetting::Fixed(mode));
    }

    /// Reset always brings back detection for the next message
    #[test]
    fn prop_reset_reenables_detection(start in arb_session(), text in arb_text(), policy in arb_policy()) {
        let context = SessionContext::new(policy);
        let reset = transition(&start, &context, Event::Reset).new_state;
        prop_assert_eq!(reset, UserSession::default());

        let result = transition(&reset, &context, Event::resolve(text.clone()));
        prop_assert_eq!(
            result.outcome,
            Outcome::Resolved { mode: detect_mode(&text), detected: true }
        );
    }

    /// Under lock-in, the first detection is the last
    #[test]
    fn prop_lock_in_detects_once(texts in prop::collection::vec(arb_text(), 1..10)) {
        let context = SessionContext::new(AutoDetectPolicy::LockIn);
        let mut state = UserSession::default();
        let first = detect_mode(&texts[0]);

        for (i, text) in texts.into_iter().enumerate() {
            let result = transition(&state, &context, Event::resolve(text));
            prop_assert_eq!(
                result.outcome,
                Outcome::Resolved { mode: first, detected: i == 0 }
            );
            state = result.new_state;
        }
    }

    /// Resolution never touches the message counter
    #[test]
    fn prop_resolve_preserves_counter(start in arb_session(), text in arb_text(), policy in arb_policy()) {
        let result = transition(&start, &SessionContext::new(policy), Event::resolve(text));
        prop_assert_eq!(result.new_state.message_count, start.message_count);
    }

    /// Counter grows by exactly one per received message
    #[test]
    fn prop_counter_counts(start in arb_session(), n in 0u64..50) {
        let context = SessionContext::default();
        let mut state = start;
        for _ in 0..n {
            state = transition(&state, &context, Event::MessageReceived).new_state;
        }
        prop_assert_eq!(state.message_count, start.message_count + n);
        prop_assert_eq!(state.mode, start.mode);
    }
}
