//! In-memory per-user session table
//!
//! Holds each user's mode setting and message counter. Nothing here is
//! persisted; a restart puts everybody back on `auto`.

use crate::mode::{ModeSetting, TutorMode};
use crate::registry::UserId;
use crate::state_machine::{transition, Event, SessionContext, TransitionResult, UserSession};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Aggregate view used by the admin `/stats` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Users with a session in memory
    pub active_users: usize,
    pub total_messages: u64,
    /// Users per setting, `auto` first, then every tutor mode
    pub modes: Vec<(ModeSetting, usize)>,
}

/// Storage for user sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Apply one event to a user's session atomically and return the result
    async fn apply(&self, user: UserId, event: Event) -> TransitionResult;

    /// Current session, or the default one for unseen users
    async fn session(&self, user: UserId) -> UserSession;

    async fn stats(&self) -> SessionStats;
}

/// `SessionStore` backed by a `HashMap` behind an async `RwLock`
pub struct InMemorySessionStore {
    context: SessionContext,
    sessions: RwLock<HashMap<UserId, UserSession>>,
}

impl InMemorySessionStore {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn apply(&self, user: UserId, event: Event) -> TransitionResult {
        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(user).or_default();
        let result = transition(session, &self.context, event);

        if result.new_state.mode != session.mode {
            tracing::info!(
                user = %user,
                from = %session.mode,
                to = %result.new_state.mode,
                "Mode changed"
            );
        }
        *session = result.new_state;
        result
    }

    async fn session(&self, user: UserId) -> UserSession {
        self.sessions
            .read()
            .await
            .get(&user)
            .copied()
            .unwrap_or_default()
    }

    async fn stats(&self) -> SessionStats {
        let sessions = self.sessions.read().await;

        let mut modes: Vec<(ModeSetting, usize)> = std::iter::once(ModeSetting::Auto)
            .chain(TutorMode::ALL.into_iter().map(ModeSetting::Fixed))
            .map(|setting| (setting, 0))
            .collect();
        for session in sessions.values() {
            if let Some((_, count)) = modes.iter_mut().find(|(s, _)| *s == session.mode) {
                *count += 1;
            }
        }

        SessionStats {
            active_users: sessions.len(),
            total_messages: sessions.values().map(|s| s.message_count).sum(),
            modes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::AutoDetectPolicy;

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(SessionContext::new(AutoDetectPolicy::LockIn))
    }

    #[tokio::test]
    async fn test_unseen_user_is_auto() {
        let store = store();
        assert_eq!(store.session(UserId(1)).await, UserSession::default());
    }

    #[tokio::test]
    async fn test_apply_persists_between_calls() {
        let store = store();
        let user = UserId(7);

        let first = store.apply(user, Event::resolve("你好")).await;
        assert_eq!(first.resolved_mode(), Some(TutorMode::Foreigner));

        let second = store.apply(user, Event::resolve("សួស្តី")).await;
        assert_eq!(second.resolved_mode(), Some(TutorMode::Foreigner));
        assert_eq!(
            store.session(user).await.mode,
            ModeSetting::Fixed(TutorMode::Foreigner)
        );
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let store = store();
        store
            .apply(UserId(1), Event::SetMode(TutorMode::KoreanLearner.into()))
            .await;

        assert_eq!(store.session(UserId(2)).await.mode, ModeSetting::Auto);
    }

    #[tokio::test]
    async fn test_stats_distribution() {
        let store = store();
        store.apply(UserId(1), Event::MessageReceived).await;
        store.apply(UserId(1), Event::MessageReceived).await;
        store
            .apply(UserId(2), Event::SetMode(TutorMode::FilipinoLearner.into()))
            .await;
        store.apply(UserId(3), Event::MessageReceived).await;

        let stats = store.stats().await;
        assert_eq!(stats.active_users, 3);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.modes.len(), 6);
        assert_eq!(stats.modes[0], (ModeSetting::Auto, 2));
        assert!(stats
            .modes
            .contains(&(ModeSetting::Fixed(TutorMode::FilipinoLearner), 1)));
    }
}
