//! Per-user conversation continuation state
//!
//! Each user maps to one thread on the backend. A thread that has been idle for
//! longer than the idle window is forgotten and the next message starts a new one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

/// Continuation ids for the next turn of a user's conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHandle {
    /// Backend thread id; `None` until the backend assigns one
    pub conversation_id: Option<String>,
    /// Turn the next message is chained onto
    pub parent_message_id: String,
}

#[derive(Debug, Clone)]
struct ConversationState {
    conversation_id: Option<String>,
    parent_message_id: String,
    expires_at: Instant,
}

impl ConversationState {
    fn fresh() -> Self {
        Self {
            conversation_id: None,
            parent_message_id: uuid::Uuid::new_v4().to_string(),
            expires_at: Instant::now(),
        }
    }
}

#[derive(Default)]
struct Slot {
    state: Option<ConversationState>,
    turn_lock: Arc<tokio::sync::Mutex<()>>,
}

/// Map of user id to conversation state, guarded by one lock
pub struct ConversationRegistry {
    idle_timeout: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl ConversationRegistry {
    /// Create an empty registry with the given idle window
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Idle window after which a conversation starts over
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Current ids for `user_id`, starting a new conversation if none is live.
    ///
    /// Always pushes the expiry out to now + idle window.
    pub fn get_or_create(&self, user_id: &str) -> ConversationHandle {
        self.get_or_create_at(user_id, Instant::now())
    }

    fn get_or_create_at(&self, user_id: &str, now: Instant) -> ConversationHandle {
        let expires_at = now + self.idle_timeout;
        let mut slots = self.slots.lock();
        let slot = slots.entry(user_id.to_string()).or_default();

        let state = match slot.state.take() {
            Some(state) if state.expires_at >= now => {
                tracing::debug!("User {} continues the conversation", user_id);
                state
            }
            _ => {
                tracing::info!("User {} starts a new conversation", user_id);
                ConversationState::fresh()
            }
        };
        let state = slot.state.insert(ConversationState { expires_at, ..state });

        ConversationHandle {
            conversation_id: state.conversation_id.clone(),
            parent_message_id: state.parent_message_id.clone(),
        }
    }

    /// Record the ids returned by a successful exchange. Expiry is left alone.
    pub fn commit(&self, user_id: &str, conversation_id: String, parent_message_id: String) {
        let mut slots = self.slots.lock();
        match slots.get_mut(user_id).and_then(|slot| slot.state.as_mut()) {
            Some(state) => {
                state.conversation_id = Some(conversation_id);
                state.parent_message_id = parent_message_id;
            }
            None => {
                tracing::warn!("Commit for unknown user {}, ignored", user_id);
            }
        }
    }

    /// Start an exchange for `user_id`.
    ///
    /// Waits for any in-flight exchange of the same user, so turns of one
    /// conversation never interleave. Other users are not blocked.
    pub async fn begin(&self, user_id: &str) -> ConversationTurn<'_> {
        let turn_lock = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(user_id.to_string()).or_default();
            Arc::clone(&slot.turn_lock)
        };

        let guard = turn_lock.lock_owned().await;
        let handle = self.get_or_create(user_id);

        ConversationTurn {
            registry: self,
            user_id: user_id.to_string(),
            handle,
            _guard: guard,
        }
    }

    /// Number of users with conversation state
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.state.is_some())
            .count()
    }

    /// Whether no user has conversation state
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An exchange in progress; holds the user's turn lock until dropped
pub struct ConversationTurn<'a> {
    registry: &'a ConversationRegistry,
    user_id: String,
    handle: ConversationHandle,
    _guard: OwnedMutexGuard<()>,
}

impl ConversationTurn<'_> {
    /// Ids to send with this turn
    pub fn handle(&self) -> &ConversationHandle {
        &self.handle
    }

    /// User this turn belongs to
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Store the ids from the backend's reply and release the turn
    pub fn commit(self, conversation_id: String, parent_message_id: String) {
        self.registry
            .commit(&self.user_id, conversation_id, parent_message_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(300);

    #[test]
    fn test_new_user_gets_fresh_state() {
        let registry = ConversationRegistry::new(IDLE);
        let handle = registry.get_or_create("alice");
        assert_eq!(handle.conversation_id, None);
        assert!(uuid::Uuid::parse_str(&handle.parent_message_id).is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_users_get_distinct_parents() {
        let registry = ConversationRegistry::new(IDLE);
        let a = registry.get_or_create("alice");
        let b = registry.get_or_create("bob");
        assert_ne!(a.parent_message_id, b.parent_message_id);
    }

    #[test]
    fn test_commit_within_window_is_kept() {
        let registry = ConversationRegistry::new(IDLE);
        let now = Instant::now();
        registry.get_or_create_at("alice", now);
        registry.commit("alice", "c1".into(), "m1".into());

        let handle = registry.get_or_create_at("alice", now + Duration::from_secs(299));
        assert_eq!(handle.conversation_id.as_deref(), Some("c1"));
        assert_eq!(handle.parent_message_id, "m1");
    }

    #[test]
    fn test_expired_state_starts_over() {
        let registry = ConversationRegistry::new(IDLE);
        let now = Instant::now();
        let first = registry.get_or_create_at("alice", now);
        registry.commit("alice", "c1".into(), "m1".into());

        let handle = registry.get_or_create_at("alice", now + Duration::from_secs(301));
        assert_eq!(handle.conversation_id, None);
        assert_ne!(handle.parent_message_id, "m1");
        assert_ne!(handle.parent_message_id, first.parent_message_id);
    }

    #[test]
    fn test_use_extends_expiry() {
        let registry = ConversationRegistry::new(IDLE);
        let now = Instant::now();
        registry.get_or_create_at("alice", now);
        registry.commit("alice", "c1".into(), "m1".into());

        // Each use pushes expiry forward, so 2 x 200s stays within the window
        registry.get_or_create_at("alice", now + Duration::from_secs(200));
        let handle = registry.get_or_create_at("alice", now + Duration::from_secs(400));
        assert_eq!(handle.conversation_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_commit_unknown_user_is_ignored() {
        let registry = ConversationRegistry::new(IDLE);
        registry.commit("ghost", "c".into(), "m".into());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_turn_commit_updates_state() {
        let registry = ConversationRegistry::new(IDLE);
        let turn = registry.begin("alice").await;
        assert_eq!(turn.handle().conversation_id, None);
        assert_eq!(turn.user_id(), "alice");
        turn.commit("c1".into(), "m1".into());

        let handle = registry.get_or_create("alice");
        assert_eq!(handle.conversation_id.as_deref(), Some("c1"));
        assert_eq!(handle.parent_message_id, "m1");
    }

    #[tokio::test]
    async fn test_dropped_turn_keeps_parent() {
        let registry = ConversationRegistry::new(IDLE);
        let parent = {
            let turn = registry.begin("alice").await;
            turn.handle().parent_message_id.clone()
        };
        let again = registry.begin("alice").await;
        assert_eq!(again.handle().parent_message_id, parent);
    }

    #[tokio::test]
    async fn test_same_user_turns_are_serialized() {
        let registry = Arc::new(ConversationRegistry::new(IDLE));
        let first = registry.begin("alice").await;

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let turn = registry.begin("alice").await;
                turn.handle().clone()
            })
        };

        // Another user is not blocked by alice's open turn
        let bob = tokio::time::timeout(Duration::from_secs(1), registry.begin("bob")).await;
        assert!(bob.is_ok());
        drop(bob);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        first.commit("c1".into(), "m1".into());
        let second = waiter.await.unwrap();
        assert_eq!(second.conversation_id.as_deref(), Some("c1"));
        assert_eq!(second.parent_message_id, "m1");
    }
}
