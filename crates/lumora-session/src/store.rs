use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use lumora_schema::{SpaceContext, Step};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Idle window after which a conversation resets.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 600;

/// Per-conversation mutable record: current step, accumulated slots,
/// phrase rotation and question counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub step: Step,
    pub context: SpaceContext,
    pub phrase_index: usize,
    pub questions_asked: u32,
    /// Models recommended on the last matching pass, kept for lead capture.
    #[serde(default)]
    pub last_products: Vec<String>,
    #[serde(default)]
    pub last_quantity: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl SessionState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            step: Step::Greeting,
            context: SpaceContext::default(),
            phrase_index: 0,
            questions_asked: 0,
            last_products: Vec::new(),
            last_quantity: None,
            created_at: now,
            last_active: now,
        }
    }

    pub fn is_expired(&self, ttl_seconds: i64) -> bool {
        (Utc::now() - self.last_active).num_seconds() >= ttl_seconds
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a session fetch: the state plus whether an expired record
/// was replaced by a fresh one.
pub struct SessionFetch {
    pub state: SessionState,
    pub expired_previous: bool,
}

/// In-memory session records keyed by an opaque session identifier.
/// Time-expiring: an idle record is indistinguishable from a brand-new
/// session on the next access.
pub struct SessionStore {
    inner: RwLock<HashMap<String, SessionState>>,
    ttl_seconds: i64,
}

impl SessionStore {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl_seconds,
        }
    }

    pub fn get_or_create(&self, key: &str) -> SessionFetch {
        let mut sessions = self.inner.write().unwrap_or_else(|e| e.into_inner());
        match sessions.get_mut(key) {
            Some(state) if !state.is_expired(self.ttl_seconds) => {
                state.touch();
                SessionFetch {
                    state: state.clone(),
                    expired_previous: false,
                }
            }
            Some(_) => {
                debug!(session = key, "session expired, starting fresh");
                let state = SessionState::new();
                sessions.insert(key.to_owned(), state.clone());
                SessionFetch {
                    state,
                    expired_previous: true,
                }
            }
            None => {
                let state = SessionState::new();
                sessions.insert(key.to_owned(), state.clone());
                SessionFetch {
                    state,
                    expired_previous: false,
                }
            }
        }
    }

    /// Non-creating read. Expired records read as absent.
    pub fn peek(&self, key: &str) -> Option<SessionState> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .filter(|state| !state.is_expired(self.ttl_seconds))
            .cloned()
    }

    pub fn update(&self, key: &str, mut state: SessionState) {
        state.touch();
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_owned(), state);
    }

    pub fn reset(&self, key: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some()
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let mut sessions = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, state| !state.is_expired(self.ttl_seconds));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lumora_schema::SpaceType;

    #[test]
    fn fresh_session_starts_at_greeting() {
        let store = SessionStore::new(DEFAULT_SESSION_TTL_SECONDS);
        let fetch = store.get_or_create("s1");
        assert_eq!(fetch.state.step, Step::Greeting);
        assert!(fetch.state.context.space.is_none());
        assert!(!fetch.expired_previous);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn updates_are_visible_on_next_fetch() {
        let store = SessionStore::new(DEFAULT_SESSION_TTL_SECONDS);
        let mut state = store.get_or_create("s1").state;
        state.step = Step::Questions(SpaceType::Office);
        state.context.area = Some("50".into());
        store.update("s1", state);

        let fetched = store.get_or_create("s1").state;
        assert_eq!(fetched.step, Step::Questions(SpaceType::Office));
        assert_eq!(fetched.context.area.as_deref(), Some("50"));
    }

    #[test]
    fn expired_session_is_replaced_by_a_fresh_one() {
        let store = SessionStore::new(DEFAULT_SESSION_TTL_SECONDS);
        let mut state = store.get_or_create("s1").state;
        state.step = Step::RecommendationSent;
        state.context.area = Some("50".into());
        state.last_active = Utc::now() - Duration::seconds(DEFAULT_SESSION_TTL_SECONDS + 1);
        store
            .inner
            .write()
            .expect("lock")
            .insert("s1".to_owned(), state);

        let fetch = store.get_or_create("s1");
        assert!(fetch.expired_previous);
        assert_eq!(fetch.state.step, Step::Greeting);
        assert!(fetch.state.context.area.is_none());
    }

    #[test]
    fn reset_removes_the_record() {
        let store = SessionStore::new(DEFAULT_SESSION_TTL_SECONDS);
        store.get_or_create("s1");
        assert!(store.reset("s1"));
        assert!(!store.reset("s1"));
        assert!(store.is_empty());
    }

    #[test]
    fn prune_drops_only_idle_sessions() {
        let store = SessionStore::new(DEFAULT_SESSION_TTL_SECONDS);
        store.get_or_create("live");
        let mut stale = SessionState::new();
        stale.last_active = Utc::now() - Duration::seconds(DEFAULT_SESSION_TTL_SECONDS * 2);
        store
            .inner
            .write()
            .expect("lock")
            .insert("stale".to_owned(), stale);

        assert_eq!(store.prune_expired(), 1);
        assert_eq!(store.len(), 1);
    }
}
