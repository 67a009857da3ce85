use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use lumora_schema::Turn;

/// Bound on turns forwarded to the language model per session.
pub const DEFAULT_HISTORY_TURNS: usize = 6;

/// Per-session conversation history, bounded to the most recent N turns.
/// Oldest turns are dropped first.
pub struct HistoryStore {
    inner: RwLock<HashMap<String, VecDeque<Turn>>>,
    max_turns: usize,
}

impl HistoryStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            max_turns: max_turns.max(1),
        }
    }

    pub fn push(&self, key: &str, turn: Turn) {
        let mut histories = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let history = histories.entry(key.to_owned()).or_default();
        history.push_back(turn);
        while history.len() > self.max_turns {
            history.pop_front();
        }
    }

    /// Recent turns in chronological order.
    pub fn recent(&self, key: &str) -> Vec<Turn> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self, key: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_chronological_order() {
        let store = HistoryStore::new(DEFAULT_HISTORY_TURNS);
        store.push("s1", Turn::user("привет"));
        store.push("s1", Turn::assistant("здравствуйте"));

        let turns = store.recent("s1");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "привет");
        assert_eq!(turns[1].content, "здравствуйте");
    }

    #[test]
    fn never_exceeds_the_bound() {
        let store = HistoryStore::new(DEFAULT_HISTORY_TURNS);
        for i in 0..20 {
            store.push("s1", Turn::user(format!("сообщение {i}")));
        }
        let turns = store.recent("s1");
        assert_eq!(turns.len(), DEFAULT_HISTORY_TURNS);
        // Oldest dropped first.
        assert_eq!(turns[0].content, "сообщение 14");
        assert_eq!(turns[5].content, "сообщение 19");
    }

    #[test]
    fn sessions_are_independent() {
        let store = HistoryStore::new(2);
        store.push("a", Turn::user("a1"));
        store.push("b", Turn::user("b1"));
        assert_eq!(store.recent("a").len(), 1);
        assert_eq!(store.recent("b").len(), 1);
        assert!(store.recent("c").is_empty());
    }

    #[test]
    fn clear_forgets_a_session() {
        let store = HistoryStore::new(2);
        store.push("a", Turn::user("a1"));
        assert!(store.clear("a"));
        assert!(!store.clear("a"));
        assert!(store.recent("a").is_empty());
    }
}
