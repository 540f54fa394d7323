//! Per-session conversation windows.
//!
//! Each session keeps its last `window` question/answer turns. Sessions
//! that stay idle longer than the TTL are dropped, and the store never holds
//! more than `max_sessions` entries; the least recently used one goes first.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::core::config::MemoryConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

struct SessionEntry {
    turns: VecDeque<Turn>,
    last_active: Instant,
}

pub struct SessionStore {
    inner: Mutex<LruCache<String, SessionEntry>>,
    window: usize,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(window: usize, ttl: Duration, max_sessions: usize) -> Self {
        let capacity = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            window: window.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(
            config.window,
            Duration::from_secs(config.session_ttl_secs),
            config.max_sessions,
        )
    }

    /// Oldest first.
    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        self.history_at(session_id, Instant::now())
    }

    pub fn record(&self, session_id: &str, turn: Turn) {
        self.record_at(session_id, turn, Instant::now());
    }

    /// Returns whether the session existed.
    pub fn clear(&self, session_id: &str) -> bool {
        self.lock().pop(session_id).is_some()
    }

    /// Drops idle sessions; returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, SessionEntry>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_expired(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_active) > self.ttl
    }

    fn history_at(&self, session_id: &str, now: Instant) -> Vec<Turn> {
        let mut sessions = self.lock();
        let Some(entry) = sessions.get_mut(session_id) else {
            return Vec::new();
        };
        if self.is_expired(entry, now) {
            sessions.pop(session_id);
            return Vec::new();
        }
        entry.last_active = now;
        entry.turns.iter().cloned().collect()
    }

    fn record_at(&self, session_id: &str, turn: Turn, now: Instant) {
        let mut sessions = self.lock();

        let expired = sessions
            .peek(session_id)
            .is_some_and(|entry| self.is_expired(entry, now));
        if expired {
            sessions.pop(session_id);
        }

        if !sessions.contains(session_id) {
            let fresh = SessionEntry {
                turns: VecDeque::with_capacity(self.window),
                last_active: now,
            };
            if let Some((evicted, _)) = sessions.push(session_id.to_string(), fresh) {
                tracing::debug!("Evicted least recently used session {}", evicted);
            }
        }

        let Some(entry) = sessions.get_mut(session_id) else {
            return;
        };
        entry.turns.push_back(turn);
        while entry.turns.len() > self.window {
            entry.turns.pop_front();
        }
        entry.last_active = now;
    }

    fn evict_expired_at(&self, now: Instant) -> usize {
        let mut sessions = self.lock();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            sessions.pop(id);
        }
        expired.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(window: usize, max_sessions: usize) -> SessionStore {
        SessionStore::new(window, Duration::from_secs(60), max_sessions)
    }

    #[test]
    fn window_keeps_only_the_latest_turns() {
        let memory = store(5, 10);
        for i in 0..7 {
            memory.record("s1", Turn::new(format!("q{}", i), format!("a{}", i)));
        }

        let history = memory.history("s1");

        assert_eq!(history.len(), 5);
        assert_eq!(history[0].question, "q2");
        assert_eq!(history[4].answer, "a6");
    }

    #[test]
    fn sessions_are_isolated() {
        let memory = store(5, 10);
        memory.record("alice", Turn::new("hello", "hi alice"));

        assert_eq!(memory.history("alice").len(), 1);
        assert!(memory.history("bob").is_empty());
    }

    #[test]
    fn clear_removes_only_that_session() {
        let memory = store(5, 10);
        memory.record("a", Turn::new("q", "a"));
        memory.record("b", Turn::new("q", "a"));

        assert!(memory.clear("a"));
        assert!(!memory.clear("a"));
        assert!(memory.history("a").is_empty());
        assert_eq!(memory.history("b").len(), 1);
    }

    #[test]
    fn idle_sessions_expire() {
        let memory = store(5, 10);
        let start = Instant::now();
        memory.record_at("old", Turn::new("q", "a"), start);
        memory.record_at("fresh", Turn::new("q", "a"), start + Duration::from_secs(50));

        let later = start + Duration::from_secs(90);
        assert!(memory.history_at("old", later).is_empty());
        assert_eq!(memory.len(), 1);

        assert_eq!(memory.evict_expired_at(start + Duration::from_secs(200)), 1);
        assert!(memory.is_empty());
    }

    #[test]
    fn reading_history_keeps_a_session_alive() {
        let memory = store(5, 10);
        let start = Instant::now();
        memory.record_at("s", Turn::new("q", "a"), start);

        assert_eq!(memory.history_at("s", start + Duration::from_secs(50)).len(), 1);
        assert_eq!(memory.history_at("s", start + Duration::from_secs(100)).len(), 1);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let memory = store(5, 2);
        let start = Instant::now();
        memory.record_at("first", Turn::new("q", "a"), start);
        memory.record_at("second", Turn::new("q", "a"), start + Duration::from_secs(1));
        memory.history_at("first", start + Duration::from_secs(2));

        memory.record_at("third", Turn::new("q", "a"), start + Duration::from_secs(3));

        assert_eq!(memory.len(), 2);
        let now = start + Duration::from_secs(4);
        assert!(memory.history_at("second", now).is_empty());
        assert_eq!(memory.history_at("first", now).len(), 1);
        assert_eq!(memory.history_at("third", now).len(), 1);
    }

    #[test]
    fn store_stays_bounded_under_many_new_sessions() {
        let memory = store(5, 100);
        for i in 0..1_000 {
            memory.record(&format!("s{}", i), Turn::new("q", "a"));
        }

        assert_eq!(memory.len(), 100);
        assert!(memory.history("s899").is_empty());
        assert_eq!(memory.history("s900").len(), 1);
        assert_eq!(memory.history("s999").len(), 1);
    }

    #[test]
    fn zero_capacity_still_holds_one_session() {
        let memory = store(5, 0);
        memory.record("a", Turn::new("q", "a"));
        memory.record("b", Turn::new("q", "a"));

        assert_eq!(memory.len(), 1);
        assert_eq!(memory.history("b").len(), 1);
    }
}
