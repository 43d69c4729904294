//! Ephemeral per-browser sessions.
//!
//! Sessions live only in memory, in a bounded LRU; the least recently used
//! session is dropped when the store is full. Nothing is persisted.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::schemas::BuildPlan;

/// Turns kept per session; the oldest is evicted first
pub const HISTORY_CAPACITY: usize = 12;
const DEFAULT_CAPACITY: usize = 10_000;
const TURN_TEXT_MAX_CHARS: usize = 600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: impl Into<String>, text: &str) -> Self {
        Self {
            role: role.into(),
            text: text.chars().take(TURN_TEXT_MAX_CHARS).collect(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub created_at: DateTime<Utc>,
    pub analyses: u64,
    pub builds: u64,
    pub subscribed: bool,
    pub history: VecDeque<Turn>,
    pub last_build: Option<BuildPlan>,
}

impl Session {
    pub fn new(subscribed: bool) -> Self {
        Self {
            created_at: Utc::now(),
            analyses: 0,
            builds: 0,
            subscribed,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            last_build: None,
        }
    }

    pub fn push_turn(&mut self, turn: Turn) {
        while self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(turn);
    }

    pub fn snapshot(&self, id: &str) -> SessionSnapshot {
        SessionSnapshot {
            id: id.to_string(),
            created_at: self.created_at,
            analyses: self.analyses,
            builds: self.builds,
            subscribed: self.subscribed,
            history_len: self.history.len(),
            last_build_id: self.last_build.as_ref().map(|b| b.build_id.clone()),
        }
    }
}

/// Read-only view returned to handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub analyses: u64,
    pub builds: u64,
    pub subscribed: bool,
    pub history_len: usize,
    pub last_build_id: Option<String>,
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<LruCache<String, Session>>,
    default_subscribed: bool,
}

impl SessionStore {
    pub fn new(capacity: usize, default_subscribed: bool) -> Self {
        let cap = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN));
        Self {
            sessions: Mutex::new(LruCache::new(cap)),
            default_subscribed,
        }
    }

    /// Resolve `id` to a live session, creating one (with a fresh id) when the
    /// id is missing or unknown.
    pub async fn get_or_create(&self, id: Option<&str>) -> SessionSnapshot {
        let mut sessions = self.sessions.lock().await;
        if let Some(id) = id
            && let Some(session) = sessions.get(id)
        {
            return session.snapshot(id);
        }
        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(self.default_subscribed);
        let snapshot = session.snapshot(&id);
        if let Some((evicted, _)) = sessions.push(id, session) {
            tracing::debug!("Session store full; evicted {}", evicted);
        }
        snapshot
    }

    pub async fn snapshot(&self, id: &str) -> Option<SessionSnapshot> {
        let mut sessions = self.sessions.lock().await;
        sessions.get(id).map(|s| s.snapshot(id))
    }

    /// Copy of the rolling history, oldest first
    pub async fn history(&self, id: &str) -> Vec<Turn> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .get(id)
            .map(|s| s.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn record_analysis(&self, id: &str, prompt: &str, summary: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(id) {
            session.analyses = session.analyses.saturating_add(1);
            session.push_turn(Turn::new("user", prompt));
            session.push_turn(Turn::new("assistant", summary));
        }
    }

    pub async fn record_build(&self, id: &str, prompt: &str, plan: &BuildPlan) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(id) {
            session.builds = session.builds.saturating_add(1);
            session.push_turn(Turn::new("user", prompt));
            session.push_turn(Turn::new(
                "assistant",
                &format!(
                    "Build plan {} with {} screens",
                    plan.build_id,
                    plan.screens.len()
                ),
            ));
            session.last_build = Some(plan.clone());
        }
    }

    pub async fn last_build(&self, id: &str) -> Option<BuildPlan> {
        let mut sessions = self.sessions.lock().await;
        sessions.get(id).and_then(|s| s.last_build.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_a_ring_buffer() {
        let mut s = Session::new(false);
        for i in 0..20 {
            s.push_turn(Turn::new("user", &format!("turn {i}")));
        }
        assert_eq!(s.history.len(), HISTORY_CAPACITY);
        assert_eq!(s.history.front().unwrap().text, "turn 8");
        assert_eq!(s.history.back().unwrap().text, "turn 19");
    }

    #[test]
    fn long_turns_are_truncated() {
        let text = "x".repeat(5000);
        assert_eq!(Turn::new("user", &text).text.chars().count(), TURN_TEXT_MAX_CHARS);
    }

    #[tokio::test]
    async fn unknown_id_creates_fresh_session() {
        let store = SessionStore::new(4, false);
        assert!(store.is_empty().await);
        let a = store.get_or_create(Some("forged")).await;
        assert_ne!(a.id, "forged");
        let again = store.get_or_create(Some(&a.id)).await;
        assert_eq!(again.id, a.id);
        assert_eq!(store.len().await, 1);
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn records_update_counters_and_last_build() {
        let store = SessionStore::default();
        let s = store.get_or_create(None).await;
        store.record_analysis(&s.id, "check my page", "scores 60/60/64").await;
        let plan = BuildPlan::empty("plan-1");
        store.record_build(&s.id, "booking app", &plan).await;

        let snap = store.snapshot(&s.id).await.unwrap();
        assert_eq!(snap.analyses, 1);
        assert_eq!(snap.builds, 1);
        assert_eq!(snap.history_len, 4);
        assert_eq!(snap.last_build_id.as_deref(), Some("plan-1"));
        assert_eq!(store.last_build(&s.id).await.unwrap().build_id, "plan-1");
        assert_eq!(store.history(&s.id).await[0].text, "check my page");
    }

    #[tokio::test]
    async fn store_is_bounded() {
        let store = SessionStore::new(2, true);
        let first = store.get_or_create(None).await;
        assert!(first.subscribed);
        store.get_or_create(None).await;
        store.get_or_create(None).await;
        assert_eq!(store.len().await, 2);
        assert!(store.snapshot(&first.id).await.is_none());
    }
}
