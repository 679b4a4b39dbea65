//! Process-local ephemeral state: one-shot auth sessions and chat presence.
//!
//! Both stores are plain mutex-guarded maps. Expired entries are
//! garbage-collected by a linear sweep on every operation, so no
//! background task is needed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde_json::Value;

/// How long a pending auth session stays claimable.
pub const SESSION_TTL: Duration = Duration::from_secs(5 * 60);

/// How long a presence heartbeat stays fresh.
pub const ACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

struct SessionEntry {
    user: Value,
    stored_at: Instant,
}

/// Short-lived token -> user-payload store for login polling.
///
/// A token is consumed on first successful read; stale entries are
/// swept opportunistically.
pub struct SessionStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(SESSION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn put(&self, token: &str, user: Value) {
        let mut entries = self.entries.lock().expect("session store mutex poisoned");
        Self::sweep(&mut entries, self.ttl);
        tracing::debug!(token = %token, "Storing auth session");
        entries.insert(
            token.to_string(),
            SessionEntry {
                user,
                stored_at: Instant::now(),
            },
        );
    }

    /// Claim the session for `token`. The entry is removed, so a second
    /// call with the same token returns `None`.
    pub fn take(&self, token: &str) -> Option<Value> {
        let mut entries = self.entries.lock().expect("session store mutex poisoned");
        Self::sweep(&mut entries, self.ttl);
        let taken = entries.remove(token).map(|e| e.user);
        if taken.is_some() {
            tracing::debug!(token = %token, "Auth session consumed");
        }
        taken
    }

    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock().expect("session store mutex poisoned");
        Self::sweep(&mut entries, self.ttl);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(entries: &mut HashMap<String, SessionEntry>, ttl: Duration) {
        entries.retain(|_, e| e.stored_at.elapsed() <= ttl);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

struct Activity {
    chat_id: i64,
    last_seen: Instant,
}

/// Entry returned by [`ActivityTracker::active_users`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ActiveUser {
    pub user_id: String,
    pub chat_id: i64,
    pub seconds_ago: u64,
}

/// Tracks which user is currently looking at which chat, so message
/// notifications can be suppressed for them.
pub struct ActivityTracker {
    timeout: Duration,
    entries: Mutex<HashMap<String, Activity>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::with_timeout(ACTIVITY_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn mark_active(&self, user_id: &str, chat_id: i64) {
        let mut entries = self.entries.lock().expect("activity mutex poisoned");
        entries.insert(
            user_id.to_string(),
            Activity {
                chat_id,
                last_seen: Instant::now(),
            },
        );
        tracing::trace!(user_id = %user_id, chat_id, count = entries.len(), "User active");
    }

    /// Returns whether an entry was actually removed.
    pub fn mark_inactive(&self, user_id: &str) -> bool {
        let mut entries = self.entries.lock().expect("activity mutex poisoned");
        entries.remove(user_id).is_some()
    }

    /// True only when the last heartbeat is fresh and was for this chat.
    /// Stale entries are dropped on the way.
    pub fn is_active(&self, user_id: &str, chat_id: i64) -> bool {
        let mut entries = self.entries.lock().expect("activity mutex poisoned");
        match entries.get(user_id) {
            Some(activity) if activity.last_seen.elapsed() < self.timeout => {
                activity.chat_id == chat_id
            }
            Some(_) => {
                entries.remove(user_id);
                false
            }
            None => false,
        }
    }

    pub fn active_users(&self) -> Vec<ActiveUser> {
        let entries = self.entries.lock().expect("activity mutex poisoned");
        entries
            .iter()
            .filter(|(_, a)| a.last_seen.elapsed() < self.timeout)
            .map(|(user_id, a)| ActiveUser {
                user_id: user_id.clone(),
                chat_id: a.chat_id,
                seconds_ago: a.last_seen.elapsed().as_secs(),
            })
            .collect()
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}
