//! Server-side sessions keyed by an opaque cookie value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue};
use parking_lot::RwLock;
use todo_shared::SESSION_COOKIE;
use tracing::debug;
use uuid::Uuid;

/// How long a login may stay between redirect and callback.
pub const PENDING_TTL: Duration = Duration::from_secs(10 * 60);
/// Upper bound on sessions that have not completed login.
pub const MAX_PENDING: usize = 10_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionData {
    /// CSRF `state` handed to the identity provider by the login step.
    pub csrf_state: Option<String>,
    /// Profile returned by the provider once login completes.
    pub user: Option<serde_json::Value>,
}

impl SessionData {
    /// A session waiting on the identity provider's callback.
    pub fn is_pending(&self) -> bool {
        self.user.is_none()
    }
}

#[derive(Debug)]
struct Entry {
    data: SessionData,
    created_at: Instant,
    seq: u64,
}

/// Logged-in sessions live until logout. Pending ones expire after
/// `pending_ttl` and are capped at `max_pending`, oldest evicted first.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    next_seq: AtomicU64,
    pending_ttl: Duration,
    max_pending: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(PENDING_TTL, MAX_PENDING)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(pending_ttl: Duration, max_pending: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            pending_ttl,
            max_pending: max_pending.max(1),
        }
    }

    pub fn create(&self, data: SessionData) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.write();

        if data.is_pending() {
            let ttl = self.pending_ttl;
            sessions.retain(|_, entry| !entry.data.is_pending() || entry.created_at.elapsed() < ttl);

            let mut pending: Vec<(u64, String)> = sessions
                .iter()
                .filter(|(_, entry)| entry.data.is_pending())
                .map(|(id, entry)| (entry.seq, id.clone()))
                .collect();
            if pending.len() >= self.max_pending {
                pending.sort_unstable();
                let excess = pending.len() + 1 - self.max_pending;
                for (_, stale) in pending.into_iter().take(excess) {
                    sessions.remove(&stale);
                }
                debug!(evicted = excess, "pending session limit reached");
            }
        }

        sessions.insert(
            id.clone(),
            Entry {
                data,
                created_at: Instant::now(),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
        id
    }

    pub fn get(&self, id: &str) -> Option<SessionData> {
        self.sessions.read().get(id).map(|entry| entry.data.clone())
    }

    /// Applies `f` to the session if it exists.
    pub fn update<F, R>(&self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut SessionData) -> R,
    {
        self.sessions.write().get_mut(id).map(|entry| f(&mut entry.data))
    }

    pub fn remove(&self, id: &str) -> Option<SessionData> {
        self.sessions.write().remove(id).map(|entry| entry.data)
    }

    /// Drops the session only if login never completed on it.
    pub fn remove_pending(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get(id) {
            Some(entry) if entry.data.is_pending() => sessions.remove(id).is_some(),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

/// Reads the session id out of the `Cookie` header(s).
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(id: &str) -> HeaderValue {
    let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| expired_cookie())
}

pub fn expired_cookie() -> HeaderValue {
    HeaderValue::from_static("todo_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
