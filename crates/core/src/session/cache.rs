use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::SessionError;
use crate::media::MediaItem;

/// Default session lifetime (one hour).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Longest accepted session lifetime (one year). Larger values are clamped.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 3600;

/// A user's most recent search result set.
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub user_id: String,
    pub results: Vec<MediaItem>,
    pub created_at: DateTime<Utc>,
}

impl SearchSession {
    fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.created_at > ttl
    }
}

/// In-memory user -> session map with expiry.
///
/// All access goes through one lock; entries are replaced whole, so a
/// reader sees either the old or the new session for a user.
pub struct SessionCache {
    ttl_secs: u64,
    ttl: Duration,
    sessions: RwLock<HashMap<String, SearchSession>>,
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL_SECS)
    }
}

impl SessionCache {
    pub fn new(ttl_secs: u64) -> Self {
        let ttl_secs = ttl_secs.min(MAX_SESSION_TTL_SECS);
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self {
            ttl_secs,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Replace the user's session with `results`, stamped now.
    pub async fn store(&self, user_id: &str, results: Vec<MediaItem>) {
        self.store_at(user_id, results, Utc::now()).await;
    }

    /// Replace the user's session with `results`, stamped at `created_at`.
    pub async fn store_at(&self, user_id: &str, results: Vec<MediaItem>, created_at: DateTime<Utc>) {
        debug!(user_id, results = results.len(), "Storing search session");
        let session = SearchSession {
            user_id: user_id.to_string(),
            results,
            created_at,
        };
        self.sessions
            .write()
            .await
            .insert(user_id.to_string(), session);
    }

    /// Get the item at 1-based `index` from the user's session.
    pub async fn fetch(&self, user_id: &str, index: usize) -> Result<MediaItem, SessionError> {
        self.fetch_at(user_id, index, Utc::now()).await
    }

    /// Same as [`fetch`](Self::fetch), evaluated at `now`.
    pub async fn fetch_at(
        &self,
        user_id: &str,
        index: usize,
        now: DateTime<Utc>,
    ) -> Result<MediaItem, SessionError> {
        let expired_at = {
            let sessions = self.sessions.read().await;
            let session = sessions.get(user_id).ok_or(SessionError::Expired)?;

            if session.is_expired(now, self.ttl) {
                session.created_at
            } else {
                let len = session.results.len();
                if index < 1 || index > len {
                    return Err(SessionError::IndexOutOfRange { index, len });
                }
                return Ok(session.results[index - 1].clone());
            }
        };

        // Evict unless a newer search replaced it in the meantime.
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(user_id)
            .is_some_and(|s| s.created_at == expired_at)
        {
            sessions.remove(user_id);
            debug!(user_id, "Evicted expired search session");
        }
        Err(SessionError::Expired)
    }

    /// Number of results in the user's live session, if any.
    pub async fn result_count(&self, user_id: &str) -> Option<usize> {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .get(user_id)
            .filter(|s| !s.is_expired(now, self.ttl))
            .map(|s| s.results.len())
    }

    pub async fn clear(&self, user_id: &str) {
        if self.sessions.write().await.remove(user_id).is_some() {
            debug!(user_id, "Cleared search session");
        }
    }

    pub async fn clear_all(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        sessions.clear();
        info!(count, "Cleared all search sessions");
    }

    /// Drop every expired session, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now, self.ttl));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
