//! Per-user cache of the most recent search results.
//!
//! A session lets a user follow a search with a numbered selection. Each
//! user has at most one session; a new search replaces it and it expires
//! after a fixed TTL.

mod cache;

pub use cache::{SearchSession, SessionCache, DEFAULT_SESSION_TTL_SECS, MAX_SESSION_TTL_SECS};

use thiserror::Error;

/// Errors returned when reading from the session cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No session for the user, or it is older than the TTL.
    #[error("Search session expired, please search again")]
    Expired,

    /// Index is outside `1..=len`.
    #[error("Index {index} out of range (1-{len})")]
    IndexOutOfRange { index: usize, len: usize },
}
