//! Search Provider abstraction.
//!
//! The provider finds media items for a keyword and, for a given item,
//! returns the resources of one kind. [`NullbrClient`] talks to the nullbr
//! HTTP API.

mod nullbr;

pub use nullbr::{NullbrClient, DEFAULT_NULLBR_URL, TMDB_POSTER_BASE};

use async_trait::async_trait;
use thiserror::Error;

use crate::media::{MediaItem, MediaType, ResourceBundle, ResourceKind};

/// Errors that can occur when talking to the Search Provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Search provider connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search provider request timed out")]
    Timeout,

    #[error("Search provider API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse search provider response: {0}")]
    ParseError(String),

    #[error("Search provider not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::ParseError(e.to_string())
        } else {
            ProviderError::ConnectionFailed(e.to_string())
        }
    }
}

/// Trait for media search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Search media by keyword. An empty result means no match.
    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<MediaItem>, ProviderError>;

    /// Fetch the resources of `kind` for a media item.
    async fn fetch_resources(
        &self,
        media_type: MediaType,
        external_id: u64,
        kind: ResourceKind,
    ) -> Result<ResourceBundle, ProviderError>;
}
