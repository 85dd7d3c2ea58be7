//! Mock search provider for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::media::{MediaItem, MediaType, ResourceBundle, ResourceEntry, ResourceKind};
use crate::provider::{ProviderError, SearchProvider};

/// A recorded keyword search.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSearch {
    pub keyword: String,
    pub page: u32,
}

/// A recorded resource fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFetch {
    pub media_type: MediaType,
    pub external_id: u64,
    pub kind: ResourceKind,
}

/// Mock implementation of the SearchProvider trait.
///
/// Provides controllable behavior for testing:
/// - Configurable search results and per-kind bundles
/// - Per-kind failures and delays
/// - Recorded calls for assertions
#[derive(Debug, Default)]
pub struct MockSearchProvider {
    results: Arc<RwLock<Vec<MediaItem>>>,
    searches: Arc<RwLock<Vec<RecordedSearch>>>,
    /// If set, the next search will fail with this error.
    next_search_error: Arc<RwLock<Option<ProviderError>>>,
    bundles: Arc<RwLock<HashMap<ResourceKind, Vec<ResourceEntry>>>>,
    failing: Arc<RwLock<HashMap<ResourceKind, String>>>,
    delays: Arc<RwLock<HashMap<ResourceKind, Duration>>>,
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
}

impl MockSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the results returned by subsequent searches.
    pub async fn set_search_results(&self, results: Vec<MediaItem>) {
        *self.results.write().await = results;
    }

    /// Configure the next search to fail with the given error.
    pub async fn set_next_search_error(&self, error: ProviderError) {
        *self.next_search_error.write().await = Some(error);
    }

    pub async fn recorded_searches(&self) -> Vec<RecordedSearch> {
        self.searches.read().await.clone()
    }

    pub async fn search_count(&self) -> usize {
        self.searches.read().await.len()
    }

    /// Entries returned for `kind` (any item).
    pub async fn set_bundle(&self, kind: ResourceKind, entries: Vec<ResourceEntry>) {
        self.bundles.write().await.insert(kind, entries);
    }

    /// Make fetches of `kind` fail with a connection error.
    pub async fn fail_kind(&self, kind: ResourceKind, message: &str) {
        self.failing.write().await.insert(kind, message.to_string());
    }

    /// Delay fetches of `kind`.
    pub async fn delay_kind(&self, kind: ResourceKind, delay: Duration) {
        self.delays.write().await.insert(kind, delay);
    }

    pub async fn fetch_calls(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }

    /// Clear recorded searches and fetches.
    pub async fn clear_recorded(&self) {
        self.searches.write().await.clear();
        self.fetches.write().await.clear();
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<MediaItem>, ProviderError> {
        self.searches.write().await.push(RecordedSearch {
            keyword: keyword.to_string(),
            page,
        });

        if let Some(error) = self.next_search_error.write().await.take() {
            return Err(error);
        }

        Ok(self.results.read().await.clone())
    }

    async fn fetch_resources(
        &self,
        media_type: MediaType,
        external_id: u64,
        kind: ResourceKind,
    ) -> Result<ResourceBundle, ProviderError> {
        self.fetches.write().await.push(RecordedFetch {
            media_type,
            external_id,
            kind,
        });

        let delay = self.delays.read().await.get(&kind).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.failing.read().await.get(&kind) {
            return Err(ProviderError::ConnectionFailed(message.clone()));
        }

        let entries = self
            .bundles
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        Ok(ResourceBundle::new(kind, entries))
    }
}
