//! Entry points used by the Messaging Host.
//!
//! [`MediaService`] owns the session cache and wires the resolver, the
//! dispatcher and the completion watcher to the configured backends.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, DispatchConfig};
use crate::dispatcher::{DispatchResult, DownloadDispatcher, DownloadMode};
use crate::downloader::MagnetDownloader;
use crate::media::{InvalidResourceKind, MediaItem, ResourceBundle, ResourceEntry, ResourceKind};
use crate::metrics;
use crate::provider::{ProviderError, SearchProvider};
use crate::resolver::{ResolveError, ResourceResolver};
use crate::session::{SessionCache, SessionError};
use crate::tracker::CompletionWatcher;
use crate::transfer::{Job, TransferBackend, TransferError};

/// Errors surfaced to the Messaging Host.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Search keyword cannot be empty")]
    EmptyKeyword,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Search provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    InvalidKind(#[from] InvalidResourceKind),

    #[error("Entry {index} out of range (1-{len})")]
    EntryOutOfRange { index: usize, len: usize },

    #[error("Transfer backend error: {0}")]
    Transfer(#[from] TransferError),
}

impl ServiceError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::EmptyKeyword => "empty_keyword",
            ServiceError::Session(SessionError::Expired) => "session_expired",
            ServiceError::Session(SessionError::IndexOutOfRange { .. }) => "index_out_of_range",
            ServiceError::Resolve(ResolveError::MissingExternalId) => "missing_external_id",
            ServiceError::Resolve(ResolveError::NoResourceAvailable) => "no_resource_available",
            ServiceError::Resolve(ResolveError::KindDisabled(_)) => "kind_disabled",
            ServiceError::Resolve(ResolveError::Provider(_)) | ServiceError::Provider(_) => {
                "provider_error"
            }
            ServiceError::InvalidKind(_) => "invalid_resource_kind",
            ServiceError::EntryOutOfRange { .. } => "entry_out_of_range",
            ServiceError::Transfer(_) => "transfer_error",
        }
    }
}

/// A selected item and its resolved bundle.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub item: MediaItem,
    pub bundle: ResourceBundle,
}

/// Options for [`MediaService::download`]; unset fields use configured defaults.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Explicit kind, as typed by the user.
    pub kind: Option<String>,
    /// 1-based entry within the bundle (default: first).
    pub entry: Option<usize>,
    pub mode: Option<DownloadMode>,
    pub destination: Option<String>,
}

/// Result of resolving and dispatching one selection.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutcome {
    pub item: MediaItem,
    pub bundle: ResourceBundle,
    pub entry: ResourceEntry,
    pub dispatch: DispatchResult,
}

/// Core service.
pub struct MediaService {
    provider: Arc<dyn SearchProvider>,
    transfer: Arc<dyn TransferBackend>,
    sessions: SessionCache,
    resolver: ResourceResolver,
    dispatcher: DownloadDispatcher,
    watcher: CompletionWatcher,
    dispatch: DispatchConfig,
}

impl MediaService {
    /// Build the service from loaded configuration.
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        transfer: Arc<dyn TransferBackend>,
        downloader: Option<Arc<dyn MagnetDownloader>>,
        config: &Config,
    ) -> Self {
        let resolver = ResourceResolver::from_config(
            &config.resolver,
            Duration::from_secs(config.provider.timeout_secs as u64),
        );
        let call_timeout = config
            .downloader
            .as_ref()
            .map_or(config.transfer.timeout_secs, |d| {
                d.timeout_secs.max(config.transfer.timeout_secs)
            });
        let dispatcher = DownloadDispatcher::new(
            transfer.clone(),
            downloader,
            Duration::from_secs(call_timeout as u64),
        );

        Self::from_parts(
            provider,
            transfer,
            SessionCache::new(config.session.ttl_secs),
            resolver,
            dispatcher,
            config.dispatch.clone(),
        )
    }

    pub fn from_parts(
        provider: Arc<dyn SearchProvider>,
        transfer: Arc<dyn TransferBackend>,
        sessions: SessionCache,
        resolver: ResourceResolver,
        dispatcher: DownloadDispatcher,
        dispatch: DispatchConfig,
    ) -> Self {
        Self {
            provider,
            transfer,
            sessions,
            resolver,
            dispatcher,
            watcher: CompletionWatcher::new(),
            dispatch,
        }
    }

    pub fn sessions(&self) -> &SessionCache {
        &self.sessions
    }

    pub fn resolver(&self) -> &ResourceResolver {
        &self.resolver
    }

    /// Search by keyword and remember the results for the user.
    ///
    /// An empty result keeps any existing session.
    pub async fn search(
        &self,
        user_id: &str,
        keyword: &str,
        page: u32,
    ) -> Result<Vec<MediaItem>, ServiceError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(ServiceError::EmptyKeyword);
        }

        let results = match self.provider.search(keyword, page.max(1)).await {
            Ok(results) => results,
            Err(e) => {
                metrics::SEARCHES_TOTAL.with_label_values(&["error"]).inc();
                return Err(e.into());
            }
        };

        metrics::SEARCH_RESULTS
            .with_label_values(&[])
            .observe(results.len() as f64);

        if results.is_empty() {
            metrics::SEARCHES_TOTAL.with_label_values(&["empty"]).inc();
            info!(user_id, keyword, "Search returned no results");
            return Ok(results);
        }

        metrics::SEARCHES_TOTAL.with_label_values(&["found"]).inc();
        info!(user_id, keyword, results = results.len(), "Search complete");
        self.sessions.store(user_id, results.clone()).await;
        Ok(results)
    }

    /// Resolve the item at `index` (1-based) following the priority list.
    pub async fn select_by_index(
        &self,
        user_id: &str,
        index: usize,
    ) -> Result<Selection, ServiceError> {
        let item = self.sessions.fetch(user_id, index).await?;
        debug!(user_id, index, title = %item.title, "Selected item");
        let bundle = self.resolver.resolve(&item, self.provider.as_ref()).await?;
        Ok(Selection { item, bundle })
    }

    /// Resolve one explicitly named kind for the item at `index`.
    pub async fn select_by_index_and_kind(
        &self,
        user_id: &str,
        index: usize,
        kind: &str,
    ) -> Result<Selection, ServiceError> {
        let kind: ResourceKind = kind.parse()?;
        let item = self.sessions.fetch(user_id, index).await?;
        debug!(user_id, index, %kind, title = %item.title, "Selected item with kind");
        let bundle = self
            .resolver
            .resolve_kind(&item, kind, self.provider.as_ref())
            .await?;
        Ok(Selection { item, bundle })
    }

    /// Resolve a selection and dispatch one of its entries.
    pub async fn download(
        &self,
        user_id: &str,
        index: usize,
        options: DownloadOptions,
    ) -> Result<DownloadOutcome, ServiceError> {
        let selection = match options.kind.as_deref() {
            Some(kind) => self.select_by_index_and_kind(user_id, index, kind).await?,
            None => self.select_by_index(user_id, index).await?,
        };

        let entry_index = options.entry.unwrap_or(1);
        let entry = entry_index
            .checked_sub(1)
            .and_then(|i| selection.bundle.entries.get(i))
            .cloned()
            .ok_or(ServiceError::EntryOutOfRange {
                index: entry_index,
                len: selection.bundle.len(),
            })?;

        let dispatch = self
            .dispatch(&entry, options.mode, options.destination.as_deref())
            .await;

        Ok(DownloadOutcome {
            item: selection.item,
            bundle: selection.bundle,
            entry,
            dispatch,
        })
    }

    /// Dispatch an entry using configured defaults for unset options.
    pub async fn dispatch(
        &self,
        entry: &ResourceEntry,
        mode: Option<DownloadMode>,
        destination: Option<&str>,
    ) -> DispatchResult {
        let mode = mode.unwrap_or(self.dispatch.mode);
        let destination = destination
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(self.dispatch.destination.as_str());
        self.dispatcher.dispatch(entry, mode, destination).await
    }

    /// Poll the Transfer Backend for jobs completed since the last poll.
    pub async fn poll_jobs(&self) -> Result<Vec<Job>, ServiceError> {
        Ok(self.watcher.poll(self.transfer.as_ref()).await?)
    }

    pub async fn clear_session(&self, user_id: &str) {
        self.sessions.clear(user_id).await;
    }

    /// Drop all sessions.
    pub async fn shutdown(&self) {
        self.sessions.clear_all().await;
        info!("Media service shut down");
    }
}
