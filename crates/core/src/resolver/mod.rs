//! Resource resolution.
//!
//! Walks a priority-ordered list of resource kinds for one media item and
//! returns the first non-empty bundle. For each kind, in order:
//!
//! 1. skip if the item's availability flag is false,
//! 2. skip if the kind is not locally enabled,
//! 3. fetch from the Search Provider under a timeout.
//!
//! Fetch errors and timeouts are logged and the walk moves on. Kinds absent
//! from the priority list are never tried.

use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::media::{MediaItem, MediaType, ResourceBundle, ResourceKind};
use crate::metrics;
use crate::provider::{ProviderError, SearchProvider};

/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from resource resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Media item has no external id and cannot be resolved")]
    MissingExternalId,

    #[error("No resource available for this item")]
    NoResourceAvailable,

    #[error("Resource kind {0} is disabled")]
    KindDisabled(ResourceKind),

    #[error("Search provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Resolver holding the configured priority and enablement.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    priority: Vec<ResourceKind>,
    enabled: HashSet<ResourceKind>,
    fetch_timeout: Duration,
}

impl Default for ResourceResolver {
    fn default() -> Self {
        Self::new(
            ResourceKind::ALL.to_vec(),
            ResourceKind::ALL.into_iter().collect(),
            DEFAULT_FETCH_TIMEOUT,
        )
    }
}

impl ResourceResolver {
    pub fn new(
        priority: Vec<ResourceKind>,
        enabled: HashSet<ResourceKind>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            priority,
            enabled,
            fetch_timeout,
        }
    }

    /// Build from config, normalizing the priority list.
    pub fn from_config(config: &ResolverConfig, fetch_timeout: Duration) -> Self {
        Self::new(
            config.normalized_priority(),
            config.enabled_kinds(),
            fetch_timeout,
        )
    }

    pub fn priority(&self) -> &[ResourceKind] {
        &self.priority
    }

    pub fn enabled(&self) -> &HashSet<ResourceKind> {
        &self.enabled
    }

    pub fn is_enabled(&self, kind: ResourceKind) -> bool {
        self.enabled.contains(&kind)
    }

    /// Resolve the best bundle for `item` following the configured priority.
    pub async fn resolve(
        &self,
        item: &MediaItem,
        provider: &dyn SearchProvider,
    ) -> Result<ResourceBundle, ResolveError> {
        resolve(
            item,
            &self.priority,
            &self.enabled,
            provider,
            self.fetch_timeout,
        )
        .await
    }

    /// Resolve one explicitly requested kind.
    ///
    /// The availability flag is not consulted; the kind must still be
    /// enabled. Provider errors are returned instead of swallowed.
    pub async fn resolve_kind(
        &self,
        item: &MediaItem,
        kind: ResourceKind,
        provider: &dyn SearchProvider,
    ) -> Result<ResourceBundle, ResolveError> {
        let external_id = match item.external_id {
            Some(id) => id,
            None => {
                metrics::RESOLUTIONS_TOTAL
                    .with_label_values(&["missing_id"])
                    .inc();
                return Err(ResolveError::MissingExternalId);
            }
        };

        if !self.is_enabled(kind) {
            metrics::RESOLUTIONS_TOTAL.with_label_values(&["disabled"]).inc();
            return Err(ResolveError::KindDisabled(kind));
        }

        match fetch_with_timeout(provider, item.media_type, external_id, kind, self.fetch_timeout)
            .await
        {
            Ok(bundle) if !bundle.is_empty() => {
                record_attempt(kind, "found");
                record_resolved(&bundle);
                info!(title = %item.title, %kind, entries = bundle.len(), "Resolved requested kind");
                Ok(bundle)
            }
            Ok(_) => {
                record_attempt(kind, "empty");
                metrics::RESOLUTIONS_TOTAL
                    .with_label_values(&["no_resource"])
                    .inc();
                Err(ResolveError::NoResourceAvailable)
            }
            Err(e) => {
                record_attempt(kind, attempt_outcome(&e));
                metrics::RESOLUTIONS_TOTAL.with_label_values(&["error"]).inc();
                warn!(title = %item.title, %kind, error = %e, "Fetching requested kind failed");
                Err(ResolveError::Provider(e))
            }
        }
    }
}

/// Walk `priority` for `item` and return the first non-empty bundle.
pub async fn resolve(
    item: &MediaItem,
    priority: &[ResourceKind],
    enabled: &HashSet<ResourceKind>,
    provider: &dyn SearchProvider,
    fetch_timeout: Duration,
) -> Result<ResourceBundle, ResolveError> {
    let external_id = match item.external_id {
        Some(id) => id,
        None => {
            metrics::RESOLUTIONS_TOTAL
                .with_label_values(&["missing_id"])
                .inc();
            return Err(ResolveError::MissingExternalId);
        }
    };

    for &kind in priority {
        if !item.is_available(kind) {
            debug!(title = %item.title, %kind, "Skipping kind, not available");
            continue;
        }
        if !enabled.contains(&kind) {
            debug!(title = %item.title, %kind, "Skipping kind, disabled");
            continue;
        }

        match fetch_with_timeout(provider, item.media_type, external_id, kind, fetch_timeout).await
        {
            Ok(bundle) if !bundle.is_empty() => {
                record_attempt(kind, "found");
                record_resolved(&bundle);
                info!(
                    title = %item.title,
                    %kind,
                    entries = bundle.len(),
                    "Resolved resources"
                );
                return Ok(bundle);
            }
            Ok(_) => {
                record_attempt(kind, "empty");
                debug!(title = %item.title, %kind, "Provider returned no entries");
            }
            Err(e) => {
                record_attempt(kind, attempt_outcome(&e));
                warn!(
                    title = %item.title,
                    %kind,
                    provider = provider.name(),
                    error = %e,
                    "Fetching resources failed, trying next kind"
                );
            }
        }
    }

    metrics::RESOLUTIONS_TOTAL
        .with_label_values(&["no_resource"])
        .inc();
    info!(title = %item.title, "No resource available");
    Err(ResolveError::NoResourceAvailable)
}

async fn fetch_with_timeout(
    provider: &dyn SearchProvider,
    media_type: MediaType,
    external_id: u64,
    kind: ResourceKind,
    fetch_timeout: Duration,
) -> Result<ResourceBundle, ProviderError> {
    tokio::time::timeout(
        fetch_timeout,
        provider.fetch_resources(media_type, external_id, kind),
    )
    .await
    .unwrap_or_else(|_| Err(ProviderError::Timeout))
}

fn attempt_outcome(error: &ProviderError) -> &'static str {
    match error {
        ProviderError::Timeout => "timeout",
        _ => "error",
    }
}

fn record_attempt(kind: ResourceKind, outcome: &str) {
    metrics::RESOLUTION_ATTEMPTS
        .with_label_values(&[kind.as_str(), outcome])
        .inc();
}

fn record_resolved(bundle: &ResourceBundle) {
    metrics::RESOLUTIONS_TOTAL.with_label_values(&["resolved"]).inc();
    metrics::RESOURCES_RETURNED
        .with_label_values(&[bundle.kind.as_str()])
        .observe(bundle.len() as f64);
}
