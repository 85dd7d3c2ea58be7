//! Testing utilities and mock implementations.
//!
//! Mocks for every backend trait, so the service and the HTTP API can be
//! exercised without a provider, CloudDrive2 or qBittorrent instance.
//!
//! # Example
//!
//! ```rust,ignore
//! use nullfetch_core::testing::{fixtures, MockSearchProvider, MockTransferBackend};
//!
//! let provider = MockSearchProvider::new();
//! provider.set_search_results(vec![fixtures::movie("Dune", 438631)]).await;
//! provider
//!     .set_bundle(ResourceKind::Magnet, vec![fixtures::magnet_entry("magnet:?xt=urn:btih:abc")])
//!     .await;
//!
//! let transfer = MockTransferBackend::new();
//! // ... build a MediaService, then inspect transfer.recorded_calls()
//! ```

mod mock_downloader;
mod mock_provider;
mod mock_transfer;

pub use mock_downloader::MockDownloader;
pub use mock_provider::{MockSearchProvider, RecordedFetch, RecordedSearch};
pub use mock_transfer::{MockTransferBackend, TransferCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::HashMap;

    use crate::media::{MediaItem, MediaType, ResourceEntry, ResourceKind};
    use crate::transfer::{Job, JobStatus};

    /// A movie with every resource kind flagged available.
    pub fn movie(title: &str, external_id: u64) -> MediaItem {
        MediaItem {
            title: title.to_string(),
            media_type: MediaType::Movie,
            external_id: Some(external_id),
            year: Some("2021".to_string()),
            overview: Some(format!("A movie about {}.", title.to_lowercase())),
            poster_url: None,
            availability: ResourceKind::ALL.into_iter().map(|k| (k, true)).collect(),
        }
    }

    /// A series with every resource kind flagged available.
    pub fn series(title: &str, external_id: u64) -> MediaItem {
        MediaItem {
            media_type: MediaType::Series,
            year: Some("2022".to_string()),
            overview: Some(format!("A series about {}.", title.to_lowercase())),
            ..movie(title, external_id)
        }
    }

    /// An item with no availability flags set.
    pub fn unavailable(title: &str, external_id: u64) -> MediaItem {
        MediaItem {
            availability: HashMap::new(),
            ..movie(title, external_id)
        }
    }

    pub fn share_entry(share_link: &str, password: &str) -> ResourceEntry {
        ResourceEntry::CloudStorage {
            label: format!("share {}", share_link),
            size_text: Some("4.2 GB".to_string()),
            share_link: share_link.to_string(),
            share_password: password.to_string(),
        }
    }

    pub fn magnet_entry(magnet_uri: &str) -> ResourceEntry {
        ResourceEntry::Magnet {
            label: "Movie.2021.1080p.WEB-DL".to_string(),
            size_text: Some("8 GB".to_string()),
            resolution: Some("1080p".to_string()),
            has_subtitles: true,
            magnet_uri: magnet_uri.to_string(),
        }
    }

    pub fn stream_entry(url: &str) -> ResourceEntry {
        ResourceEntry::Stream {
            label: "online".to_string(),
            size_text: None,
            url: url.to_string(),
        }
    }

    pub fn ed2k_entry(url: &str) -> ResourceEntry {
        ResourceEntry::Ed2k {
            label: "ed2k".to_string(),
            size_text: Some("700 MB".to_string()),
            url: url.to_string(),
        }
    }

    pub fn job(id: &str, status: JobStatus) -> Job {
        Job {
            id: id.to_string(),
            name: format!("job {}", id),
            status,
        }
    }
}
