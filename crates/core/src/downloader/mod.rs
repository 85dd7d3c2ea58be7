//! External magnet downloader, used in `external_downloader` dispatch mode.

mod qbittorrent;

pub use qbittorrent::QBittorrentDownloader;

use async_trait::async_trait;

use crate::transfer::TransferError;

/// Trait for downloaders that accept magnet URIs directly.
#[async_trait]
pub trait MagnetDownloader: Send + Sync {
    /// Downloader name for logging.
    fn name(&self) -> &str;

    /// Queue a magnet URI for download into `destination`.
    async fn add_magnet(&self, magnet_uri: &str, destination: &str) -> Result<(), TransferError>;
}
