//! Mock magnet downloader for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::downloader::MagnetDownloader;
use crate::transfer::TransferError;

/// Mock implementation of the MagnetDownloader trait.
#[derive(Debug, Default)]
pub struct MockDownloader {
    /// Recorded (magnet_uri, destination) pairs.
    added: Arc<RwLock<Vec<(String, String)>>>,
    next_error: Arc<RwLock<Option<TransferError>>>,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded_magnets(&self) -> Vec<(String, String)> {
        self.added.read().await.clone()
    }

    pub async fn set_next_error(&self, error: TransferError) {
        *self.next_error.write().await = Some(error);
    }
}

#[async_trait]
impl MagnetDownloader for MockDownloader {
    fn name(&self) -> &str {
        "mock-downloader"
    }

    async fn add_magnet(&self, magnet_uri: &str, destination: &str) -> Result<(), TransferError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        self.added
            .write()
            .await
            .push((magnet_uri.to_string(), destination.to_string()));
        Ok(())
    }
}
