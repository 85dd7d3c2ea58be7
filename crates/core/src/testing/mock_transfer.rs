//! Mock transfer backend for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::transfer::{Job, TransferBackend, TransferError};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferCall {
    Share {
        share_link: String,
        destination: String,
        password: String,
    },
    Offline {
        magnet_uri: String,
        destination: String,
    },
}

impl TransferCall {
    pub fn destination(&self) -> &str {
        match self {
            TransferCall::Share { destination, .. } | TransferCall::Offline { destination, .. } => {
                destination
            }
        }
    }
}

/// Mock implementation of the TransferBackend trait.
#[derive(Debug, Default)]
pub struct MockTransferBackend {
    calls: Arc<RwLock<Vec<TransferCall>>>,
    jobs: Arc<RwLock<Vec<Job>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TransferError>>>,
}

impl MockTransferBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls that reached the backend (failed calls are not recorded).
    pub async fn recorded_calls(&self) -> Vec<TransferCall> {
        self.calls.read().await.clone()
    }

    /// Jobs returned by `list_jobs`.
    pub async fn set_jobs(&self, jobs: Vec<Job>) {
        *self.jobs.write().await = jobs;
    }

    pub async fn set_next_error(&self, error: TransferError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Result<(), TransferError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TransferBackend for MockTransferBackend {
    fn name(&self) -> &str {
        "mock-transfer"
    }

    async fn transfer_share(
        &self,
        share_link: &str,
        destination: &str,
        password: &str,
    ) -> Result<(), TransferError> {
        self.take_error().await?;
        self.calls.write().await.push(TransferCall::Share {
            share_link: share_link.to_string(),
            destination: destination.to_string(),
            password: password.to_string(),
        });
        Ok(())
    }

    async fn submit_offline_job(
        &self,
        magnet_uri: &str,
        destination: &str,
    ) -> Result<(), TransferError> {
        self.take_error().await?;
        self.calls.write().await.push(TransferCall::Offline {
            magnet_uri: magnet_uri.to_string(),
            destination: destination.to_string(),
        });
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, TransferError> {
        self.take_error().await?;
        Ok(self.jobs.read().await.clone())
    }
}
