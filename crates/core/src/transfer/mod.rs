//! Transfer Backend abstraction.
//!
//! The backend saves cloud-storage shares into the user's drive, registers
//! offline (magnet) download jobs and lists those jobs for completion
//! tracking. [`CloudDrive2Client`] talks to a CloudDrive2 instance.

mod clouddrive2;
mod types;

pub use clouddrive2::CloudDrive2Client;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the Transfer Backend or the external downloader.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransferError::Timeout
        } else {
            TransferError::ConnectionFailed(e.to_string())
        }
    }
}

/// Trait for remote-storage transfer backends.
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Save a cloud-storage share into `destination`.
    async fn transfer_share(
        &self,
        share_link: &str,
        destination: &str,
        password: &str,
    ) -> Result<(), TransferError>;

    /// Register an offline download job for a magnet URI.
    async fn submit_offline_job(
        &self,
        magnet_uri: &str,
        destination: &str,
    ) -> Result<(), TransferError>;

    /// Current offline jobs.
    async fn list_jobs(&self) -> Result<Vec<Job>, TransferError>;
}
