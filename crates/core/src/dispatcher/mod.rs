//! Dispatch of a resolved resource entry to a downstream action.
//!
//! Cloud-storage shares always go to the Transfer Backend. Magnets go to the
//! Transfer Backend as offline jobs, or to the external downloader in
//! [`DownloadMode::ExternalDownloader`]. Stream and ed2k links cannot be
//! dispatched. Failures are reported in the [`DispatchResult`], never as
//! errors.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::downloader::MagnetDownloader;
use crate::media::ResourceEntry;
use crate::metrics;
use crate::transfer::{TransferBackend, TransferError};

/// Where magnet links are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    /// Offline job on the Transfer Backend
    #[default]
    CloudTransfer,
    /// The external magnet downloader
    ExternalDownloader,
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadMode::CloudTransfer => write!(f, "cloud_transfer"),
            DownloadMode::ExternalDownloader => write!(f, "external_downloader"),
        }
    }
}

/// Outcome of a dispatch, suitable for showing to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub succeeded: bool,
    pub detail: String,
}

impl DispatchResult {
    fn success(detail: String) -> Self {
        Self {
            succeeded: true,
            detail,
        }
    }

    fn failure(detail: String) -> Self {
        Self {
            succeeded: false,
            detail,
        }
    }
}

/// Routes entries to the Transfer Backend or the external downloader.
pub struct DownloadDispatcher {
    transfer: Arc<dyn TransferBackend>,
    downloader: Option<Arc<dyn MagnetDownloader>>,
    call_timeout: Duration,
}

impl DownloadDispatcher {
    pub fn new(
        transfer: Arc<dyn TransferBackend>,
        downloader: Option<Arc<dyn MagnetDownloader>>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            transfer,
            downloader,
            call_timeout,
        }
    }

    pub fn has_downloader(&self) -> bool {
        self.downloader.is_some()
    }

    /// Dispatch one entry. Never fails; see [`DispatchResult::succeeded`].
    pub async fn dispatch(
        &self,
        entry: &ResourceEntry,
        mode: DownloadMode,
        destination: &str,
    ) -> DispatchResult {
        let kind = entry.kind();
        let result = match entry {
            ResourceEntry::CloudStorage {
                label,
                share_link,
                share_password,
                ..
            } => {
                let password = share_password_for(share_password, share_link);
                let outcome = self
                    .call(
                        self.transfer
                            .transfer_share(share_link, destination, &password),
                    )
                    .await;
                self.report(outcome, || {
                    format!("Saved '{}' to {}", label, destination)
                })
            }
            ResourceEntry::Magnet {
                label, magnet_uri, ..
            } => match mode {
                DownloadMode::CloudTransfer => {
                    let outcome = self
                        .call(self.transfer.submit_offline_job(magnet_uri, destination))
                        .await;
                    self.report(outcome, || {
                        format!("Offline download of '{}' added to {}", label, destination)
                    })
                }
                DownloadMode::ExternalDownloader => match &self.downloader {
                    Some(downloader) => {
                        let outcome = self
                            .call(downloader.add_magnet(magnet_uri, destination))
                            .await;
                        self.report(outcome, || {
                            format!("'{}' sent to {}", label, downloader.name())
                        })
                    }
                    None => DispatchResult::failure(
                        "No external downloader is configured".to_string(),
                    ),
                },
            },
            ResourceEntry::Stream { .. } | ResourceEntry::Ed2k { .. } => {
                metrics::DISPATCHES_TOTAL
                    .with_label_values(&[kind.as_str(), "unsupported"])
                    .inc();
                return DispatchResult::failure(format!(
                    "{} links cannot be dispatched, open the link directly",
                    kind
                ));
            }
        };

        metrics::DISPATCHES_TOTAL
            .with_label_values(&[
                kind.as_str(),
                if result.succeeded { "success" } else { "failure" },
            ])
            .inc();

        if result.succeeded {
            info!(%kind, %mode, destination, label = entry.label(), "Dispatched resource");
        } else {
            warn!(%kind, %mode, destination, detail = %result.detail, "Dispatch failed");
        }

        result
    }

    async fn call<F>(&self, fut: F) -> Result<(), TransferError>
    where
        F: Future<Output = Result<(), TransferError>>,
    {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .unwrap_or_else(|_| Err(TransferError::Timeout))
    }

    fn report(
        &self,
        outcome: Result<(), TransferError>,
        detail: impl FnOnce() -> String,
    ) -> DispatchResult {
        match outcome {
            Ok(()) => DispatchResult::success(detail()),
            Err(e) => DispatchResult::failure(e.to_string()),
        }
    }
}

/// The entry's own password, else the `password` query parameter of the
/// share link, else empty.
pub fn share_password_for(entry_password: &str, share_link: &str) -> String {
    if !entry_password.is_empty() {
        return entry_password.to_string();
    }

    Url::parse(share_link)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "password")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockDownloader, MockTransferBackend, TransferCall};

    fn dispatcher(
        transfer: &Arc<MockTransferBackend>,
        downloader: Option<&Arc<MockDownloader>>,
    ) -> DownloadDispatcher {
        DownloadDispatcher::new(
            transfer.clone(),
            downloader.map(|d| d.clone() as Arc<dyn MagnetDownloader>),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_share_password_for() {
        assert_eq!(share_password_for("own", "https://115.com/s/x?password=q"), "own");
        assert_eq!(share_password_for("", "https://115.com/s/x?password=abcd"), "abcd");
        assert_eq!(
            share_password_for("", "https://115.com/s/x?foo=1&password=ab%20cd#frag"),
            "ab cd"
        );
        assert_eq!(share_password_for("", "https://115.com/s/x"), "");
        assert_eq!(share_password_for("", "not a url"), "");
    }

    #[tokio::test]
    async fn test_share_password_from_link() {
        let transfer = Arc::new(MockTransferBackend::new());
        let entry = fixtures::share_entry("https://115.com/s/sw3abc?password=abcd", "");

        let result = dispatcher(&transfer, None)
            .dispatch(&entry, DownloadMode::CloudTransfer, "/115")
            .await;

        assert!(result.succeeded);
        assert_eq!(
            transfer.recorded_calls().await,
            vec![TransferCall::Share {
                share_link: "https://115.com/s/sw3abc?password=abcd".to_string(),
                destination: "/115".to_string(),
                password: "abcd".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_share_ignores_external_mode() {
        let transfer = Arc::new(MockTransferBackend::new());
        let downloader = Arc::new(MockDownloader::new());
        let entry = fixtures::share_entry("https://115.com/s/x", "pw");

        let result = dispatcher(&transfer, Some(&downloader))
            .dispatch(&entry, DownloadMode::ExternalDownloader, "/media")
            .await;

        assert!(result.succeeded);
        assert_eq!(transfer.recorded_calls().await.len(), 1);
        assert!(downloader.recorded_magnets().await.is_empty());
    }

    #[tokio::test]
    async fn test_magnet_cloud_transfer_submits_offline_job() {
        let transfer = Arc::new(MockTransferBackend::new());
        let entry = fixtures::magnet_entry("magnet:?xt=urn:btih:abc");

        let result = dispatcher(&transfer, None)
            .dispatch(&entry, DownloadMode::CloudTransfer, "/115")
            .await;

        assert!(result.succeeded);
        assert_eq!(
            transfer.recorded_calls().await,
            vec![TransferCall::Offline {
                magnet_uri: "magnet:?xt=urn:btih:abc".to_string(),
                destination: "/115".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_magnet_external_downloader() {
        let transfer = Arc::new(MockTransferBackend::new());
        let downloader = Arc::new(MockDownloader::new());
        let entry = fixtures::magnet_entry("magnet:?xt=urn:btih:abc");

        let result = dispatcher(&transfer, Some(&downloader))
            .dispatch(&entry, DownloadMode::ExternalDownloader, "/downloads")
            .await;

        assert!(result.succeeded);
        assert!(transfer.recorded_calls().await.is_empty());
        assert_eq!(
            downloader.recorded_magnets().await,
            vec![(
                "magnet:?xt=urn:btih:abc".to_string(),
                "/downloads".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_external_mode_without_downloader_fails() {
        let transfer = Arc::new(MockTransferBackend::new());
        let entry = fixtures::magnet_entry("magnet:?xt=urn:btih:abc");

        let result = dispatcher(&transfer, None)
            .dispatch(&entry, DownloadMode::ExternalDownloader, "/downloads")
            .await;

        assert!(!result.succeeded);
        assert!(transfer.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_stream_and_ed2k_not_dispatchable() {
        let transfer = Arc::new(MockTransferBackend::new());
        let d = dispatcher(&transfer, None);

        let stream = d
            .dispatch(
                &fixtures::stream_entry("https://v.example/1.m3u8"),
                DownloadMode::CloudTransfer,
                "/115",
            )
            .await;
        let ed2k = d
            .dispatch(
                &fixtures::ed2k_entry("ed2k://|file|x|1|h|/"),
                DownloadMode::CloudTransfer,
                "/115",
            )
            .await;

        assert!(!stream.succeeded);
        assert!(stream.detail.contains("stream"));
        assert!(!ed2k.succeeded);
        assert!(ed2k.detail.contains("ed2k"));
        assert!(transfer.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_reported() {
        let transfer = Arc::new(MockTransferBackend::new());
        transfer
            .set_next_error(TransferError::Rejected("share expired".to_string()))
            .await;

        let result = dispatcher(&transfer, None)
            .dispatch(
                &fixtures::share_entry("https://115.com/s/x", ""),
                DownloadMode::CloudTransfer,
                "/115",
            )
            .await;

        assert!(!result.succeeded);
        assert!(result.detail.contains("share expired"));
    }

    #[test]
    fn test_download_mode_serde() {
        let mode: DownloadMode = serde_json::from_str("\"external_downloader\"").unwrap();
        assert_eq!(mode, DownloadMode::ExternalDownloader);
        assert_eq!(DownloadMode::default(), DownloadMode::CloudTransfer);
        assert_eq!(DownloadMode::CloudTransfer.to_string(), "cloud_transfer");
    }
}
