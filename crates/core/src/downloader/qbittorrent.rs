//! qBittorrent Web API downloader.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::MagnetDownloader;
use crate::config::DownloaderConfig;
use crate::metrics;
use crate::transfer::TransferError;

/// qBittorrent downloader.
pub struct QBittorrentDownloader {
    client: Client,
    config: DownloaderConfig,
    /// Whether the cookie jar holds a session (cleared on 403).
    authenticated: Arc<RwLock<bool>>,
}

impl QBittorrentDownloader {
    /// Create a new qBittorrent downloader.
    pub fn new(config: DownloaderConfig) -> Result<Self, TransferError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            config,
            authenticated: Arc::new(RwLock::new(false)),
        })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Login and keep the session cookie in the jar.
    async fn login(&self) -> Result<(), TransferError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() && body.contains("Ok.") {
            debug!("qBittorrent login successful");
            *self.authenticated.write().await = true;
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(TransferError::AuthenticationFailed(
                "Invalid qBittorrent credentials".to_string(),
            ))
        } else {
            Err(TransferError::AuthenticationFailed(format!(
                "Unexpected login response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), TransferError> {
        if *self.authenticated.read().await {
            return Ok(());
        }
        self.login().await
    }

    /// Authenticated form POST; re-logins once when the session expired.
    async fn post_form(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, TransferError> {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let mut response = self.client.post(&url).form(params).send().await?;

        if response.status() == StatusCode::FORBIDDEN {
            warn!("qBittorrent session expired, re-authenticating");
            *self.authenticated.write().await = false;
            self.login().await?;
            response = self.client.post(&url).form(params).send().await?;
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TransferError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl MagnetDownloader for QBittorrentDownloader {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn add_magnet(&self, magnet_uri: &str, destination: &str) -> Result<(), TransferError> {
        let start = Instant::now();
        let result = self
            .post_form(
                "/api/v2/torrents/add",
                &[("urls", magnet_uri), ("savepath", destination)],
            )
            .await
            .and_then(|body| {
                if body.trim() == "Fails." {
                    Err(TransferError::Rejected(
                        "qBittorrent refused the magnet link".to_string(),
                    ))
                } else {
                    Ok(())
                }
            });

        metrics::observe_external(
            "qbittorrent",
            "add_magnet",
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        result
    }
}
