//! CloudDrive2 HTTP API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{Job, JobStatus, TransferBackend, TransferError};
use crate::config::TransferConfig;
use crate::metrics;

/// CloudDrive2 client.
pub struct CloudDrive2Client {
    client: Client,
    base_url: String,
}

impl CloudDrive2Client {
    /// Create a new CloudDrive2 client.
    pub fn new(config: TransferConfig) -> Result<Self, TransferError> {
        let mut headers = HeaderMap::new();
        if !config.api_token.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", config.api_token))
                .map_err(|_| {
                    TransferError::AuthenticationFailed(
                        "api_token contains invalid characters".to_string(),
                    )
                })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// POST a command endpoint and interpret CloudDrive2's success rules.
    async fn post_command<T: Serialize + ?Sized>(
        &self,
        operation: &str,
        endpoint: &str,
        body: &T,
    ) -> Result<(), TransferError> {
        let start = Instant::now();
        let result = async {
            let response = self.post(endpoint, body).await?;
            let text = response.text().await?;
            check_command_body(&text)
        }
        .await;

        metrics::observe_external(
            "clouddrive2",
            operation,
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        result
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<reqwest::Response, TransferError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TransferError::AuthenticationFailed(format!(
                "CloudDrive2 returned {}",
                status
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransferError::ApiError {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(response)
    }
}

/// An empty or non-JSON body counts as success; `success: false` is a rejection.
fn check_command_body(text: &str) -> Result<(), TransferError> {
    if text.trim().is_empty() {
        return Ok(());
    }

    match serde_json::from_str::<CommandResult>(text) {
        Ok(CommandResult {
            success: Some(false),
            error_message,
        }) => Err(TransferError::Rejected(
            error_message.unwrap_or_else(|| "no error message".to_string()),
        )),
        Ok(_) => Ok(()),
        Err(_) => {
            debug!("CloudDrive2 returned a non-JSON body, treating as success");
            Ok(())
        }
    }
}

#[async_trait]
impl TransferBackend for CloudDrive2Client {
    fn name(&self) -> &str {
        "clouddrive2"
    }

    async fn transfer_share(
        &self,
        share_link: &str,
        destination: &str,
        password: &str,
    ) -> Result<(), TransferError> {
        debug!(share_link, destination, "Adding shared link");

        self.post_command(
            "add_shared_link",
            "/api/AddSharedLink",
            &AddSharedLinkRequest {
                shared_link_url: share_link,
                shared_password: password,
                to_folder: destination,
            },
        )
        .await
    }

    async fn submit_offline_job(
        &self,
        magnet_uri: &str,
        destination: &str,
    ) -> Result<(), TransferError> {
        debug!(destination, "Adding offline files");

        self.post_command(
            "add_offline_files",
            "/api/AddOfflineFiles",
            &AddOfflineFilesRequest {
                urls: magnet_uri,
                to_folder: destination,
            },
        )
        .await
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, TransferError> {
        let start = Instant::now();
        let result = async {
            let response = self
                .post("/api/ListAllOfflineFiles", &ListOfflineFilesRequest { page: 0 })
                .await?;
            let list: ListOfflineFilesResponse =
                response.json().await.map_err(|e| TransferError::ApiError {
                    status: 200,
                    message: format!("Failed to parse offline file list: {}", e),
                })?;
            Ok::<_, TransferError>(list
                .offline_files
                .into_iter()
                .filter_map(OfflineFile::into_job)
                .collect::<Vec<_>>())
        }
        .await;

        metrics::observe_external(
            "clouddrive2",
            "list_offline_files",
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        result
    }
}

// ============================================================================
// CloudDrive2 API Types (private)
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddSharedLinkRequest<'a> {
    shared_link_url: &'a str,
    shared_password: &'a str,
    to_folder: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddOfflineFilesRequest<'a> {
    urls: &'a str,
    to_folder: &'a str,
}

#[derive(Serialize)]
struct ListOfflineFilesRequest {
    page: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommandResult {
    success: Option<bool>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListOfflineFilesResponse {
    #[serde(default)]
    offline_files: Vec<OfflineFile>,
}

#[derive(Debug, Deserialize)]
struct OfflineFile {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<Value>,
}

impl OfflineFile {
    /// Jobs without an id fall back to their name; jobs with neither are skipped.
    fn into_job(self) -> Option<Job> {
        let name = self.name.unwrap_or_default();
        let id = match self.id {
            Some(Value::String(s)) if !s.is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ if !name.is_empty() => name.clone(),
            _ => {
                warn!("Skipping offline job without id or name");
                return None;
            }
        };

        let status = match self.status {
            Some(Value::Number(n)) => n.as_i64().map(JobStatus::Code).unwrap_or_default(),
            Some(Value::String(s)) => JobStatus::Text(s),
            _ => JobStatus::default(),
        };

        Some(Job { id, name, status })
    }
}
