//! Common test utilities for API tests with mocks.
//!
//! Builds an in-process router around a `MediaService` whose backends are
//! the core testing mocks, so every endpoint can be exercised without a
//! provider, CloudDrive2 or qBittorrent instance.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use nullfetch_core::{
    load_config_from_str,
    testing::{MockDownloader, MockSearchProvider, MockTransferBackend},
    MagnetDownloader, MediaService,
};

/// Re-export fixtures for test convenience
pub use nullfetch_core::testing::fixtures;

const BASE_CONFIG: &str = r#"
[provider]
app_id = "test-app"
api_key = "test-key"

[transfer]
url = "http://localhost:19798"
api_token = "token"

[dispatch]
destination = "/115/incoming"
"#;

/// Test fixture with mock backends behind the real router.
pub struct TestFixture {
    pub router: Router,
    pub provider: Arc<MockSearchProvider>,
    pub transfer: Arc<MockTransferBackend>,
    pub downloader: Arc<MockDownloader>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Required API key; `None` leaves the API open
    pub api_key: Option<String>,
    /// Extra TOML appended to the base config
    pub extra_toml: String,
    /// Wire the mock downloader into the dispatcher
    pub with_downloader: bool,
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    pub fn with_toml(extra: &str) -> Self {
        Self {
            extra_toml: extra.to_string(),
            ..Default::default()
        }
    }
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(TestConfig::default())
    }

    pub fn with_config(test_config: TestConfig) -> Self {
        let toml = format!("{}\n{}", BASE_CONFIG, test_config.extra_toml);
        let mut config = load_config_from_str(&toml).expect("Invalid test config");
        config.server.api_key = test_config.api_key.clone();

        let provider = Arc::new(MockSearchProvider::new());
        let transfer = Arc::new(MockTransferBackend::new());
        let downloader = Arc::new(MockDownloader::new());

        let service = MediaService::new(
            Arc::clone(&provider) as Arc<dyn nullfetch_core::SearchProvider>,
            Arc::clone(&transfer) as Arc<dyn nullfetch_core::TransferBackend>,
            test_config
                .with_downloader
                .then(|| Arc::clone(&downloader) as Arc<dyn MagnetDownloader>),
            &config,
        );

        let state = Arc::new(nullfetch_server::state::AppState::new(
            config,
            Arc::new(service),
        ));
        let router = nullfetch_server::api::create_router(state);

        Self {
            router,
            provider,
            transfer,
            downloader,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None, &[]).await
    }

    /// Send a request with extra headers.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        let (status, bytes) = self.send(request).await;

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    /// Send a GET request and return the raw text body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, bytes.to_vec())
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
