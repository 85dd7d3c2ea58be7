//! HTTP API tests against the real router with mock backends.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{fixtures, TestConfig, TestFixture};
use nullfetch_core::{
    testing::TransferCall, JobStatus, ProviderError, ResourceKind, TransferError,
};

const MAGNET: &str = "magnet:?xt=urn:btih:0123456789abcdef";
const SHARE: &str = "https://115.com/s/sw1abc?password=abcd";

async fn search_dune(fixture: &TestFixture) {
    fixture
        .provider
        .set_search_results(vec![
            fixtures::movie("Dune", 438631),
            fixtures::series("Dune: Prophecy", 90228),
        ])
        .await;
    let response = fixture
        .post("/api/v1/search", json!({"user_id": "alice", "keyword": "dune"}))
        .await;
    assert_status!(response, StatusCode::OK);
}

// ============================================================================
// Health / config / metrics
// ============================================================================

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture = TestFixture::new();
    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);

    let text = response.body.to_string();
    assert!(!text.contains("test-key"));
    assert!(!text.contains("\"token\""));
    assert_eq!(response.body["provider"]["api_key_configured"], true);
    assert_eq!(response.body["dispatch"]["destination"], "/115/incoming");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new();
    fixture.get("/api/v1/health").await;

    let (status, body) = fixture.get_text("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("nullfetch_http_requests_total"));
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_returns_items() {
    let fixture = TestFixture::new();
    fixture
        .provider
        .set_search_results(vec![fixtures::movie("Dune", 438631)])
        .await;

    let response = fixture
        .post(
            "/api/v1/search",
            json!({"user_id": "alice", "keyword": "  dune ", "page": 2}),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["keyword"], "dune");
    assert_eq!(response.body["page"], 2);
    assert_eq!(response.body["count"], 1);
    assert_eq!(response.body["items"][0]["title"], "Dune");

    let searches = fixture.provider.recorded_searches().await;
    assert_eq!(searches[0].keyword, "dune");
    assert_eq!(searches[0].page, 2);
}

#[tokio::test]
async fn test_search_empty_keyword() {
    let fixture = TestFixture::new();
    let response = fixture
        .post("/api/v1/search", json!({"user_id": "alice", "keyword": "   "}))
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "empty_keyword");
    assert_eq!(fixture.provider.search_count().await, 0);
}

#[tokio::test]
async fn test_search_provider_failure() {
    let fixture = TestFixture::new();
    fixture
        .provider
        .set_next_search_error(ProviderError::Timeout)
        .await;

    let response = fixture
        .post("/api/v1/search", json!({"user_id": "alice", "keyword": "dune"}))
        .await;

    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["code"], "provider_error");
}

#[tokio::test]
async fn test_empty_search_keeps_previous_session() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;
    fixture
        .provider
        .set_bundle(ResourceKind::Magnet, vec![fixtures::magnet_entry(MAGNET)])
        .await;

    fixture.provider.set_search_results(vec![]).await;
    let response = fixture
        .post("/api/v1/search", json!({"user_id": "alice", "keyword": "zzz"}))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["count"], 0);

    let response = fixture
        .post("/api/v1/select", json!({"user_id": "alice", "index": 1}))
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["item"]["title"], "Dune");
}

// ============================================================================
// Select
// ============================================================================

#[tokio::test]
async fn test_select_follows_priority() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;
    fixture
        .provider
        .set_bundle(ResourceKind::Magnet, vec![fixtures::magnet_entry(MAGNET)])
        .await;

    let response = fixture
        .post("/api/v1/select", json!({"user_id": "alice", "index": 1}))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["bundle"]["kind"], "magnet");
    assert_eq!(response.body["bundle"]["entries"][0]["magnet_uri"], MAGNET);
}

#[tokio::test]
async fn test_select_without_session() {
    let fixture = TestFixture::new();
    let response = fixture
        .post("/api/v1/select", json!({"user_id": "bob", "index": 1}))
        .await;

    assert_status!(response, StatusCode::GONE);
    assert_eq!(response.body["code"], "session_expired");
}

#[tokio::test]
async fn test_select_index_out_of_range() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;

    for index in [0, 3] {
        let response = fixture
            .post("/api/v1/select", json!({"user_id": "alice", "index": index}))
            .await;
        assert_status!(response, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["code"], "index_out_of_range");
    }
}

#[tokio::test]
async fn test_select_invalid_kind() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;

    let response = fixture
        .post(
            "/api/v1/select",
            json!({"user_id": "alice", "index": 1, "kind": "torrent"}),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "invalid_resource_kind");
}

#[tokio::test]
async fn test_select_kind_disabled() {
    let fixture = TestFixture::with_config(TestConfig::with_toml(
        "[resolver.enabled]\ned2k = false\n",
    ));
    search_dune(&fixture).await;

    let response = fixture
        .post(
            "/api/v1/select",
            json!({"user_id": "alice", "index": 1, "kind": "ed2k"}),
        )
        .await;

    assert_status!(response, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["code"], "kind_disabled");
    assert_eq!(fixture.provider.fetch_count().await, 0);
}

#[tokio::test]
async fn test_select_missing_external_id() {
    let fixture = TestFixture::new();
    let mut item = fixtures::movie("Untracked", 1);
    item.external_id = None;
    fixture.provider.set_search_results(vec![item]).await;
    fixture
        .post("/api/v1/search", json!({"user_id": "alice", "keyword": "x"}))
        .await;

    let response = fixture
        .post("/api/v1/select", json!({"user_id": "alice", "index": 1}))
        .await;

    assert_status!(response, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["code"], "missing_external_id");
}

#[tokio::test]
async fn test_select_no_resource_available() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;

    let response = fixture
        .post("/api/v1/select", json!({"user_id": "alice", "index": 2}))
        .await;

    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], "no_resource_available");
    assert_eq!(fixture.provider.fetch_count().await, 4);
}

#[tokio::test]
async fn test_select_explicit_kind_surfaces_provider_error() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;
    fixture
        .provider
        .fail_kind(ResourceKind::Stream, "connection reset")
        .await;

    let response = fixture
        .post(
            "/api/v1/select",
            json!({"user_id": "alice", "index": 1, "kind": "video"}),
        )
        .await;

    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["code"], "provider_error");
}

// ============================================================================
// Download / dispatch
// ============================================================================

#[tokio::test]
async fn test_download_share_uses_link_password() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;
    fixture
        .provider
        .set_bundle(
            ResourceKind::CloudStorage,
            vec![fixtures::share_entry(SHARE, "")],
        )
        .await;

    let response = fixture
        .post("/api/v1/download", json!({"user_id": "alice", "index": 1}))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["dispatch"]["succeeded"], true);
    assert_eq!(response.body["entry"]["kind"], "cloud_storage");

    let calls = fixture.transfer.recorded_calls().await;
    assert_eq!(
        calls,
        vec![TransferCall::Share {
            share_link: SHARE.to_string(),
            destination: "/115/incoming".to_string(),
            password: "abcd".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_download_magnet_to_external_downloader() {
    let fixture = TestFixture::with_config(TestConfig {
        with_downloader: true,
        ..Default::default()
    });
    search_dune(&fixture).await;
    fixture
        .provider
        .set_bundle(ResourceKind::Magnet, vec![fixtures::magnet_entry(MAGNET)])
        .await;

    let response = fixture
        .post(
            "/api/v1/download",
            json!({
                "user_id": "alice",
                "index": 1,
                "kind": "magnet",
                "mode": "external_downloader",
                "destination": "/downloads"
            }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["dispatch"]["succeeded"], true);
    assert_eq!(
        fixture.downloader.recorded_magnets().await,
        vec![(MAGNET.to_string(), "/downloads".to_string())]
    );
    assert!(fixture.transfer.recorded_calls().await.is_empty());
}

#[tokio::test]
async fn test_download_entry_out_of_range() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;
    fixture
        .provider
        .set_bundle(ResourceKind::Magnet, vec![fixtures::magnet_entry(MAGNET)])
        .await;

    let response = fixture
        .post(
            "/api/v1/download",
            json!({"user_id": "alice", "index": 1, "entry": 2}),
        )
        .await;

    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "entry_out_of_range");
    assert!(fixture.transfer.recorded_calls().await.is_empty());
}

#[tokio::test]
async fn test_download_backend_failure_reported_in_body() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;
    fixture
        .provider
        .set_bundle(ResourceKind::Magnet, vec![fixtures::magnet_entry(MAGNET)])
        .await;
    fixture
        .transfer
        .set_next_error(TransferError::Rejected("quota exceeded".to_string()))
        .await;

    let response = fixture
        .post("/api/v1/download", json!({"user_id": "alice", "index": 1}))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["dispatch"]["succeeded"], false);
    assert!(response.body["dispatch"]["detail"]
        .as_str()
        .unwrap()
        .contains("quota exceeded"));
}

#[tokio::test]
async fn test_dispatch_stream_entry_not_supported() {
    let fixture = TestFixture::new();
    let entry = fixtures::stream_entry("https://cdn.example/dune.m3u8");

    let response = fixture
        .post("/api/v1/dispatch", json!({"entry": entry}))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["succeeded"], false);
    assert!(fixture.transfer.recorded_calls().await.is_empty());
}

#[tokio::test]
async fn test_dispatch_magnet_entry() {
    let fixture = TestFixture::new();
    let response = fixture
        .post(
            "/api/v1/dispatch",
            json!({"entry": {"kind": "magnet", "label": "Dune", "magnet_uri": MAGNET}}),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["succeeded"], true);
    assert_eq!(
        fixture.transfer.recorded_calls().await,
        vec![TransferCall::Offline {
            magnet_uri: MAGNET.to_string(),
            destination: "/115/incoming".to_string(),
        }]
    );
}

// ============================================================================
// Sessions / jobs
// ============================================================================

#[tokio::test]
async fn test_clear_session() {
    let fixture = TestFixture::new();
    search_dune(&fixture).await;

    let response = fixture.delete("/api/v1/sessions/alice").await;
    assert_status!(response, StatusCode::NO_CONTENT);

    let response = fixture
        .post("/api/v1/select", json!({"user_id": "alice", "index": 1}))
        .await;
    assert_status!(response, StatusCode::GONE);
}

#[tokio::test]
async fn test_poll_jobs_reports_each_completion_once() {
    let fixture = TestFixture::new();
    fixture
        .transfer
        .set_jobs(vec![
            fixtures::job("a", JobStatus::Code(2)),
            fixtures::job("b", JobStatus::Text("Downloading".to_string())),
        ])
        .await;

    let first = fixture.post("/api/v1/jobs/poll", json!({})).await;
    assert_status!(first, StatusCode::OK);
    assert_eq!(first.body["completed"].as_array().unwrap().len(), 1);
    assert_eq!(first.body["completed"][0]["id"], "a");

    let second = fixture.post("/api/v1/jobs/poll", json!({})).await;
    assert_status!(second, StatusCode::OK);
    assert!(second.body["completed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_poll_jobs_backend_failure() {
    let fixture = TestFixture::new();
    fixture
        .transfer
        .set_next_error(TransferError::AuthenticationFailed("bad token".to_string()))
        .await;

    let response = fixture.post("/api/v1/jobs/poll", json!({})).await;
    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["code"], "transfer_error");
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_api_key_required_except_health() {
    let fixture = TestFixture::with_config(TestConfig::with_api_key("s3cret"));

    let health = fixture.get("/api/v1/health").await;
    assert_status!(health, StatusCode::OK);

    let config = fixture.get("/api/v1/config").await;
    assert_status!(config, StatusCode::UNAUTHORIZED);
    assert_eq!(config.body["code"], "unauthorized");

    let config = fixture
        .request("GET", "/api/v1/config", None, &[("X-API-Key", "s3cret")])
        .await;
    assert_status!(config, StatusCode::OK);

    let search = fixture
        .request(
            "POST",
            "/api/v1/search",
            Some(json!({"user_id": "alice", "keyword": ""})),
            &[("Authorization", "Bearer s3cret")],
        )
        .await;
    assert_status!(search, StatusCode::BAD_REQUEST);
}
