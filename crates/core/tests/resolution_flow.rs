//! Search -> select -> dispatch integration tests.
//!
//! These tests drive `MediaService` against real HTTP clients pointed at
//! wiremock servers standing in for nullbr and CloudDrive2.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nullfetch_core::{
    load_config_from_str, validate_config, CloudDrive2Client, Config, DownloadOptions,
    MediaService, NullbrClient, ResourceKind, ServiceError,
};

struct TestHarness {
    nullbr: MockServer,
    cd2: MockServer,
    service: MediaService,
}

impl TestHarness {
    async fn new(resolver_toml: &str) -> Self {
        let nullbr = MockServer::start().await;
        let cd2 = MockServer::start().await;

        let config: Config = load_config_from_str(&format!(
            r#"
[provider]
app_id = "test-app"
api_key = "user-key"
base_url = "{}"
timeout_secs = 5

[transfer]
url = "{}"
api_token = "cd2-token"

[dispatch]
destination = "/115/nullfetch"

{}
"#,
            nullbr.uri(),
            cd2.uri(),
            resolver_toml
        ))
        .expect("config parses");
        validate_config(&config).expect("config is valid");

        let provider = Arc::new(NullbrClient::new(config.provider.clone()).expect("provider"));
        let transfer = Arc::new(CloudDrive2Client::new(config.transfer.clone()).expect("cd2"));
        let service = MediaService::new(provider, transfer, None, &config);

        Self {
            nullbr,
            cd2,
            service,
        }
    }

    async fn mount_search(&self) {
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("query", "dune"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {
                        "title": "Dune",
                        "media_type": "movie",
                        "tmdbid": 438631,
                        "release_date": "2021-09-15",
                        "115-flg": 1,
                        "magnet-flg": 1,
                        "ed2k-flg": 0,
                        "video-flg": 0
                    },
                    {
                        "title": "Dune (no id)",
                        "media_type": "movie",
                        "115-flg": 1
                    }
                ]
            })))
            .mount(&self.nullbr)
            .await;
    }
}

#[tokio::test]
async fn test_search_select_and_transfer_share() {
    let h = TestHarness::new("").await;
    h.mount_search().await;

    Mock::given(method("GET"))
        .and(path("/movie/438631/115"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "115": [
                { "title": "Dune.2021.2160p", "size": "58 GB", "share_link": "https://115.com/s/sw3?password=abcd" }
            ]
        })))
        .expect(1)
        .mount(&h.nullbr)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/AddSharedLink"))
        .and(body_json(json!({
            "sharedLinkUrl": "https://115.com/s/sw3?password=abcd",
            "sharedPassword": "abcd",
            "toFolder": "/115/nullfetch"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.cd2)
        .await;

    let items = h.service.search("alice", "dune", 1).await.unwrap();
    assert_eq!(items.len(), 2);

    let outcome = h
        .service
        .download("alice", 1, DownloadOptions::default())
        .await
        .unwrap();
    assert_eq!(outcome.bundle.kind, ResourceKind::CloudStorage);
    assert!(outcome.dispatch.succeeded, "{}", outcome.dispatch.detail);
}

#[tokio::test]
async fn test_provider_failure_falls_back_to_magnet_offline_job() {
    let h = TestHarness::new("").await;
    h.mount_search().await;

    Mock::given(method("GET"))
        .and(path("/movie/438631/115"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&h.nullbr)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/438631/magnet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "magnet": [
                { "name": "Dune.2021.1080p", "size": "10 GB", "magnet": "magnet:?xt=urn:btih:dune" }
            ]
        })))
        .mount(&h.nullbr)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/AddOfflineFiles"))
        .and(body_json(json!({
            "urls": "magnet:?xt=urn:btih:dune",
            "toFolder": "/115/nullfetch"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&h.cd2)
        .await;

    h.service.search("alice", "dune", 1).await.unwrap();
    let outcome = h
        .service
        .download("alice", 1, DownloadOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.bundle.kind, ResourceKind::Magnet);
    assert!(outcome.dispatch.succeeded);
}

#[tokio::test]
async fn test_unflagged_kinds_are_never_fetched() {
    let h = TestHarness::new("[resolver.enabled]\ncloud_storage = false\nmagnet = false\n").await;
    h.mount_search().await;

    // ed2k and video are flagged unavailable, the rest disabled.
    Mock::given(method("GET"))
        .and(path("/movie/438631/ed2k"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.nullbr)
        .await;

    h.service.search("alice", "dune", 1).await.unwrap();
    let err = h.service.select_by_index("alice", 1).await.unwrap_err();
    assert_eq!(err.code(), "no_resource_available");
}

#[tokio::test]
async fn test_item_without_id_and_out_of_range_index() {
    let h = TestHarness::new("").await;
    h.mount_search().await;
    h.service.search("alice", "dune", 1).await.unwrap();

    let err = h.service.select_by_index("alice", 2).await.unwrap_err();
    assert_eq!(err.code(), "missing_external_id");

    let err = h.service.select_by_index("alice", 3).await.unwrap_err();
    assert!(matches!(err, ServiceError::Session(_)));
    assert_eq!(err.code(), "index_out_of_range");
}

#[tokio::test]
async fn test_completed_jobs_reported_once() {
    let h = TestHarness::new("").await;
    Mock::given(method("POST"))
        .and(path("/api/ListAllOfflineFiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "offlineFiles": [
                { "id": "a", "name": "Dune.2021.1080p", "status": "Success" },
                { "id": "b", "name": "Other", "status": 1 }
            ]
        })))
        .mount(&h.cd2)
        .await;

    let first = h.service.poll_jobs().await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].name, "Dune.2021.1080p");
    assert!(h.service.poll_jobs().await.unwrap().is_empty());
}
