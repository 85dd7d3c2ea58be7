//! nullbr API client.
//!
//! Search is available with an app id alone; fetching resource links also
//! requires the user's API key.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use super::{ProviderError, SearchProvider};
use crate::config::ProviderConfig;
use crate::media::{MediaItem, MediaType, ResourceBundle, ResourceEntry, ResourceKind};
use crate::metrics;

/// Default nullbr API base URL.
pub const DEFAULT_NULLBR_URL: &str = "https://api.nullbr.eu.org";

/// Prefix for relative poster paths returned by the provider.
pub const TMDB_POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Season requested for series magnet listings.
const SERIES_MAGNET_SEASON: u32 = 1;

const CLIENT_USER_AGENT: &str = concat!("nullfetch/", env!("CARGO_PKG_VERSION"));

/// nullbr API client.
pub struct NullbrClient {
    client: Client,
    base_url: String,
    has_api_key: bool,
}

impl NullbrClient {
    /// Create a new nullbr client.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.app_id.is_empty() {
            return Err(ProviderError::NotConfigured(
                "nullbr app_id is required".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(
            HeaderName::from_static("x-app-id"),
            header_value(&config.app_id, "app_id")?,
        );
        if !config.api_key.is_empty() {
            headers.insert(
                HeaderName::from_static("x-api-key"),
                header_value(&config.api_key, "api_key")?,
            );
        }
        if let Some(cookie) = config.cookie.as_deref().filter(|c| !c.is_empty()) {
            headers.insert(COOKIE, header_value(cookie, "cookie")?);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .default_headers(headers)
            .build()?;

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_NULLBR_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            has_api_key: !config.api_key.is_empty(),
        })
    }

    /// Whether resource links can be fetched (an API key is configured).
    pub fn can_fetch_resources(&self) -> bool {
        self.has_api_key
    }
}

fn header_value(value: &str, field: &str) -> Result<HeaderValue, ProviderError> {
    HeaderValue::from_str(value)
        .map_err(|_| ProviderError::NotConfigured(format!("nullbr {} contains invalid characters", field)))
}

/// Path of a resource listing. Series magnets are only listed per season,
/// and the first season is the one requested.
fn resource_path(media_type: MediaType, external_id: u64, kind: ResourceKind) -> String {
    match (media_type, kind) {
        (MediaType::Series, ResourceKind::Magnet) => format!(
            "/{}/{}/season/{}/{}",
            media_type.provider_key(),
            external_id,
            SERIES_MAGNET_SEASON,
            kind.provider_key()
        ),
        _ => format!(
            "/{}/{}/{}",
            media_type.provider_key(),
            external_id,
            kind.provider_key()
        ),
    }
}

async fn error_for_status(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ProviderError::NotConfigured("nullbr rejected the app id or API key".to_string());
    }
    let body = response.text().await.unwrap_or_default();
    ProviderError::ApiError {
        status: status.as_u16(),
        message: body.chars().take(200).collect(),
    }
}

#[async_trait]
impl SearchProvider for NullbrClient {
    fn name(&self) -> &str {
        "nullbr"
    }

    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<MediaItem>, ProviderError> {
        let start = Instant::now();
        let result = self.search_items(keyword, page).await;
        metrics::observe_external(
            "nullbr",
            "search",
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        result
    }

    async fn fetch_resources(
        &self,
        media_type: MediaType,
        external_id: u64,
        kind: ResourceKind,
    ) -> Result<ResourceBundle, ProviderError> {
        let start = Instant::now();
        let result = self.fetch_bundle(media_type, external_id, kind).await;
        metrics::observe_external(
            "nullbr",
            kind.provider_key(),
            start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
        result
    }
}

impl NullbrClient {
    async fn search_items(&self, keyword: &str, page: u32) -> Result<Vec<MediaItem>, ProviderError> {
        let url = format!("{}/search", self.base_url);

        debug!(keyword, page, "nullbr search");

        let response = self
            .client
            .get(&url)
            .query(&[("query", keyword.to_string()), ("page", page.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let search: NullbrSearchResponse = response.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse search response: {}", e))
        })?;

        let items: Vec<MediaItem> = search
            .items
            .into_iter()
            .filter_map(NullbrItem::into_media_item)
            .collect();

        debug!(keyword, results = items.len(), "nullbr search complete");
        Ok(items)
    }

    async fn fetch_bundle(
        &self,
        media_type: MediaType,
        external_id: u64,
        kind: ResourceKind,
    ) -> Result<ResourceBundle, ProviderError> {
        if !self.has_api_key {
            return Err(ProviderError::NotConfigured(
                "an API key is required to fetch resource links".to_string(),
            ));
        }

        let key = kind.provider_key();
        let url = format!(
            "{}{}",
            self.base_url,
            resource_path(media_type, external_id, kind)
        );

        debug!(%kind, external_id, "nullbr fetch resources");

        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ResourceBundle::empty(kind));
        }
        if !response.status().is_success() {
            return Err(error_for_status(response).await);
        }

        let mut body: HashMap<String, Value> = response.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse resource response: {}", e))
        })?;

        let raw: Vec<NullbrResource> = match body.remove(key) {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                ProviderError::ParseError(format!("Failed to parse {} resources: {}", key, e))
            })?,
        };

        let entries = raw
            .into_iter()
            .filter_map(|r| r.into_entry(kind))
            .collect();

        Ok(ResourceBundle::new(kind, entries))
    }
}

// ============================================================================
// nullbr API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct NullbrSearchResponse {
    #[serde(default)]
    items: Vec<NullbrItem>,
}

#[derive(Debug, Deserialize)]
struct NullbrItem {
    title: Option<String>,
    media_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    tmdbid: Option<u64>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster: Option<String>,
    #[serde(rename = "115-flg", default, deserialize_with = "lenient_flag")]
    cloud_flag: bool,
    #[serde(rename = "magnet-flg", default, deserialize_with = "lenient_flag")]
    magnet_flag: bool,
    #[serde(rename = "ed2k-flg", default, deserialize_with = "lenient_flag")]
    ed2k_flag: bool,
    #[serde(rename = "video-flg", default, deserialize_with = "lenient_flag")]
    video_flag: bool,
}

impl NullbrItem {
    fn into_media_item(self) -> Option<MediaItem> {
        let media_type = match self.media_type.as_deref().and_then(MediaType::from_provider) {
            Some(t) => t,
            None => {
                debug!(title = ?self.title, media_type = ?self.media_type, "Skipping unsupported media type");
                return None;
            }
        };

        let year = self
            .release_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(self.first_air_date.as_deref().filter(|d| !d.is_empty()))
            .map(|d| d.chars().take(4).collect());

        let poster_url = self.poster.filter(|p| !p.is_empty()).map(|p| {
            if p.starts_with("http") {
                p
            } else {
                format!("{}{}", TMDB_POSTER_BASE, p)
            }
        });

        let availability = HashMap::from([
            (ResourceKind::CloudStorage, self.cloud_flag),
            (ResourceKind::Magnet, self.magnet_flag),
            (ResourceKind::Ed2k, self.ed2k_flag),
            (ResourceKind::Stream, self.video_flag),
        ]);

        Some(MediaItem {
            title: self.title.unwrap_or_else(|| "Unknown title".to_string()),
            media_type,
            external_id: self.tmdbid,
            year,
            overview: self.overview.filter(|o| !o.is_empty()),
            poster_url,
            availability,
        })
    }
}

#[derive(Debug, Deserialize)]
struct NullbrResource {
    title: Option<String>,
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    size: Option<String>,
    share_link: Option<String>,
    password: Option<String>,
    resolution: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    zh_sub: bool,
    magnet: Option<String>,
    url: Option<String>,
    link: Option<String>,
}

impl NullbrResource {
    /// Convert to an entry of `kind`; resources without a link are dropped.
    fn into_entry(self, kind: ResourceKind) -> Option<ResourceEntry> {
        match kind {
            ResourceKind::CloudStorage => Some(ResourceEntry::CloudStorage {
                label: self.title.or(self.name).unwrap_or_default(),
                size_text: self.size,
                share_link: self.share_link.filter(|l| !l.is_empty())?,
                share_password: self.password.unwrap_or_default(),
            }),
            ResourceKind::Magnet => Some(ResourceEntry::Magnet {
                label: self.name.or(self.title).unwrap_or_default(),
                size_text: self.size,
                resolution: self.resolution,
                has_subtitles: self.zh_sub,
                magnet_uri: self.magnet.filter(|m| !m.is_empty())?,
            }),
            ResourceKind::Ed2k => Some(ResourceEntry::Ed2k {
                label: self.name.or(self.title).unwrap_or_default(),
                size_text: self.size,
                url: self.url.or(self.link).or(self.magnet).filter(|u| !u.is_empty())?,
            }),
            ResourceKind::Stream => Some(ResourceEntry::Stream {
                label: self.name.or(self.title).unwrap_or_default(),
                size_text: self.size,
                url: self.url.or(self.link).filter(|u| !u.is_empty())?,
            }),
        }
    }
}

/// Flags arrive as 0/1, booleans, strings or null.
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "True"),
        _ => false,
    })
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
