use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

use tracing::warn;

use crate::dispatcher::DownloadMode;
use crate::media::ResourceKind;
use crate::provider::DEFAULT_NULLBR_URL;
use crate::session::DEFAULT_SESSION_TTL_SECS;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub transfer: TransferConfig,
    #[serde(default)]
    pub downloader: Option<DownloaderConfig>,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// When set, API requests must carry this key.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Search provider (nullbr) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Application id sent as `X-APP-ID`
    pub app_id: String,
    /// User API key sent as `X-API-KEY`; required to fetch resource links
    #[serde(default)]
    pub api_key: String,
    /// API base URL (default: https://api.nullbr.eu.org)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Optional cookie header for deployments behind a challenge page
    #[serde(default)]
    pub cookie: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u32,
}

fn default_provider_timeout() -> u32 {
    30
}

/// Transfer backend (CloudDrive2) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    /// CloudDrive2 URL (e.g., "http://localhost:19798")
    pub url: String,
    /// Pre-issued bearer token
    #[serde(default)]
    pub api_token: String,
    /// Request timeout in seconds (default: 20)
    #[serde(default = "default_transfer_timeout")]
    pub timeout_secs: u32,
}

fn default_transfer_timeout() -> u32 {
    20
}

/// External downloader (qBittorrent) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloaderConfig {
    /// qBittorrent Web UI URL (e.g., "http://localhost:8080")
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_downloader_timeout")]
    pub timeout_secs: u32,
}

fn default_downloader_timeout() -> u32 {
    30
}

/// Resource resolution settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Kinds to try, most preferred first. Accepts a list or a
    /// comma-separated string (`"115,magnet,ed2k,video"`).
    #[serde(default = "default_priority", deserialize_with = "deserialize_priority")]
    pub priority: Vec<ResourceKind>,
    #[serde(default)]
    pub enabled: EnabledKinds,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            enabled: EnabledKinds::default(),
        }
    }
}

impl ResolverConfig {
    /// Priority with duplicates removed.
    ///
    /// Lists that do not name every kind fall back to the default order.
    pub fn normalized_priority(&self) -> Vec<ResourceKind> {
        let mut seen = HashSet::new();
        let deduped: Vec<ResourceKind> = self
            .priority
            .iter()
            .copied()
            .filter(|kind| seen.insert(*kind))
            .collect();

        if deduped.len() < ResourceKind::ALL.len() {
            warn!(
                configured = ?self.priority,
                default = ?ResourceKind::ALL,
                "Resolver priority does not list every resource kind, using default order"
            );
            return default_priority();
        }

        deduped
    }

    /// Set of locally enabled kinds.
    pub fn enabled_kinds(&self) -> HashSet<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| self.enabled.is_enabled(*kind))
            .collect()
    }
}

fn default_priority() -> Vec<ResourceKind> {
    ResourceKind::ALL.to_vec()
}

fn deserialize_priority<'de, D>(deserializer: D) -> Result<Vec<ResourceKind>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    let names = match Raw::deserialize(deserializer)? {
        Raw::List(list) => list,
        Raw::Joined(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
    };

    names
        .iter()
        .map(|name| name.parse::<ResourceKind>().map_err(serde::de::Error::custom))
        .collect()
}

/// Per-kind enablement switches
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnabledKinds {
    #[serde(default = "enabled_by_default")]
    pub cloud_storage: bool,
    #[serde(default = "enabled_by_default")]
    pub magnet: bool,
    #[serde(default = "enabled_by_default")]
    pub ed2k: bool,
    #[serde(default = "enabled_by_default")]
    pub stream: bool,
}

impl Default for EnabledKinds {
    fn default() -> Self {
        Self {
            cloud_storage: true,
            magnet: true,
            ed2k: true,
            stream: true,
        }
    }
}

impl EnabledKinds {
    pub fn is_enabled(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::CloudStorage => self.cloud_storage,
            ResourceKind::Magnet => self.magnet,
            ResourceKind::Ed2k => self.ed2k,
            ResourceKind::Stream => self.stream,
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Dispatch settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub mode: DownloadMode,
    /// Target folder on the transfer backend / downloader
    #[serde(default = "default_destination")]
    pub destination: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DownloadMode::default(),
            destination: default_destination(),
        }
    }
}

fn default_destination() -> String {
    "/115".to_string()
}

/// Search session settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: SanitizedServerConfig,
    pub provider: SanitizedProviderConfig,
    pub transfer: SanitizedTransferConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloader: Option<SanitizedDownloaderConfig>,
    pub resolver: SanitizedResolverConfig,
    pub dispatch: DispatchConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub base_url: String,
    pub app_id_configured: bool,
    pub api_key_configured: bool,
    pub cookie_configured: bool,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTransferConfig {
    pub url: String,
    pub api_token_configured: bool,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDownloaderConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

/// Effective resolver settings, after normalization
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedResolverConfig {
    pub priority: Vec<ResourceKind>,
    pub enabled: Vec<ResourceKind>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let enabled = config.resolver.enabled_kinds();
        Self {
            server: SanitizedServerConfig {
                host: config.server.host,
                port: config.server.port,
                api_key_configured: config
                    .server
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            provider: SanitizedProviderConfig {
                base_url: config
                    .provider
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NULLBR_URL.to_string()),
                app_id_configured: !config.provider.app_id.is_empty(),
                api_key_configured: !config.provider.api_key.is_empty(),
                cookie_configured: config
                    .provider
                    .cookie
                    .as_ref()
                    .is_some_and(|c| !c.is_empty()),
                timeout_secs: config.provider.timeout_secs,
            },
            transfer: SanitizedTransferConfig {
                url: config.transfer.url.clone(),
                api_token_configured: !config.transfer.api_token.is_empty(),
                timeout_secs: config.transfer.timeout_secs,
            },
            downloader: config
                .downloader
                .as_ref()
                .map(|d| SanitizedDownloaderConfig {
                    url: d.url.clone(),
                    username: d.username.clone(),
                    password_configured: !d.password.is_empty(),
                    timeout_secs: d.timeout_secs,
                }),
            resolver: SanitizedResolverConfig {
                priority: config.resolver.normalized_priority(),
                enabled: ResourceKind::ALL
                    .into_iter()
                    .filter(|k| enabled.contains(k))
                    .collect(),
            },
            dispatch: config.dispatch.clone(),
            session: config.session.clone(),
        }
    }
}
