//! Types for media items and resource bundles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a resource kind string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid resource kind: {0}")]
pub struct InvalidResourceKind(pub String);

/// Kind of media a search hit describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Series,
}

impl MediaType {
    /// Path segment used by the provider API ("movie" or "tv").
    pub fn provider_key(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "tv",
        }
    }

    /// Parse the provider's `media_type` field.
    pub fn from_provider(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "movie" => Some(MediaType::Movie),
            "tv" | "series" => Some(MediaType::Series),
            _ => None,
        }
    }
}

/// A delivery mechanism for a media item.
///
/// Declaration order doubles as the default priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceKind {
    /// 115 cloud-storage share link.
    CloudStorage,
    /// Magnet URI.
    Magnet,
    /// ed2k link.
    Ed2k,
    /// Streaming (m3u8) URL.
    Stream,
}

impl ResourceKind {
    /// All kinds, in declaration order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::CloudStorage,
        ResourceKind::Magnet,
        ResourceKind::Ed2k,
        ResourceKind::Stream,
    ];

    /// Canonical name used in configuration and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::CloudStorage => "cloud_storage",
            ResourceKind::Magnet => "magnet",
            ResourceKind::Ed2k => "ed2k",
            ResourceKind::Stream => "stream",
        }
    }

    /// Key used by the provider API, both as URL segment and response field.
    pub fn provider_key(&self) -> &'static str {
        match self {
            ResourceKind::CloudStorage => "115",
            ResourceKind::Magnet => "magnet",
            ResourceKind::Ed2k => "ed2k",
            ResourceKind::Stream => "video",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = InvalidResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud_storage" | "115" | "cloud" => Ok(ResourceKind::CloudStorage),
            "magnet" => Ok(ResourceKind::Magnet),
            "ed2k" => Ok(ResourceKind::Ed2k),
            "stream" | "video" | "m3u8" => Ok(ResourceKind::Stream),
            _ => Err(InvalidResourceKind(s.to_string())),
        }
    }
}

impl TryFrom<String> for ResourceKind {
    type Error = InvalidResourceKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One search hit returned by the Search Provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub title: String,
    pub media_type: MediaType,
    /// Provider catalog id (TMDB id). Items without one cannot be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    /// Kinds the provider claims to have for this item.
    /// Independent of local enablement.
    #[serde(default)]
    pub availability: HashMap<ResourceKind, bool>,
}

impl MediaItem {
    /// Whether the provider flags `kind` as available for this item.
    pub fn is_available(&self, kind: ResourceKind) -> bool {
        self.availability.get(&kind).copied().unwrap_or(false)
    }

    /// Kinds flagged available, in declaration order.
    pub fn available_kinds(&self) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|k| self.is_available(*k))
            .collect()
    }
}

/// A concrete, downloadable resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceEntry {
    CloudStorage {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size_text: Option<String>,
        share_link: String,
        /// Empty when the provider did not supply one; the link itself
        /// may still carry a `password` query parameter.
        #[serde(default)]
        share_password: String,
    },
    Magnet {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resolution: Option<String>,
        #[serde(default)]
        has_subtitles: bool,
        magnet_uri: String,
    },
    Stream {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size_text: Option<String>,
        url: String,
    },
    Ed2k {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size_text: Option<String>,
        url: String,
    },
}

impl ResourceEntry {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceEntry::CloudStorage { .. } => ResourceKind::CloudStorage,
            ResourceEntry::Magnet { .. } => ResourceKind::Magnet,
            ResourceEntry::Stream { .. } => ResourceKind::Stream,
            ResourceEntry::Ed2k { .. } => ResourceKind::Ed2k,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ResourceEntry::CloudStorage { label, .. }
            | ResourceEntry::Magnet { label, .. }
            | ResourceEntry::Stream { label, .. }
            | ResourceEntry::Ed2k { label, .. } => label,
        }
    }

    /// The link a user or backend would act on.
    pub fn link(&self) -> &str {
        match self {
            ResourceEntry::CloudStorage { share_link, .. } => share_link,
            ResourceEntry::Magnet { magnet_uri, .. } => magnet_uri,
            ResourceEntry::Stream { url, .. } | ResourceEntry::Ed2k { url, .. } => url,
        }
    }
}

/// Entries of one kind fetched for one media item.
///
/// An empty bundle means the kind is unavailable despite the provider flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBundle {
    pub kind: ResourceKind,
    pub entries: Vec<ResourceEntry>,
}

impl ResourceBundle {
    pub fn new(kind: ResourceKind, entries: Vec<ResourceEntry>) -> Self {
        Self { kind, entries }
    }

    pub fn empty(kind: ResourceKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The entry a download defaults to.
    pub fn first(&self) -> Option<&ResourceEntry> {
        self.entries.first()
    }
}
