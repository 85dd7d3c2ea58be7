pub mod config;
pub mod dispatcher;
pub mod downloader;
pub mod media;
pub mod metrics;
pub mod provider;
pub mod resolver;
pub mod service;
pub mod session;
pub mod testing;
pub mod tracker;
pub mod transfer;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use dispatcher::{DispatchResult, DownloadDispatcher, DownloadMode};
pub use downloader::{MagnetDownloader, QBittorrentDownloader};
pub use media::{
    InvalidResourceKind, MediaItem, MediaType, ResourceBundle, ResourceEntry, ResourceKind,
};
pub use provider::{NullbrClient, ProviderError, SearchProvider};
pub use resolver::{ResolveError, ResourceResolver};
pub use service::{DownloadOptions, DownloadOutcome, MediaService, Selection, ServiceError};
pub use session::{SearchSession, SessionCache, SessionError};
pub use tracker::{CompletionDiff, CompletionTracker, CompletionWatcher};
pub use transfer::{CloudDrive2Client, Job, JobStatus, TransferBackend, TransferError};
