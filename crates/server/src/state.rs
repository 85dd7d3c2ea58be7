use nullfetch_core::{Config, MediaService, SanitizedConfig};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<MediaService>,
}

impl AppState {
    pub fn new(config: Config, service: Arc<MediaService>) -> Self {
        Self { config, service }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &MediaService {
        self.service.as_ref()
    }

    /// Key required on protected routes, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.config
            .server
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
    }
}
