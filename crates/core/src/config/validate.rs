use super::{types::Config, ConfigError};
use crate::dispatcher::DownloadMode;
use crate::session::MAX_SESSION_TTL_SECS;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Provider app id and transfer url are set
/// - Session TTL and all client timeouts are positive, TTL at most one year
/// - Dispatch destination is not empty
/// - External downloader mode has a `[downloader]` section
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.provider.app_id.trim().is_empty() {
        return Err(invalid("provider.app_id is required"));
    }
    if config.provider.timeout_secs == 0 {
        return Err(invalid("provider.timeout_secs must be greater than 0"));
    }

    if config.transfer.url.trim().is_empty() {
        return Err(invalid("transfer.url is required"));
    }
    if config.transfer.timeout_secs == 0 {
        return Err(invalid("transfer.timeout_secs must be greater than 0"));
    }

    if let Some(downloader) = &config.downloader {
        if downloader.url.trim().is_empty() {
            return Err(invalid("downloader.url is required"));
        }
        if downloader.timeout_secs == 0 {
            return Err(invalid("downloader.timeout_secs must be greater than 0"));
        }
    }

    if config.session.ttl_secs == 0 {
        return Err(invalid("session.ttl_secs must be greater than 0"));
    }
    if config.session.ttl_secs > MAX_SESSION_TTL_SECS {
        return Err(invalid(&format!(
            "session.ttl_secs must be at most {}",
            MAX_SESSION_TTL_SECS
        )));
    }

    if config.dispatch.destination.trim().is_empty() {
        return Err(invalid("dispatch.destination cannot be empty"));
    }
    if config.dispatch.mode == DownloadMode::ExternalDownloader && config.downloader.is_none() {
        return Err(invalid(
            "dispatch.mode = \"external_downloader\" requires a [downloader] section",
        ));
    }

    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
