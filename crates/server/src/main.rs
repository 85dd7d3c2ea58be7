use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nullfetch_core::{
    load_config, validate_config, CloudDrive2Client, MagnetDownloader, MediaService,
    NullbrClient, QBittorrentDownloader, SearchProvider, TransferBackend,
};
use nullfetch_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("NULLFETCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!(version = VERSION, "Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!(
        mode = %config.dispatch.mode,
        destination = %config.dispatch.destination,
        priority = ?config.resolver.normalized_priority(),
        "Configuration loaded successfully"
    );

    let provider: Arc<dyn SearchProvider> = Arc::new(
        NullbrClient::new(config.provider.clone()).context("Failed to create search provider")?,
    );
    info!("Using search provider: {}", provider.name());

    let transfer: Arc<dyn TransferBackend> = Arc::new(
        CloudDrive2Client::new(config.transfer.clone())
            .context("Failed to create transfer backend")?,
    );
    info!("Using transfer backend {} at {}", transfer.name(), config.transfer.url);

    let downloader: Option<Arc<dyn MagnetDownloader>> = match &config.downloader {
        Some(downloader_config) => {
            info!("Initializing qBittorrent downloader at {}", downloader_config.url);
            let downloader = QBittorrentDownloader::new(downloader_config.clone())
                .context("Failed to create external downloader")?;
            Some(Arc::new(downloader))
        }
        None => {
            info!("No external downloader configured");
            None
        }
    };

    let service = Arc::new(MediaService::new(provider, transfer, downloader, &config));

    // Expired sessions are refused on read; this only reclaims memory
    let purge_handle = {
        let service = Arc::clone(&service);
        let period = Duration::from_secs(config.session.ttl_secs.max(60));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let purged = service.sessions().purge_expired().await;
                if purged > 0 {
                    debug!(purged, "Purged expired sessions");
                }
            }
        })
    };

    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&service)));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    purge_handle.abort();
    service.shutdown().await;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
