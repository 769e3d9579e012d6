//! pixmatch-scan - Visual similarity search service
//!
//! Serves the search page and REST + SSE API. A scan sends the reference
//! image and batches of candidates to an external multimodal model and
//! ranks the returned similarity scores.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixmatch_common::config::{default_config_path, load_toml_config};
use pixmatch_common::events::EventBus;
use pixmatch_scan::config::{CliArgs, ServiceSettings, CONFIG_FILE_NAME};
use pixmatch_scan::services::GeminiComparator;
use pixmatch_scan::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Config file is read before logging starts so its level can seed the filter
    let config_path = args
        .config
        .clone()
        .or_else(|| default_config_path(CONFIG_FILE_NAME));
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => None,
    };

    let log_level = toml_config
        .as_ref()
        .and_then(|c| c.logging.level.clone())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "pixmatch_scan={level},pixmatch_common={level},tower_http={level}",
                    level = log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting pixmatch-scan v{} [{}]",
        env!("CARGO_PKG_VERSION"),
        env!("PIXMATCH_GIT_HASH")
    );
    match (&config_path, &toml_config) {
        (Some(path), Some(_)) => info!("Config file: {}", path.display()),
        (Some(path), None) => info!("No config file at {}, using defaults", path.display()),
        (None, _) => warn!("No config directory available, using defaults"),
    }

    let settings = ServiceSettings::resolve(&args, toml_config.as_ref())
        .context("Invalid configuration")?;
    info!(
        batch_size = settings.scan.batch_size,
        max_library_size = settings.scan.max_library_size,
        model = %settings.comparison.model,
        "Settings resolved"
    );

    let comparator = GeminiComparator::new(settings.comparison.clone())
        .context("Failed to initialize comparison client")?;

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(100);

    let state = AppState::new(Arc::new(comparator), event_bus, settings.scan.clone());
    let app = pixmatch_scan::build_router(state);

    let bind_address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
