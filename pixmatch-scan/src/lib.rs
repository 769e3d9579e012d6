//! pixmatch-scan library interface
//!
//! Exposes the router and application state for the binary and for
//! integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use pixmatch_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::config::ScanSettings;
use crate::services::{ImageComparator, ScanOrchestrator, SearchWorkspace, SharedWorkspace};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Reference, library, results and scan status
    pub workspace: SharedWorkspace,
    /// Batching orchestrator bound to the comparison service
    pub orchestrator: Arc<ScanOrchestrator>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Ingestion limits
    pub scan_settings: ScanSettings,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last scan error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        comparator: Arc<dyn ImageComparator>,
        event_bus: EventBus,
        scan_settings: ScanSettings,
    ) -> Self {
        let orchestrator = ScanOrchestrator::new(comparator, event_bus.clone(), scan_settings.batch_size);
        Self {
            workspace: SearchWorkspace::shared(),
            orchestrator: Arc::new(orchestrator),
            event_bus,
            scan_settings,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let body_limit = state.scan_settings.max_upload_bytes;

    Router::new()
        // UI routes (HTML page + image views)
        .merge(api::ui_routes())
        .merge(api::image_routes())
        // API routes
        .merge(api::scan_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
