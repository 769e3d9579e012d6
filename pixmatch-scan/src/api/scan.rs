//! Scan endpoints
//!
//! A scan runs as a background task; the start request returns immediately
//! and progress is observed via `/api/scan/status` or the SSE stream.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::images::StatusResponse;
use crate::error::ApiResult;
use crate::models::RankedMatch;
use crate::services::scan_orchestrator::batch_count;
use crate::services::ScanOutcome;
use crate::AppState;

/// Response for POST /api/scan/start
#[derive(Debug, Serialize)]
pub struct StartScanResponse {
    pub scan_id: Uuid,
    /// Candidates in the scan
    pub total: usize,
    pub batch_size: usize,
    pub batch_count: usize,
}

/// Response for GET /api/scan/results
#[derive(Debug, Serialize)]
pub struct ScanResultsResponse {
    pub scan_id: Option<Uuid>,
    /// Ranked by descending similarity score
    pub matches: Vec<RankedMatch>,
    /// Message of the last failed scan
    pub error: Option<String>,
}

/// POST /api/scan/start
///
/// Requires a reference image and a non-empty library, and no scan in
/// progress (409 otherwise). Returns 202 with the scan ID.
pub async fn start_scan(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<StartScanResponse>)> {
    let job = state.workspace.write().await.begin_scan()?;

    let batch_size = state.orchestrator.batch_size();
    let response = StartScanResponse {
        scan_id: job.scan_id,
        total: job.candidates.len(),
        batch_size,
        batch_count: batch_count(job.candidates.len(), batch_size),
    };
    let scan_id = job.scan_id;

    // Runs in its own task so a panic inside the scan can still be reported
    // and the scanning flag cleared
    let scan_state = state.clone();
    let scan_task = tokio::spawn(async move {
        scan_state
            .orchestrator
            .execute_scan(&scan_state.workspace, job)
            .await
    });

    tokio::spawn(async move {
        tracing::info!(scan_id = %scan_id, "Background scan task started");

        let last_error = match scan_task.await {
            Ok(ScanOutcome::Completed { match_count }) => {
                tracing::info!(scan_id = %scan_id, match_count, "Background scan task completed");
                None
            }
            Ok(ScanOutcome::Failed { message }) => Some(message),
            Err(e) => {
                tracing::error!(scan_id = %scan_id, error = %e, "Background scan task aborted");
                let message = format!("Scan aborted unexpectedly: {}", e);
                let mut ws = state.workspace.write().await;
                ws.fail_scan(message.clone());
                ws.finish_scan();
                Some(message)
            }
        };

        if let Some(message) = last_error {
            *state.last_error.write().await = Some(message);
        }
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/scan/status
pub async fn get_scan_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.workspace.read().await.status().into())
}

/// GET /api/scan/results
pub async fn get_scan_results(State(state): State<AppState>) -> Json<ScanResultsResponse> {
    let ws = state.workspace.read().await;
    Json(ScanResultsResponse {
        scan_id: ws.last_scan_id(),
        matches: ws.matches().to_vec(),
        error: ws.error().map(str::to_string),
    })
}

/// Build scan routes
pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/scan/start", post(start_scan))
        .route("/api/scan/status", get(get_scan_status))
        .route("/api/scan/results", get(get_scan_results))
}
