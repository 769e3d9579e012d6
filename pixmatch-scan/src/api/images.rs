//! Workspace endpoints: reference image, candidate library and image views
//!
//! Uploads are multipart forms. Every part with a file name is treated as a
//! file; optional text parts named `last_modified` (milliseconds since the
//! Unix epoch) are paired with the files by position.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pixmatch_common::events::PixmatchEvent;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{ImageSummary, RankedMatch, ScanStatus};
use crate::services::image_ingest::{self, IngestReport, UploadedFile};
use crate::AppState;

/// Multipart text field carrying a file's modification time
const LAST_MODIFIED_FIELD: &str = "last_modified";

/// Request body for POST /api/library/folder
#[derive(Debug, Deserialize)]
pub struct FolderRequest {
    /// Local folder to scan recursively for images
    pub path: PathBuf,
}

/// Response for POST /api/reference
#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub reference: ImageSummary,
}

/// Response for POST /api/library and POST /api/library/folder
#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    /// Images now in the library
    pub count: usize,
    /// Files skipped because they are not images
    pub skipped: usize,
    /// Images beyond the library limit were left out
    pub truncated: bool,
    pub images: Vec<ImageSummary>,
}

/// Response for DELETE /api/library
#[derive(Debug, Serialize)]
pub struct ClearLibraryResponse {
    /// Candidate views released
    pub released: usize,
}

/// Scan status as reported to the UI
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: ScanStatus,
    pub percentage: u8,
}

impl From<ScanStatus> for StatusResponse {
    fn from(status: ScanStatus) -> Self {
        Self {
            status,
            percentage: status.percentage(),
        }
    }
}

/// Response for GET /api/workspace
#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
    pub reference: Option<ImageSummary>,
    pub library: Vec<ImageSummary>,
    pub matches: Vec<RankedMatch>,
    pub status: StatusResponse,
    pub error: Option<String>,
}

/// GET /api/workspace
///
/// Snapshot of everything the UI renders.
pub async fn get_workspace(State(state): State<AppState>) -> Json<WorkspaceResponse> {
    let ws = state.workspace.read().await;
    Json(WorkspaceResponse {
        reference: ws.reference().map(|r| r.summary()),
        library: ws.library().iter().map(|r| r.summary()).collect(),
        matches: ws.matches().to_vec(),
        status: ws.status().into(),
        error: ws.error().map(str::to_string),
    })
}

/// POST /api/reference
///
/// Replaces the reference image with the first image in the upload.
/// Previous results and error are cleared.
pub async fn upload_reference(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ReferenceResponse>> {
    let files = read_uploads(multipart).await?;
    let report = ingest_on_blocking_pool(move || image_ingest::ingest_uploads(files, 1)).await?;

    let record = report
        .records
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::BadRequest("Upload contains no image file".to_string()))?;

    let record = state.workspace.write().await.set_reference(record)?;

    tracing::info!(image_id = %record.id, name = %record.name, "Reference image set");
    state.event_bus.emit_lossy(PixmatchEvent::ReferenceChanged {
        image_id: record.id,
        name: record.name.clone(),
        timestamp: chrono::Utc::now(),
    });

    Ok(Json(ReferenceResponse {
        reference: record.summary(),
    }))
}

/// POST /api/library
///
/// Replaces the candidate library with the uploaded images. Non-image files
/// are skipped; at most `max_library_size` images are kept.
pub async fn upload_library(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<LibraryResponse>> {
    let files = read_uploads(multipart).await?;
    let limit = state.scan_settings.max_library_size;
    let report = ingest_on_blocking_pool(move || image_ingest::ingest_uploads(files, limit)).await?;

    replace_library(&state, report).await.map(Json)
}

/// POST /api/library/folder
///
/// Replaces the candidate library with the images found under a local
/// folder (recursively, in path order).
pub async fn load_library_folder(
    State(state): State<AppState>,
    Json(request): Json<FolderRequest>,
) -> ApiResult<Json<LibraryResponse>> {
    let limit = state.scan_settings.max_library_size;
    let path = request.path;

    tracing::info!(folder = %path.display(), "Loading library from folder");
    let report =
        ingest_on_blocking_pool(move || image_ingest::ingest_folder(&path, limit)).await??;

    replace_library(&state, report).await.map(Json)
}

/// DELETE /api/library
pub async fn clear_library(State(state): State<AppState>) -> ApiResult<Json<ClearLibraryResponse>> {
    let released = state.workspace.write().await.clear_library()?;

    tracing::info!(released, "Candidate library cleared");
    state.event_bus.emit_lossy(PixmatchEvent::LibraryChanged {
        count: 0,
        timestamp: chrono::Utc::now(),
    });

    Ok(Json(ClearLibraryResponse { released }))
}

/// POST /api/reset
///
/// Discards reference, library, results, error and status.
pub async fn reset_workspace(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.workspace.write().await.reset()?;
    *state.last_error.write().await = None;

    tracing::info!("Workspace reset");
    state.event_bus.emit_lossy(PixmatchEvent::WorkspaceReset {
        timestamp: chrono::Utc::now(),
    });

    Ok(StatusCode::NO_CONTENT)
}

/// GET /images/:id
///
/// Serves the original bytes of a live reference or candidate image.
/// Released images are gone.
pub async fn view_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let record = state
        .workspace
        .read()
        .await
        .find_image(id)
        .ok_or_else(|| ApiError::NotFound(format!("Image {}", id)))?;

    let bytes = record
        .payload
        .decode()
        .map_err(|e| ApiError::Internal(format!("Stored image is not valid base64: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, record.payload.mime_type.clone()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        Body::from(bytes),
    )
        .into_response())
}

/// Build workspace and image routes
pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workspace", get(get_workspace))
        .route("/api/reference", post(upload_reference))
        .route("/api/library", post(upload_library).delete(clear_library))
        .route("/api/library/folder", post(load_library_folder))
        .route("/api/reset", post(reset_workspace))
        .route("/images/:id", get(view_image))
}

async fn replace_library(state: &AppState, report: IngestReport) -> ApiResult<LibraryResponse> {
    let IngestReport {
        records,
        skipped,
        truncated,
    } = report;
    let images: Vec<ImageSummary> = records.iter().map(|r| r.summary()).collect();

    let count = state.workspace.write().await.set_library(records)?;

    tracing::info!(count, skipped, truncated, "Candidate library replaced");
    state.event_bus.emit_lossy(PixmatchEvent::LibraryChanged {
        count,
        timestamp: chrono::Utc::now(),
    });

    Ok(LibraryResponse {
        count,
        skipped,
        truncated,
        images,
    })
}

/// Collect file parts and pair them with `last_modified` parts by position
async fn read_uploads(mut multipart: Multipart) -> ApiResult<Vec<UploadedFile>> {
    let mut files = Vec::new();
    let mut modified_times = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes = field.bytes().await?;
            files.push(UploadedFile {
                name: file_name,
                bytes: bytes.to_vec(),
                last_modified: None,
            });
        } else if field.name() == Some(LAST_MODIFIED_FIELD) {
            let text = field.text().await?;
            modified_times.push(text.trim().parse::<i64>().ok());
        }
    }

    for (file, modified) in files.iter_mut().zip(modified_times) {
        file.last_modified = modified;
    }

    tracing::debug!(files = files.len(), "Multipart upload received");
    Ok(files)
}

/// Base64 encoding and folder walks are CPU/IO bound; keep them off the runtime
async fn ingest_on_blocking_pool<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Ingestion task failed: {}", e)))
}
