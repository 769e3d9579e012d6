//! Image ingestion
//!
//! Turns uploaded files or files from a local folder into [`ImageRecord`]s.
//! Content is sniffed with `infer`; anything that is not an image is skipped.
//! At most `limit` images are kept, in input order.

use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

use crate::models::{EncodedImage, ImageRecord};
use pixmatch_common::{Error, Result};

/// One file received from the browser
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Milliseconds since the Unix epoch, as reported by the browser
    pub last_modified: Option<i64>,
}

/// Outcome of ingesting a set of files
#[derive(Debug, Default)]
pub struct IngestReport {
    pub records: Vec<ImageRecord>,
    /// Files skipped because they are not images
    pub skipped: usize,
    /// Images beyond the limit were left out
    pub truncated: bool,
}

/// Ingest one file's bytes; `None` if it is not an image
pub fn ingest_bytes(name: &str, bytes: &[u8], last_modified: i64) -> Option<ImageRecord> {
    EncodedImage::from_bytes(bytes).map(|payload| ImageRecord::new(name, payload, last_modified))
}

/// Ingest browser uploads, keeping at most `limit` images
pub fn ingest_uploads(files: Vec<UploadedFile>, limit: usize) -> IngestReport {
    let mut report = IngestReport::default();

    for file in files {
        let last_modified = file.last_modified.unwrap_or_else(now_millis);
        match ingest_bytes(&file.name, &file.bytes, last_modified) {
            Some(record) => {
                if report.records.len() >= limit {
                    report.truncated = true;
                    break;
                }
                report.records.push(record);
            }
            None => {
                tracing::debug!(file = %file.name, "Skipping non-image upload");
                report.skipped += 1;
            }
        }
    }

    report
}

/// Ingest image files found under `root`, recursively, in path order
///
/// Blocking; call from `spawn_blocking`.
pub fn ingest_folder(root: &Path, limit: usize) -> Result<IngestReport> {
    if !root.exists() {
        return Err(Error::NotFound(format!(
            "Folder does not exist: {}",
            root.display()
        )));
    }
    if !root.is_dir() {
        return Err(Error::InvalidInput(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let mut report = IngestReport::default();

    let entries = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file());

    for entry in entries {
        let path = entry.path();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Failed to read file, skipping");
                report.skipped += 1;
                continue;
            }
        };

        let last_modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(system_time_millis)
            .unwrap_or_else(now_millis);

        let name = entry.file_name().to_string_lossy().to_string();
        match ingest_bytes(&name, &bytes, last_modified) {
            Some(record) => {
                if report.records.len() >= limit {
                    report.truncated = true;
                    break;
                }
                report.records.push(record);
            }
            None => report.skipped += 1,
        }
    }

    tracing::info!(
        folder = %root.display(),
        images = report.records.len(),
        skipped = report.skipped,
        truncated = report.truncated,
        "Folder ingested"
    );

    Ok(report)
}

fn system_time_millis(time: SystemTime) -> i64 {
    chrono::DateTime::<chrono::Utc>::from(time).timestamp_millis()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
