//! Search workspace: the single owner of all transient state
//!
//! Holds the reference image, the candidate library, the last ranked results,
//! the last error message and the scan status. Shared behind a tokio RwLock;
//! every method is synchronous so the lock is never held across an await.
//!
//! Discarding a record releases its view reference: `find_image` stops
//! resolving its ID.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ImageRecord, RankedMatch, ScanStatus};

/// Workspace handle shared between handlers and the scan task
pub type SharedWorkspace = Arc<RwLock<SearchWorkspace>>;

/// Rejected workspace operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("No reference image selected")]
    MissingReference,

    #[error("Candidate library is empty")]
    EmptyLibrary,
}

/// Everything a scan needs, captured when it starts
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub scan_id: Uuid,
    pub reference: Arc<ImageRecord>,
    pub candidates: Vec<Arc<ImageRecord>>,
}

#[derive(Debug, Default)]
pub struct SearchWorkspace {
    reference: Option<Arc<ImageRecord>>,
    library: Vec<Arc<ImageRecord>>,
    matches: Vec<RankedMatch>,
    status: ScanStatus,
    error: Option<String>,
    last_scan_id: Option<Uuid>,
}

impl SearchWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// New shared handle around an empty workspace
    pub fn shared() -> SharedWorkspace {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn reference(&self) -> Option<&Arc<ImageRecord>> {
        self.reference.as_ref()
    }

    pub fn library(&self) -> &[Arc<ImageRecord>] {
        &self.library
    }

    pub fn matches(&self) -> &[RankedMatch] {
        &self.matches
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn last_scan_id(&self) -> Option<Uuid> {
        self.last_scan_id
    }

    fn ensure_idle(&self) -> Result<(), WorkspaceError> {
        if self.status.is_scanning {
            Err(WorkspaceError::ScanInProgress)
        } else {
            Ok(())
        }
    }

    fn clear_results(&mut self) {
        self.matches.clear();
        self.error = None;
    }

    /// Replace the reference image; clears results and error
    pub fn set_reference(&mut self, record: ImageRecord) -> Result<Arc<ImageRecord>, WorkspaceError> {
        self.ensure_idle()?;
        let record = Arc::new(record);
        if let Some(old) = self.reference.replace(record.clone()) {
            tracing::debug!(image_id = %old.id, "Released previous reference view");
        }
        self.clear_results();
        Ok(record)
    }

    /// Replace the candidate library; clears results and error
    ///
    /// Returns the new library size.
    pub fn set_library(&mut self, records: Vec<ImageRecord>) -> Result<usize, WorkspaceError> {
        self.ensure_idle()?;
        let released = self.library.len();
        self.library = records.into_iter().map(Arc::new).collect();
        self.clear_results();
        tracing::debug!(released, count = self.library.len(), "Candidate library replaced");
        Ok(self.library.len())
    }

    /// Empty the candidate library
    ///
    /// Results are cleared too: they point at the released candidate views.
    pub fn clear_library(&mut self) -> Result<usize, WorkspaceError> {
        self.ensure_idle()?;
        let released = self.library.len();
        self.library.clear();
        self.matches.clear();
        tracing::debug!(released, "Candidate library cleared");
        Ok(released)
    }

    /// Discard reference, library, results, error and status
    pub fn reset(&mut self) -> Result<(), WorkspaceError> {
        self.ensure_idle()?;
        let released = self.library.len() + usize::from(self.reference.is_some());
        *self = Self::default();
        tracing::debug!(released, "Workspace reset");
        Ok(())
    }

    /// Look up an image by ID among the live records
    pub fn find_image(&self, id: Uuid) -> Option<Arc<ImageRecord>> {
        self.reference
            .iter()
            .chain(self.library.iter())
            .find(|r| r.id == id)
            .cloned()
    }

    /// Start a scan: validates preconditions, resets status and results
    pub fn begin_scan(&mut self) -> Result<ScanJob, WorkspaceError> {
        self.ensure_idle()?;
        let reference = self
            .reference
            .clone()
            .ok_or(WorkspaceError::MissingReference)?;
        if self.library.is_empty() {
            return Err(WorkspaceError::EmptyLibrary);
        }

        let scan_id = Uuid::new_v4();
        self.status = ScanStatus::started(self.library.len());
        self.clear_results();
        self.last_scan_id = Some(scan_id);

        Ok(ScanJob {
            scan_id,
            reference,
            candidates: self.library.clone(),
        })
    }

    /// Record cumulative progress; never moves backwards or past the total
    pub fn record_progress(&mut self, processed: usize) {
        let processed = processed.min(self.status.total);
        if processed > self.status.processed {
            self.status.processed = processed;
        }
    }

    /// Publish ranked results of a successful scan
    pub fn complete_scan(&mut self, matches: Vec<RankedMatch>) {
        self.matches = matches;
        self.error = None;
    }

    /// Publish a failed scan: no partial results, only the message
    pub fn fail_scan(&mut self, message: String) {
        self.matches.clear();
        self.error = Some(message);
    }

    /// Clear the scanning flag
    pub fn finish_scan(&mut self) {
        self.status.is_scanning = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EncodedImage;

    fn record(name: &str) -> ImageRecord {
        ImageRecord::new(
            name,
            EncodedImage {
                mime_type: "image/png".to_string(),
                data: "AAAA".to_string(),
            },
            0,
        )
    }

    fn ranked(score: f64) -> RankedMatch {
        RankedMatch {
            id: Uuid::new_v4(),
            name: "m".to_string(),
            view_url: String::new(),
            similarity_score: score,
            reason: String::new(),
        }
    }

    #[test]
    fn test_begin_scan_requires_reference_and_library() {
        let mut ws = SearchWorkspace::new();
        assert_eq!(ws.begin_scan().unwrap_err(), WorkspaceError::MissingReference);

        ws.set_reference(record("ref.png")).unwrap();
        assert_eq!(ws.begin_scan().unwrap_err(), WorkspaceError::EmptyLibrary);

        ws.set_library(vec![record("a.png"), record("b.png")]).unwrap();
        let job = ws.begin_scan().unwrap();
        assert_eq!(job.candidates.len(), 2);
        assert_eq!(ws.status(), ScanStatus::started(2));
        assert_eq!(ws.last_scan_id(), Some(job.scan_id));
    }

    #[test]
    fn test_no_reentry_or_mutation_while_scanning() {
        let mut ws = SearchWorkspace::new();
        ws.set_reference(record("ref.png")).unwrap();
        ws.set_library(vec![record("a.png")]).unwrap();
        ws.begin_scan().unwrap();

        assert_eq!(ws.begin_scan().unwrap_err(), WorkspaceError::ScanInProgress);
        assert_eq!(
            ws.set_reference(record("x.png")).unwrap_err(),
            WorkspaceError::ScanInProgress
        );
        assert_eq!(ws.clear_library().unwrap_err(), WorkspaceError::ScanInProgress);
        assert_eq!(ws.reset().unwrap_err(), WorkspaceError::ScanInProgress);

        ws.finish_scan();
        assert!(ws.begin_scan().is_ok());
    }

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let mut ws = SearchWorkspace::new();
        ws.set_reference(record("ref.png")).unwrap();
        ws.set_library((0..7).map(|i| record(&format!("{}.png", i))).collect())
            .unwrap();
        ws.begin_scan().unwrap();

        ws.record_progress(5);
        assert_eq!(ws.status().processed, 5);
        ws.record_progress(3);
        assert_eq!(ws.status().processed, 5);
        ws.record_progress(10);
        assert_eq!(ws.status().processed, 7);
    }

    #[test]
    fn test_new_reference_clears_results_and_error() {
        let mut ws = SearchWorkspace::new();
        ws.complete_scan(vec![ranked(90.0)]);
        ws.fail_scan("boom".to_string());
        assert_eq!(ws.error(), Some("boom"));

        ws.set_reference(record("ref.png")).unwrap();
        assert!(ws.matches().is_empty());
        assert!(ws.error().is_none());
    }

    #[test]
    fn test_fail_scan_discards_matches() {
        let mut ws = SearchWorkspace::new();
        ws.complete_scan(vec![ranked(90.0), ranked(10.0)]);
        ws.fail_scan("call failed".to_string());
        assert!(ws.matches().is_empty());
        assert_eq!(ws.error(), Some("call failed"));
    }

    #[test]
    fn test_released_views_stop_resolving() {
        let mut ws = SearchWorkspace::new();
        let reference = ws.set_reference(record("ref.png")).unwrap();
        ws.set_library(vec![record("a.png")]).unwrap();
        let candidate_id = ws.library()[0].id;

        assert!(ws.find_image(reference.id).is_some());
        assert!(ws.find_image(candidate_id).is_some());

        ws.clear_library().unwrap();
        assert!(ws.find_image(candidate_id).is_none());
        assert!(ws.find_image(reference.id).is_some());

        ws.reset().unwrap();
        assert!(ws.find_image(reference.id).is_none());
        assert!(ws.reference().is_none());
        assert_eq!(ws.status(), ScanStatus::default());
    }
}
