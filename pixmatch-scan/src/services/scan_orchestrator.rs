//! Batching scan orchestrator
//!
//! Drives one scan: partitions the candidates into fixed-size batches and
//! submits them one after another to the [`ImageComparator`], awaiting each
//! call before starting the next. Progress is written to the workspace and
//! broadcast after every batch.
//!
//! Outcome rules:
//! - success: all matches are joined with their candidate records, ranked by
//!   descending score and published
//! - any failed call: remaining batches are skipped, accumulated matches are
//!   discarded and only the error message is published
//! - either way the scanning flag is cleared last

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use pixmatch_common::events::{EventBus, PixmatchEvent};

use super::comparator::{ComparisonError, ImageComparator};
use super::workspace::{ScanJob, SharedWorkspace};
use crate::models::match_result::rank_matches;
use crate::models::scan_status::{percentage, processed_after};
use crate::models::{ImageRecord, RankedMatch};

/// How a scan ended
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed { match_count: usize },
    Failed { message: String },
}

/// Number of external calls needed for `total` candidates
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}

/// User-visible message for a failed scan
pub fn failure_message(error: &ComparisonError) -> String {
    format!("Comparison call failed: {}", error)
}

pub struct ScanOrchestrator {
    comparator: Arc<dyn ImageComparator>,
    event_bus: EventBus,
    batch_size: usize,
}

impl ScanOrchestrator {
    /// `batch_size` below 1 is raised to 1
    pub fn new(comparator: Arc<dyn ImageComparator>, event_bus: EventBus, batch_size: usize) -> Self {
        Self {
            comparator,
            event_bus,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run a scan started with [`SearchWorkspace::begin_scan`](super::SearchWorkspace::begin_scan)
    pub async fn execute_scan(&self, workspace: &SharedWorkspace, job: ScanJob) -> ScanOutcome {
        let started = Instant::now();
        let scan_id = job.scan_id;
        let total = job.candidates.len();

        tracing::info!(
            scan_id = %scan_id,
            total,
            batch_size = self.batch_size,
            batches = batch_count(total, self.batch_size),
            comparator = self.comparator.name(),
            "Scan started"
        );

        self.event_bus.emit_lossy(PixmatchEvent::ScanStarted {
            scan_id,
            total,
            batch_count: batch_count(total, self.batch_size),
            batch_size: self.batch_size,
            timestamp: chrono::Utc::now(),
        });

        let result = self.run_batches(workspace, &job).await;

        let mut ws = workspace.write().await;
        let outcome = match result {
            Ok(matches) => {
                let match_count = matches.len();
                ws.complete_scan(matches);

                tracing::info!(
                    scan_id = %scan_id,
                    total,
                    match_count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Scan completed"
                );
                self.event_bus.emit_lossy(PixmatchEvent::ScanCompleted {
                    scan_id,
                    total,
                    match_count,
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    timestamp: chrono::Utc::now(),
                });
                ScanOutcome::Completed { match_count }
            }
            Err(e) => {
                let message = failure_message(&e);
                ws.fail_scan(message.clone());

                let processed = ws.status().processed;
                tracing::error!(
                    scan_id = %scan_id,
                    processed,
                    total,
                    error = %e,
                    "Scan failed"
                );
                self.event_bus.emit_lossy(PixmatchEvent::ScanFailed {
                    scan_id,
                    processed,
                    total,
                    error: message.clone(),
                    timestamp: chrono::Utc::now(),
                });
                ScanOutcome::Failed { message }
            }
        };
        ws.finish_scan();
        outcome
    }

    async fn run_batches(
        &self,
        workspace: &SharedWorkspace,
        job: &ScanJob,
    ) -> Result<Vec<RankedMatch>, ComparisonError> {
        let total = job.candidates.len();
        let by_id: HashMap<Uuid, &Arc<ImageRecord>> =
            job.candidates.iter().map(|c| (c.id, c)).collect();

        let mut accumulated = Vec::new();

        for (index, batch) in job.candidates.chunks(self.batch_size).enumerate() {
            let batch_index = index + 1;
            tracing::debug!(
                scan_id = %job.scan_id,
                batch = batch_index,
                size = batch.len(),
                "Submitting batch"
            );

            let results = self
                .comparator
                .compare(&job.reference.payload, batch)
                .await
                .map_err(|e| {
                    tracing::warn!(scan_id = %job.scan_id, batch = batch_index, error = %e, "Batch failed");
                    e
                })?;

            for result in results {
                let candidate = Uuid::parse_str(result.id.trim())
                    .ok()
                    .and_then(|id| by_id.get(&id));
                match candidate {
                    Some(candidate) => accumulated.push(RankedMatch::new(result, candidate)),
                    None => tracing::debug!(
                        scan_id = %job.scan_id,
                        id = %result.id,
                        "Dropping match for unknown candidate"
                    ),
                }
            }

            let processed = processed_after(batch_index, self.batch_size, total);
            workspace.write().await.record_progress(processed);

            self.event_bus.emit_lossy(PixmatchEvent::ScanProgress {
                scan_id: job.scan_id,
                batch_index,
                processed,
                total,
                percentage: percentage(processed, total),
                matches_so_far: accumulated.len(),
                timestamp: chrono::Utc::now(),
            });
        }

        rank_matches(&mut accumulated);
        Ok(accumulated)
    }
}
