//! Transient scan status

use serde::Serialize;

/// Progress of the current (or last) scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStatus {
    /// Candidates in the scan
    pub total: usize,
    /// Candidates submitted so far (cumulative, capped at `total`)
    pub processed: usize,
    pub is_scanning: bool,
}

impl ScanStatus {
    /// Status at the start of a scan over `total` candidates
    pub fn started(total: usize) -> Self {
        Self {
            total,
            processed: 0,
            is_scanning: true,
        }
    }

    /// Rounded completion percentage, 0 when there is nothing to scan
    pub fn percentage(&self) -> u8 {
        percentage(self.processed, self.total)
    }
}

/// `round(processed / total * 100)`, clamped to 0..=100
pub fn percentage(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Processed count after `batches_done` batches: `min(total, batches_done * batch_size)`
pub fn processed_after(batches_done: usize, batch_size: usize, total: usize) -> usize {
    batches_done.saturating_mul(batch_size).min(total)
}
