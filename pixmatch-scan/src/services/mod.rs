//! Services for pixmatch-scan
//!
//! Ingestion, workspace state, the comparison boundary and the batching
//! orchestrator.

pub mod comparator;
pub mod gemini_client;
pub mod image_ingest;
pub mod scan_orchestrator;
pub mod workspace;

pub use comparator::{ComparisonError, ImageComparator};
pub use gemini_client::GeminiComparator;
pub use image_ingest::{IngestReport, UploadedFile};
pub use scan_orchestrator::{ScanOrchestrator, ScanOutcome};
pub use workspace::{ScanJob, SearchWorkspace, SharedWorkspace, WorkspaceError};
