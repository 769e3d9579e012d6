//! Data models for pixmatch-scan
//!
//! - Image records produced by ingestion
//! - Match results returned by the comparison service
//! - Transient scan status

pub mod image_record;
pub mod match_result;
pub mod scan_status;

pub use image_record::{EncodedImage, ImageRecord, ImageSummary};
pub use match_result::{MatchResult, RankedMatch};
pub use scan_status::ScanStatus;
