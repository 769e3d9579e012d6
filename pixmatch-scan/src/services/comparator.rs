//! Comparison service boundary
//!
//! The orchestrator only knows this trait. Production uses
//! [`GeminiComparator`](super::GeminiComparator); tests supply fakes.

use std::sync::Arc;
use thiserror::Error;

use crate::models::{EncodedImage, ImageRecord, MatchResult};

/// Failure of a comparison call itself
///
/// Every variant aborts the scan. A response that arrives but cannot be
/// parsed is not an error; it yields zero matches.
#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Comparison service API key not configured")]
    MissingApiKey,

    #[error("Comparison service rejected the API key")]
    InvalidApiKey,

    #[error("Comparison service error {0}: {1}")]
    Api(u16, String),
}

/// External multimodal comparison
#[async_trait::async_trait]
pub trait ImageComparator: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Compare one batch of candidates against the reference
    ///
    /// Returns matches judged similar above the service's threshold, possibly
    /// none. Returned IDs are not guaranteed to belong to `candidates`.
    async fn compare(
        &self,
        reference: &EncodedImage,
        candidates: &[Arc<ImageRecord>],
    ) -> Result<Vec<MatchResult>, ComparisonError>;
}
