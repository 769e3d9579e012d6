//! Match results from the comparison service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ImageRecord;

/// One match as returned by the external model
///
/// Field names follow the response schema sent to the model. The score is
/// not range-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// Candidate identifier as echoed by the model
    pub id: String,
    /// Similarity, nominally 0-100
    pub similarity_score: f64,
    /// Short rationale
    pub reason: String,
}

/// A match joined with its candidate record, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    pub id: Uuid,
    pub name: String,
    pub view_url: String,
    pub similarity_score: f64,
    pub reason: String,
}

impl RankedMatch {
    pub fn new(result: MatchResult, candidate: &ImageRecord) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name.clone(),
            view_url: candidate.view_url.clone(),
            similarity_score: result.similarity_score,
            reason: result.reason,
        }
    }
}

/// Sort by descending similarity score
///
/// `sort_by` is stable, so equal scores keep their arrival order. NaN scores
/// compare as equal to everything.
pub fn rank_matches(matches: &mut [RankedMatch]) {
    matches.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
