//! Aggregate moderation outcome for a submission.

use serde::{Deserialize, Serialize};

/// One outcome per submission, computed by the moderation engine over the
/// whole image batch. Immutable once computed; its fields end up on the
/// persisted post as `moderation_reason` / `validation_service` /
/// `pending_approval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationOutcome {
    pub approved: bool,
    pub reason: String,
    /// Which stage's verdict determined the outcome ("local-heuristic",
    /// "remote-classifier", ...).
    pub deciding_source: String,
    /// Positions of images confirmed as flagged, in submission order.
    pub flagged_indices: Vec<usize>,
}

impl ModerationOutcome {
    pub fn approved(reason: impl Into<String>, deciding_source: impl Into<String>) -> Self {
        Self {
            approved: true,
            reason: reason.into(),
            deciding_source: deciding_source.into(),
            flagged_indices: Vec::new(),
        }
    }

    pub fn rejected(
        reason: impl Into<String>,
        deciding_source: impl Into<String>,
        flagged_indices: Vec<usize>,
    ) -> Self {
        Self {
            approved: false,
            reason: reason.into(),
            deciding_source: deciding_source.into(),
            flagged_indices,
        }
    }
}
