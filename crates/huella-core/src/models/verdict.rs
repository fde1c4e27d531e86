//! Classification verdicts.
//!
//! A single tagged result type shared by the local heuristic, the remote
//! classifier and the text validator, so the moderation engine can
//! pattern-match uniformly instead of inspecting loosely-shaped results.

use serde::{Deserialize, Serialize};

/// What a classifier concluded about one piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictKind {
    /// Content is acceptable for publication.
    Valid,
    /// Content is flagged as inappropriate or suspicious.
    Invalid,
    /// The classifier could not produce a verdict (unconfigured, timeout,
    /// transport error). The caller decides the fallback policy.
    Unavailable,
}

/// Which classification stage produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictSource {
    LocalHeuristic,
    RemoteClassifier,
    TextValidator,
    Unconfigured,
}

impl VerdictSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictSource::LocalHeuristic => "local-heuristic",
            VerdictSource::RemoteClassifier => "remote-classifier",
            VerdictSource::TextValidator => "text-validator",
            VerdictSource::Unconfigured => "unconfigured",
        }
    }
}

/// Immutable per-item classification result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub kind: VerdictKind,
    pub reason: String,
    /// Certainty of the chosen verdict, in [0, 1].
    pub confidence: f32,
    pub source: VerdictSource,
}

impl ClassificationVerdict {
    pub fn valid(reason: impl Into<String>, confidence: f32, source: VerdictSource) -> Self {
        Self {
            kind: VerdictKind::Valid,
            reason: reason.into(),
            confidence,
            source,
        }
    }

    pub fn invalid(reason: impl Into<String>, confidence: f32, source: VerdictSource) -> Self {
        Self {
            kind: VerdictKind::Invalid,
            reason: reason.into(),
            confidence,
            source,
        }
    }

    pub fn unavailable(reason: impl Into<String>, source: VerdictSource) -> Self {
        Self {
            kind: VerdictKind::Unavailable,
            reason: reason.into(),
            confidence: 0.0,
            source,
        }
    }

    /// Fail-open verdict: content is treated as valid with zero confidence,
    /// the failure cause recorded as the reason.
    pub fn fail_open(reason: impl Into<String>, source: VerdictSource) -> Self {
        Self {
            kind: VerdictKind::Valid,
            reason: reason.into(),
            confidence: 0.0,
            source,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.kind == VerdictKind::Valid
    }

    pub fn is_invalid(&self) -> bool {
        self.kind == VerdictKind::Invalid
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind == VerdictKind::Unavailable
    }
}
