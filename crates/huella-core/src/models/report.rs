//! Report reasons at the persistence boundary.
//!
//! The reason set has grown over the life of the system, so it is modeled
//! as an open enumeration: unknown values round-trip through `Other`
//! instead of failing to parse.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportReason {
    Spam,
    Inappropriate,
    Duplicate,
    /// The animal was already found or reunited.
    Found,
    Other(String),
}

impl ReportReason {
    pub fn as_str(&self) -> &str {
        match self {
            ReportReason::Spam => "spam",
            ReportReason::Inappropriate => "inappropriate",
            ReportReason::Duplicate => "duplicate",
            ReportReason::Found => "found",
            ReportReason::Other(s) => s,
        }
    }
}

impl From<String> for ReportReason {
    fn from(s: String) -> Self {
        match s.as_str() {
            "spam" => ReportReason::Spam,
            "inappropriate" => ReportReason::Inappropriate,
            "duplicate" => ReportReason::Duplicate,
            "found" => ReportReason::Found,
            _ => ReportReason::Other(s),
        }
    }
}

impl From<ReportReason> for String {
    fn from(reason: ReportReason) -> Self {
        reason.as_str().to_string()
    }
}
