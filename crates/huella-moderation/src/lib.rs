//! Content moderation for sighting submissions.
//!
//! The moderation cascade runs in two phases: the cheap in-process
//! skin-tone heuristic over every image, then the remote classifier only
//! over the images the heuristic flagged. The remote stage can veto local
//! false positives; when it is unreachable the pipeline degrades to the
//! local verdicts instead of blocking submissions.

pub mod hybrid;
pub mod remote;
pub mod text;
pub mod traits;

pub use hybrid::HybridModerationEngine;
pub use remote::RemoteClassifier;
pub use text::TextSemanticValidator;
pub use traits::{ImageClassifier, TextValidator};
