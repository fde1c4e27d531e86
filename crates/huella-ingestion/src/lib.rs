//! Submission ingestion pipeline.
//!
//! Wires the image codec, moderation cascade, text validation, storage
//! uploader and repository into one coordinator, plus the fire-and-forget
//! notification queue for submissions held in review.

pub mod coordinator;
pub mod notify;

pub use coordinator::{IngestionCoordinator, SubmissionError};
pub use notify::{EmailNotifier, NotificationQueue, PendingSubmissionNotice};
