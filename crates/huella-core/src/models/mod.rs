//! Data model for the ingestion pipeline.

pub mod image;
pub mod moderation;
pub mod report;
pub mod sighting;
pub mod verdict;

pub use image::{RawImage, TransformedImage};
pub use moderation::ModerationOutcome;
pub use report::ReportReason;
pub use sighting::{
    AnimalSize, AnimalType, NewSighting, Sex, SightingImage, SightingRecord, UploadedImageRef,
};
pub use verdict::{ClassificationVerdict, VerdictKind, VerdictSource};
