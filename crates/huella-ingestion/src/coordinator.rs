//! Ingestion coordinator.
//!
//! Drives one submission through the pipeline: validate, transform,
//! moderate, validate text, upload, persist, notify. Stages run in
//! sequence; within the transform, moderation and upload stages the
//! images of the batch are processed concurrently and re-associated by
//! their submission index.
//!
//! A moderation or text rejection does not abort the submission - the
//! post is persisted with `pending_approval` set and held out of public
//! listings. Only malformed input, storage failures and persistence
//! failures are terminal.

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;

use huella_core::models::{NewSighting, RawImage, SightingRecord, TransformedImage};
use huella_core::AppError;
use huella_db::SightingRepository;
use huella_moderation::{HybridModerationEngine, TextValidator};
use huella_processing::ImageCodec;
use huella_storage::{StorageError, StorageUploader};

use crate::notify::{NotificationQueue, PendingSubmissionNotice};

const MAX_DESCRIPTION_LEN: usize = 1000;

/// Terminal submission failures. Moderation rejections are not errors;
/// they surface as `pending_approval` on the persisted record.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("expected between 1 and {max} images, got {count}")]
    InvalidImageCount { count: usize, max: usize },

    #[error("image {index} rejected: {reason}")]
    InvalidImage { index: usize, reason: String },

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),

    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] AppError),
}

pub struct IngestionCoordinator {
    codec: ImageCodec,
    moderation: Arc<HybridModerationEngine>,
    text_validator: Arc<dyn TextValidator>,
    uploader: Arc<StorageUploader>,
    repository: Arc<dyn SightingRepository>,
    notifications: NotificationQueue,
    max_images: usize,
    min_text_validation_len: usize,
}

impl IngestionCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        codec: ImageCodec,
        moderation: Arc<HybridModerationEngine>,
        text_validator: Arc<dyn TextValidator>,
        uploader: Arc<StorageUploader>,
        repository: Arc<dyn SightingRepository>,
        notifications: NotificationQueue,
        max_images: usize,
        min_text_validation_len: usize,
    ) -> Self {
        Self {
            codec,
            moderation,
            text_validator,
            uploader,
            repository,
            notifications,
            max_images,
            min_text_validation_len,
        }
    }

    /// Run one submission end to end. On success the returned record is
    /// fully persisted; `pending_approval` tells the caller whether it is
    /// publicly visible.
    #[tracing::instrument(skip_all, fields(image_count = images.len()))]
    pub async fn submit(
        &self,
        sighting: NewSighting,
        images: Vec<RawImage>,
    ) -> Result<SightingRecord, SubmissionError> {
        self.validate_submission(&sighting, &images)?;

        let transformed = self.transform_images(images).await?;

        let outcome = self.moderation.evaluate_batch(&transformed).await;

        let text_verdict = if outcome.approved {
            match sighting.description.as_deref().map(str::trim) {
                Some(description)
                    if description.chars().count() >= self.min_text_validation_len =>
                {
                    Some(self.text_validator.validate(description).await)
                }
                _ => None,
            }
        } else {
            // Image moderation already decided; skip the text stage
            None
        };

        let (pending_approval, moderation_reason, validation_service) = if !outcome.approved {
            (
                true,
                Some(outcome.reason.clone()),
                Some(outcome.deciding_source.clone()),
            )
        } else if let Some(verdict) = text_verdict.as_ref().filter(|v| v.is_invalid()) {
            (
                true,
                Some(verdict.reason.clone()),
                Some(verdict.source.as_str().to_string()),
            )
        } else {
            (false, None, Some(outcome.deciding_source.clone()))
        };

        if pending_approval {
            tracing::info!(
                reason = moderation_reason.as_deref().unwrap_or(""),
                service = validation_service.as_deref().unwrap_or(""),
                "Submission held for review"
            );
        }

        let refs = self.uploader.upload_batch(&transformed).await?;

        let service_for_notice = validation_service.clone();
        let reason_for_notice = moderation_reason.clone();

        let record = self
            .repository
            .create_with_images(
                sighting,
                refs,
                pending_approval,
                moderation_reason,
                validation_service,
            )
            .await?;

        if record.pending_approval {
            self.notifications.enqueue(PendingSubmissionNotice {
                sighting_id: record.id,
                post_number: record.post_number,
                reason: reason_for_notice.unwrap_or_default(),
                service: service_for_notice.unwrap_or_default(),
            });
        }

        tracing::info!(
            sighting_id = %record.id,
            post_number = record.post_number,
            pending_approval = record.pending_approval,
            "Submission complete"
        );

        Ok(record)
    }

    fn validate_submission(
        &self,
        sighting: &NewSighting,
        images: &[RawImage],
    ) -> Result<(), SubmissionError> {
        if images.is_empty() || images.len() > self.max_images {
            return Err(SubmissionError::InvalidImageCount {
                count: images.len(),
                max: self.max_images,
            });
        }

        if !(-90.0..=90.0).contains(&sighting.latitude) {
            return Err(SubmissionError::InvalidSubmission(format!(
                "latitude {} out of range",
                sighting.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&sighting.longitude) {
            return Err(SubmissionError::InvalidSubmission(format!(
                "longitude {} out of range",
                sighting.longitude
            )));
        }

        if let Some(ref description) = sighting.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(SubmissionError::InvalidSubmission(format!(
                    "description exceeds {} characters",
                    MAX_DESCRIPTION_LEN
                )));
            }
        }

        Ok(())
    }

    /// Decode and normalize all images concurrently on the blocking pool.
    /// Results come back in submission order; the first bad image fails
    /// the submission, naming its index.
    async fn transform_images(
        &self,
        images: Vec<RawImage>,
    ) -> Result<Vec<TransformedImage>, SubmissionError> {
        let tasks = images.into_iter().map(|raw| {
            let codec = self.codec.clone();
            tokio::task::spawn_blocking(move || codec.transform(&raw.data))
        });

        // join_all preserves input order
        let results = join_all(tasks).await;

        let mut transformed = Vec::with_capacity(results.len());
        for (index, joined) in results.into_iter().enumerate() {
            let result = joined.map_err(|e| SubmissionError::InvalidImage {
                index,
                reason: format!("processing task failed: {}", e),
            })?;
            let image = result.map_err(|e| SubmissionError::InvalidImage {
                index,
                reason: e.to_string(),
            })?;
            transformed.push(image);
        }

        Ok(transformed)
    }
}
