//! Classifier abstraction trait
//!
//! Both moderation stages implement this trait so the hybrid engine can
//! drive them uniformly and tests can substitute counting stubs.

use async_trait::async_trait;

use huella_core::models::{ClassificationVerdict, VerdictSource};
use huella_processing::LocalHeuristicClassifier;

/// One classification stage over a single image.
///
/// Implementations never return an error: failure modes are expressed in
/// the verdict itself (`Unavailable` for the remote stage, fail-open
/// `Valid` for the local stage) so the caller owns the fallback policy.
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    /// Whether this stage can produce verdicts at all. An unconfigured
    /// stage is skipped for the whole batch rather than called per image.
    fn is_configured(&self) -> bool {
        true
    }

    async fn classify(&self, image: &[u8]) -> ClassificationVerdict;
}

/// Description validation seam; implemented by the semantic validator and
/// by test stubs.
#[async_trait]
pub trait TextValidator: Send + Sync {
    fn is_configured(&self) -> bool {
        true
    }

    async fn validate(&self, description: &str) -> ClassificationVerdict;
}

#[async_trait]
impl ImageClassifier for LocalHeuristicClassifier {
    async fn classify(&self, image: &[u8]) -> ClassificationVerdict {
        let classifier = self.clone();
        let data = image.to_vec();
        // Pixel analysis is CPU-bound; run off the async pool.
        match tokio::task::spawn_blocking(move || classifier.classify(&data)).await {
            Ok(verdict) => verdict,
            Err(e) => ClassificationVerdict::fail_open(
                format!("classification task failed: {}", e),
                VerdictSource::LocalHeuristic,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huella_core::models::VerdictKind;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    #[tokio::test]
    async fn test_local_classifier_through_trait() {
        let img = RgbImage::from_pixel(50, 50, Rgb([0, 0, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();

        let classifier = LocalHeuristicClassifier::new(300, 30.0, 50.0);
        assert!(ImageClassifier::is_configured(&classifier));

        let verdict = ImageClassifier::classify(&classifier, &buffer).await;
        assert_eq!(verdict.kind, VerdictKind::Valid);
        assert_eq!(verdict.source, VerdictSource::LocalHeuristic);
    }
}
