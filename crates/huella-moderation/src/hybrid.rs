//! Hybrid moderation engine.
//!
//! Drives the two-phase cascade over a whole submission: the local
//! heuristic runs on every image, then the remote classifier runs only on
//! the images the heuristic flagged. A valid remote verdict clears a
//! local flag; an unavailable remote degrades that image back to its
//! local verdict. When the remote stage is unconfigured it is never
//! called at all.

use std::sync::Arc;

use futures::future::join_all;

use huella_core::models::{ClassificationVerdict, ModerationOutcome, TransformedImage, VerdictSource};

use crate::traits::ImageClassifier;

pub struct HybridModerationEngine {
    local: Arc<dyn ImageClassifier>,
    remote: Arc<dyn ImageClassifier>,
}

impl HybridModerationEngine {
    pub fn new(local: Arc<dyn ImageClassifier>, remote: Arc<dyn ImageClassifier>) -> Self {
        Self { local, remote }
    }

    /// Moderate one submission's images. Returns a single outcome for the
    /// batch; flagged indices refer to positions in `images`.
    #[tracing::instrument(skip_all, fields(image_count = images.len()))]
    pub async fn evaluate_batch(&self, images: &[TransformedImage]) -> ModerationOutcome {
        if images.is_empty() {
            return ModerationOutcome::approved(
                "no images to moderate",
                VerdictSource::LocalHeuristic.as_str(),
            );
        }

        // Phase 1: local heuristic over every image, concurrently.
        // join_all preserves input order.
        let local_verdicts: Vec<ClassificationVerdict> =
            join_all(images.iter().map(|img| self.local.classify(&img.full))).await;

        let flagged: Vec<usize> = local_verdicts
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_invalid())
            .map(|(i, _)| i)
            .collect();

        if flagged.is_empty() {
            return ModerationOutcome::approved(
                "all images passed heuristic screening",
                VerdictSource::LocalHeuristic.as_str(),
            );
        }

        tracing::info!(
            flagged = flagged.len(),
            total = images.len(),
            "Heuristic flagged images, escalating to remote classifier"
        );

        if !self.remote.is_configured() {
            let reason = flagged
                .iter()
                .map(|&i| format!("image {}: {}", i, local_verdicts[i].reason))
                .collect::<Vec<_>>()
                .join("; ");
            return ModerationOutcome::rejected(
                reason,
                VerdictSource::LocalHeuristic.as_str(),
                flagged,
            );
        }

        // Phase 2: remote classifier over flagged images only, concurrently.
        let remote_verdicts: Vec<ClassificationVerdict> = join_all(
            flagged
                .iter()
                .map(|&i| self.remote.classify(&images[i].full)),
        )
        .await;

        let remote_answered = remote_verdicts.iter().any(|v| !v.is_unavailable());

        let mut confirmed: Vec<(usize, ClassificationVerdict)> = Vec::new();
        for (&index, remote) in flagged.iter().zip(remote_verdicts) {
            match remote.kind {
                huella_core::models::VerdictKind::Valid => {
                    tracing::info!(index, "Remote classifier cleared heuristic flag");
                }
                huella_core::models::VerdictKind::Invalid => {
                    confirmed.push((index, remote));
                }
                huella_core::models::VerdictKind::Unavailable => {
                    // Degrade to the local verdict for this image.
                    tracing::warn!(
                        index,
                        reason = %remote.reason,
                        "Remote classifier unavailable, keeping heuristic verdict"
                    );
                    confirmed.push((index, local_verdicts[index].clone()));
                }
            }
        }

        if confirmed.is_empty() {
            return ModerationOutcome::approved(
                "remote classifier cleared all flagged images",
                VerdictSource::RemoteClassifier.as_str(),
            );
        }

        // Attribution follows the stage that actually decided: any remote
        // answer means phase 2 drove the outcome; local-heuristic only
        // when the remote was unreachable for every flagged image.
        let deciding_source = if remote_answered {
            VerdictSource::RemoteClassifier
        } else {
            VerdictSource::LocalHeuristic
        };

        let (_, first) = &confirmed[0];
        let reason = first.reason.clone();
        let indices = confirmed.into_iter().map(|(i, _)| i).collect();
        ModerationOutcome::rejected(reason, deciding_source.as_str(), indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    // Stub classifier keyed by the first byte of the image payload:
    // b'i' -> invalid, b'u' -> unavailable, anything else -> valid.
    // Counts calls so tests can assert escalation behavior.
    struct StubClassifier {
        source: VerdictSource,
        configured: bool,
        calls: AtomicUsize,
    }

    impl StubClassifier {
        fn new(source: VerdictSource) -> Arc<Self> {
            Arc::new(Self {
                source,
                configured: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn unconfigured(source: VerdictSource) -> Arc<Self> {
            Arc::new(Self {
                source,
                configured: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageClassifier for StubClassifier {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn classify(&self, image: &[u8]) -> ClassificationVerdict {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Second payload byte encodes an artificial delay so tests can
            // invert completion order
            if let Some(&delay) = image.get(1) {
                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay as u64 * 10)).await;
                }
            }
            match image.first() {
                Some(b'i') => ClassificationVerdict::invalid("stub flagged", 0.9, self.source),
                Some(b'u') => ClassificationVerdict::unavailable("stub down", self.source),
                _ => ClassificationVerdict::valid("stub passed", 0.9, self.source),
            }
        }
    }

    fn img(tag: u8) -> TransformedImage {
        img_with_delay(tag, 0)
    }

    fn img_with_delay(tag: u8, delay: u8) -> TransformedImage {
        TransformedImage {
            full: vec![tag, delay],
            thumbnail: vec![tag, delay],
            width: 100,
            height: 100,
        }
    }

    #[tokio::test]
    async fn test_clean_batch_never_calls_remote() {
        let local = StubClassifier::new(VerdictSource::LocalHeuristic);
        let remote = StubClassifier::new(VerdictSource::RemoteClassifier);
        let engine = HybridModerationEngine::new(local.clone(), remote.clone());

        let images = vec![img(b'v'), img(b'v'), img(b'v')];
        let outcome = engine.evaluate_batch(&images).await;

        assert!(outcome.approved);
        assert_eq!(local.call_count(), 3);
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_only_sees_flagged_images() {
        let local = StubClassifier::new(VerdictSource::LocalHeuristic);
        let remote = StubClassifier::new(VerdictSource::RemoteClassifier);
        let engine = HybridModerationEngine::new(local.clone(), remote.clone());

        // Remote stub says invalid for b'i' payloads, so the flag sticks.
        let images = vec![img(b'v'), img(b'i'), img(b'v')];
        let outcome = engine.evaluate_batch(&images).await;

        assert!(!outcome.approved);
        assert_eq!(outcome.flagged_indices, vec![1]);
        assert_eq!(outcome.deciding_source, "remote-classifier");
        assert_eq!(local.call_count(), 3);
        assert_eq!(remote.call_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_clears_local_false_positive() {
        let local = StubClassifier::new(VerdictSource::LocalHeuristic);
        // Remote treats everything as valid regardless of payload.
        struct AlwaysValid;
        #[async_trait]
        impl ImageClassifier for AlwaysValid {
            async fn classify(&self, _image: &[u8]) -> ClassificationVerdict {
                ClassificationVerdict::valid("clean", 0.95, VerdictSource::RemoteClassifier)
            }
        }
        let engine = HybridModerationEngine::new(local.clone(), Arc::new(AlwaysValid));

        let images = vec![img(b'i'), img(b'i')];
        let outcome = engine.evaluate_batch(&images).await;

        assert!(outcome.approved);
        assert_eq!(outcome.deciding_source, "remote-classifier");
        assert!(outcome.flagged_indices.is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_remote_degrades_to_local() {
        let local = StubClassifier::new(VerdictSource::LocalHeuristic);
        let remote = StubClassifier::unconfigured(VerdictSource::RemoteClassifier);
        let engine = HybridModerationEngine::new(local.clone(), remote.clone());

        let images = vec![img(b'i')];
        let outcome = engine.evaluate_batch(&images).await;

        assert!(!outcome.approved);
        assert_eq!(outcome.deciding_source, "local-heuristic");
        assert_eq!(outcome.flagged_indices, vec![0]);
        assert_eq!(remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_remote_reason_names_every_flagged_image() {
        let local = StubClassifier::new(VerdictSource::LocalHeuristic);
        let remote = StubClassifier::unconfigured(VerdictSource::RemoteClassifier);
        let engine = HybridModerationEngine::new(local, remote);

        let images = vec![img(b'i'), img(b'v'), img(b'i')];
        let outcome = engine.evaluate_batch(&images).await;

        assert!(!outcome.approved);
        assert_eq!(outcome.flagged_indices, vec![0, 2]);
        assert!(outcome.reason.contains("image 0:"));
        assert!(outcome.reason.contains("image 2:"));
        assert!(!outcome.reason.contains("image 1:"));
    }

    #[tokio::test]
    async fn test_unavailable_remote_keeps_local_verdict_per_image() {
        // Local flags everything; remote is reachable but answers
        // "unavailable" for b'u' and clears b'i'... here we want the
        // opposite: remote unavailable for one image, valid for another.
        struct PerImageRemote;
        #[async_trait]
        impl ImageClassifier for PerImageRemote {
            async fn classify(&self, image: &[u8]) -> ClassificationVerdict {
                match image.first() {
                    Some(b'u') => ClassificationVerdict::unavailable(
                        "timeout",
                        VerdictSource::RemoteClassifier,
                    ),
                    _ => ClassificationVerdict::valid(
                        "clean",
                        0.95,
                        VerdictSource::RemoteClassifier,
                    ),
                }
            }
        }

        struct AlwaysInvalidLocal;
        #[async_trait]
        impl ImageClassifier for AlwaysInvalidLocal {
            async fn classify(&self, _image: &[u8]) -> ClassificationVerdict {
                ClassificationVerdict::invalid(
                    "high skin-tone fraction",
                    0.7,
                    VerdictSource::LocalHeuristic,
                )
            }
        }

        let engine =
            HybridModerationEngine::new(Arc::new(AlwaysInvalidLocal), Arc::new(PerImageRemote));

        let images = vec![img(b'u'), img(b'v')];
        let outcome = engine.evaluate_batch(&images).await;

        // Image 0 degrades to the local rejection; image 1 is cleared.
        // The remote did answer for image 1, so it owns the attribution.
        assert!(!outcome.approved);
        assert_eq!(outcome.flagged_indices, vec![0]);
        assert_eq!(outcome.deciding_source, "remote-classifier");
        assert!(outcome.reason.contains("skin-tone"));
    }

    #[tokio::test]
    async fn test_mixed_confirmed_and_degraded_attributed_to_remote() {
        struct AlwaysInvalidLocal;
        #[async_trait]
        impl ImageClassifier for AlwaysInvalidLocal {
            async fn classify(&self, _image: &[u8]) -> ClassificationVerdict {
                ClassificationVerdict::invalid(
                    "high skin-tone fraction",
                    0.7,
                    VerdictSource::LocalHeuristic,
                )
            }
        }

        // Remote is unreachable for image 0 but confirms image 1.
        let remote = StubClassifier::new(VerdictSource::RemoteClassifier);
        let engine = HybridModerationEngine::new(Arc::new(AlwaysInvalidLocal), remote);

        let images = vec![img(b'u'), img(b'i')];
        let outcome = engine.evaluate_batch(&images).await;

        assert!(!outcome.approved);
        assert_eq!(outcome.flagged_indices, vec![0, 1]);
        assert_eq!(outcome.deciding_source, "remote-classifier");
    }

    #[tokio::test]
    async fn test_wholly_unavailable_remote_attributed_to_local() {
        struct AlwaysInvalidLocal;
        #[async_trait]
        impl ImageClassifier for AlwaysInvalidLocal {
            async fn classify(&self, _image: &[u8]) -> ClassificationVerdict {
                ClassificationVerdict::invalid(
                    "high skin-tone fraction",
                    0.7,
                    VerdictSource::LocalHeuristic,
                )
            }
        }
        struct AlwaysDownRemote;
        #[async_trait]
        impl ImageClassifier for AlwaysDownRemote {
            async fn classify(&self, _image: &[u8]) -> ClassificationVerdict {
                ClassificationVerdict::unavailable("timeout", VerdictSource::RemoteClassifier)
            }
        }

        let engine =
            HybridModerationEngine::new(Arc::new(AlwaysInvalidLocal), Arc::new(AlwaysDownRemote));

        let outcome = engine.evaluate_batch(&[img(b'v'), img(b'v')]).await;

        assert!(!outcome.approved);
        assert_eq!(outcome.flagged_indices, vec![0, 1]);
        assert_eq!(outcome.deciding_source, "local-heuristic");
    }

    #[tokio::test]
    async fn test_flagged_indices_keep_submission_order() {
        let local = StubClassifier::new(VerdictSource::LocalHeuristic);
        let remote = StubClassifier::new(VerdictSource::RemoteClassifier);
        let engine = HybridModerationEngine::new(local, remote);

        let images = vec![img(b'i'), img(b'v'), img(b'i')];
        let outcome = engine.evaluate_batch(&images).await;

        assert_eq!(outcome.flagged_indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_order_preserved_under_inverted_delays() {
        let local = StubClassifier::new(VerdictSource::LocalHeuristic);
        let remote = StubClassifier::unconfigured(VerdictSource::RemoteClassifier);
        let engine = HybridModerationEngine::new(local, remote);

        // Earlier images classify slower than later ones; flagged indices
        // must still come back in submission order.
        let images = vec![
            img_with_delay(b'i', 6),
            img_with_delay(b'v', 3),
            img_with_delay(b'i', 0),
        ];
        let outcome = engine.evaluate_batch(&images).await;

        assert!(!outcome.approved);
        assert_eq!(outcome.flagged_indices, vec![0, 2]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_approved() {
        let local = StubClassifier::new(VerdictSource::LocalHeuristic);
        let remote = StubClassifier::new(VerdictSource::RemoteClassifier);
        let engine = HybridModerationEngine::new(local, remote);

        let outcome = engine.evaluate_batch(&[]).await;
        assert!(outcome.approved);
    }
}
