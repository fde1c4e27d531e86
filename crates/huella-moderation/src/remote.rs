//! Remote classifier client.
//!
//! The slower, more precise moderation stage: an externally hosted
//! labeling model reached over HTTP. Every failure path (unconfigured,
//! timeout, transport error, non-success status, malformed body) resolves
//! to an `Unavailable` verdict so the engine can decide fallback policy;
//! this client never surfaces an error to the caller.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

use huella_core::models::{ClassificationVerdict, VerdictSource};

use crate::traits::ImageClassifier;

/// Labels counted as inappropriate content. A prediction only matters
/// when its label contains one of these terms and its score clears the
/// configured threshold.
const FLAGGED_LABELS: &[&str] = &[
    "bikini",
    "swimsuit",
    "underwear",
    "brassiere",
    "miniskirt",
    "abaya",
    "academic_gown",
];

#[derive(Debug, Serialize, Deserialize)]
struct Prediction {
    #[serde(default)]
    label: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    result: Vec<Prediction>,
}

/// HTTP client for the remote classification endpoint. Configuration-only
/// after construction; shared across concurrent submissions.
pub struct RemoteClassifier {
    http_client: reqwest::Client,
    endpoint: Option<String>,
    api_token: Option<String>,
    timeout: Duration,
    score_threshold: f32,
}

impl RemoteClassifier {
    pub fn new(
        endpoint: Option<String>,
        api_token: Option<String>,
        timeout: Duration,
        score_threshold: f32,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint,
            api_token,
            timeout,
            score_threshold,
        }
    }

    pub fn from_config(config: &huella_core::Config) -> Self {
        Self::new(
            config.classifier_endpoint.clone(),
            config.classifier_api_token.clone(),
            Duration::from_secs(config.classifier_timeout_secs),
            config.classifier_score_threshold,
        )
    }

    async fn call(&self, endpoint: &str, token: &str, image: &[u8]) -> Result<ClassificationVerdict, String> {
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(image);

        let response = self
            .http_client
            .post(endpoint)
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&json!({ "image": image_b64 }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("classifier timeout after {:?}", self.timeout)
                } else {
                    format!("classifier request error: {}", e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("classifier returned status {}", status));
        }

        let parsed: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| format!("malformed classifier response: {}", e))?;

        Ok(verdict_from_predictions(&parsed.result, self.score_threshold))
    }
}

/// Map labeled predictions to a verdict: any flagged label whose score
/// exceeds the threshold makes the verdict invalid, carrying the maximum
/// such score as confidence; otherwise valid with `1 - max_score`.
fn verdict_from_predictions(predictions: &[Prediction], threshold: f32) -> ClassificationVerdict {
    let mut max_score = 0.0f32;
    let mut detected_label: Option<&str> = None;

    for prediction in predictions {
        let label = prediction.label.to_lowercase();
        if FLAGGED_LABELS.iter().any(|term| label.contains(term)) && prediction.score > max_score {
            max_score = prediction.score;
            detected_label = Some(&prediction.label);
        }
    }

    if max_score > threshold {
        ClassificationVerdict::invalid(
            format!(
                "inappropriate content detected: {}",
                detected_label.unwrap_or("unknown")
            ),
            max_score,
            VerdictSource::RemoteClassifier,
        )
    } else {
        ClassificationVerdict::valid(
            "no inappropriate content detected",
            1.0 - max_score,
            VerdictSource::RemoteClassifier,
        )
    }
}

#[async_trait::async_trait]
impl ImageClassifier for RemoteClassifier {
    fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.api_token.is_some()
    }

    async fn classify(&self, image: &[u8]) -> ClassificationVerdict {
        let (endpoint, token) = match (&self.endpoint, &self.api_token) {
            (Some(endpoint), Some(token)) => (endpoint.clone(), token.clone()),
            _ => {
                return ClassificationVerdict::unavailable(
                    "remote classifier not configured",
                    VerdictSource::Unconfigured,
                );
            }
        };

        match self.call(&endpoint, &token, image).await {
            Ok(verdict) => verdict,
            Err(reason) => {
                tracing::warn!(reason = %reason, "Remote classification unavailable");
                ClassificationVerdict::unavailable(reason, VerdictSource::RemoteClassifier)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huella_core::models::VerdictKind;

    fn prediction(label: &str, score: f32) -> Prediction {
        Prediction {
            label: label.to_string(),
            score,
        }
    }

    #[test]
    fn test_flagged_label_above_threshold_is_invalid() {
        let predictions = vec![prediction("bikini", 0.92), prediction("dog", 0.99)];
        let verdict = verdict_from_predictions(&predictions, 0.70);
        assert_eq!(verdict.kind, VerdictKind::Invalid);
        assert!((verdict.confidence - 0.92).abs() < 1e-6);
        assert!(verdict.reason.contains("bikini"));
    }

    #[test]
    fn test_flagged_label_below_threshold_is_valid() {
        let predictions = vec![prediction("swimsuit", 0.4)];
        let verdict = verdict_from_predictions(&predictions, 0.70);
        assert_eq!(verdict.kind, VerdictKind::Valid);
        assert!((verdict.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_unflagged_labels_are_valid_with_full_confidence() {
        let predictions = vec![prediction("golden retriever", 0.99)];
        let verdict = verdict_from_predictions(&predictions, 0.70);
        assert_eq!(verdict.kind, VerdictKind::Valid);
        assert!((verdict.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_highest_flagged_score_wins() {
        let predictions = vec![prediction("underwear", 0.75), prediction("brassiere", 0.85)];
        let verdict = verdict_from_predictions(&predictions, 0.70);
        assert_eq!(verdict.kind, VerdictKind::Invalid);
        assert!((verdict.confidence - 0.85).abs() < 1e-6);
        assert!(verdict.reason.contains("brassiere"));
    }

    #[tokio::test]
    async fn test_unconfigured_resolves_to_unavailable() {
        let classifier = RemoteClassifier::new(None, None, Duration::from_secs(15), 0.70);
        assert!(!classifier.is_configured());

        let verdict = classifier.classify(b"image bytes").await;
        assert_eq!(verdict.kind, VerdictKind::Unavailable);
        assert_eq!(verdict.source, VerdictSource::Unconfigured);
    }

    #[tokio::test]
    async fn test_transport_error_resolves_to_unavailable() {
        // Nothing listens on this port; connection is refused immediately
        let classifier = RemoteClassifier::new(
            Some("http://127.0.0.1:1/classify".to_string()),
            Some("token".to_string()),
            Duration::from_secs(2),
            0.70,
        );

        let verdict = classifier.classify(b"image bytes").await;
        assert_eq!(verdict.kind, VerdictKind::Unavailable);
        assert_eq!(verdict.source, VerdictSource::RemoteClassifier);
    }
}
