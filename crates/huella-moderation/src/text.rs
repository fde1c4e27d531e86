//! Text semantic validator.
//!
//! Asks a hosted language model whether a free-text description plausibly
//! describes an animal sighting. Advisory only: every failure mode and
//! every indeterminate answer resolves to a valid verdict, so a flaky or
//! unconfigured endpoint can never block a submission.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use huella_core::models::{ClassificationVerdict, VerdictSource};

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    result: CompletionResult,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionResult {
    #[serde(default)]
    response: String,
}

/// HTTP client for the text validation endpoint.
pub struct TextSemanticValidator {
    http_client: reqwest::Client,
    endpoint: Option<String>,
    api_token: Option<String>,
    timeout: Duration,
}

impl TextSemanticValidator {
    pub fn new(endpoint: Option<String>, api_token: Option<String>, timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint,
            api_token,
            timeout,
        }
    }

    pub fn from_config(config: &huella_core::Config) -> Self {
        Self::new(
            config.text_validator_endpoint.clone(),
            config.text_validator_api_token.clone(),
            Duration::from_secs(config.text_validator_timeout_secs),
        )
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.api_token.is_some()
    }

    /// Validate one description. Never returns an error; unreachable or
    /// indeterminate answers come back as fail-open valid verdicts.
    pub async fn validate(&self, description: &str) -> ClassificationVerdict {
        let (endpoint, token) = match (&self.endpoint, &self.api_token) {
            (Some(endpoint), Some(token)) => (endpoint.clone(), token.clone()),
            _ => {
                return ClassificationVerdict::fail_open(
                    "text validator not configured",
                    VerdictSource::Unconfigured,
                );
            }
        };

        match self.call(&endpoint, &token, description).await {
            Ok(answer) => verdict_from_answer(&answer),
            Err(reason) => {
                tracing::warn!(reason = %reason, "Text validation unavailable, approving by default");
                ClassificationVerdict::fail_open(reason, VerdictSource::TextValidator)
            }
        }
    }

    async fn call(&self, endpoint: &str, token: &str, description: &str) -> Result<String, String> {
        let prompt = format!(
            "Estás revisando la descripción de un reporte de avistamiento de \
             un animal perdido o encontrado. Responde con la única palabra \
             VALIDO si el texto describe plausiblemente un avistamiento, o \
             INVALIDO si es spam, abuso o contenido no relacionado. \
             Descripción: {}",
            description
        );

        let response = self
            .http_client
            .post(endpoint)
            .bearer_auth(token)
            .timeout(self.timeout)
            .json(&json!({
                "messages": [{ "role": "user", "content": prompt }],
                "max_tokens": 10,
                "temperature": 0.1,
            }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("text validator timeout after {:?}", self.timeout)
                } else {
                    format!("text validator request error: {}", e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("text validator returned status {}", status));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| format!("malformed text validator response: {}", e))?;

        Ok(parsed.result.response)
    }
}

#[async_trait::async_trait]
impl crate::traits::TextValidator for TextSemanticValidator {
    fn is_configured(&self) -> bool {
        TextSemanticValidator::is_configured(self)
    }

    async fn validate(&self, description: &str) -> ClassificationVerdict {
        TextSemanticValidator::validate(self, description).await
    }
}

/// Interpret the model's answer. INVALIDO anywhere in the reply rejects;
/// VALIDO without INVALIDO accepts (checked in that order, since INVALIDO
/// contains VALIDO as a substring); anything else counts as indeterminate
/// and passes.
fn verdict_from_answer(answer: &str) -> ClassificationVerdict {
    let normalized = answer.trim().to_uppercase();

    if normalized.contains("INVALIDO") {
        ClassificationVerdict::invalid(
            "description flagged as unrelated or inappropriate",
            0.8,
            VerdictSource::TextValidator,
        )
    } else if normalized.contains("VALIDO") {
        ClassificationVerdict::valid(
            "description accepted",
            0.8,
            VerdictSource::TextValidator,
        )
    } else {
        ClassificationVerdict::fail_open(
            format!("indeterminate validator answer: {}", answer.trim()),
            VerdictSource::TextValidator,
        )
    }
}
