//! Configuration module
//!
//! Environment-driven configuration for the ingestion pipeline: image
//! limits, classifier endpoints and timeouts, storage and database
//! settings. Built once at startup and shared read-only across
//! concurrent submissions.

use std::env;

const MAX_IMAGES_PER_SUBMISSION: usize = 3;
const MAX_IMAGE_SIZE_MB: usize = 10;
const MAX_IMAGE_DIMENSION: u32 = 2000;
const THUMBNAIL_DIMENSION: u32 = 400;
const JPEG_QUALITY: u8 = 85;
const ANALYSIS_MAX_DIMENSION: u32 = 300;
const SKIN_REVIEW_THRESHOLD: f32 = 30.0;
const SKIN_HIGH_RISK_THRESHOLD: f32 = 50.0;
const CLASSIFIER_TIMEOUT_SECS: u64 = 15;
const CLASSIFIER_SCORE_THRESHOLD: f32 = 0.70;
const TEXT_VALIDATOR_TIMEOUT_SECS: u64 = 10;
const MIN_TEXT_VALIDATION_LEN: usize = 10;

/// Which storage backend to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

/// Application configuration (ingestion pipeline).
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub database_url: String,

    // Image limits
    pub max_images_per_submission: usize,
    pub max_image_size_bytes: usize,
    pub max_image_dimension: u32,
    pub thumbnail_dimension: u32,
    pub jpeg_quality: u8,

    // Local heuristic classifier
    pub analysis_max_dimension: u32,
    pub skin_review_threshold: f32,
    pub skin_high_risk_threshold: f32,

    // Remote classifier
    pub classifier_endpoint: Option<String>,
    pub classifier_api_token: Option<String>,
    pub classifier_timeout_secs: u64,
    pub classifier_score_threshold: f32,

    // Text semantic validator
    pub text_validator_endpoint: Option<String>,
    pub text_validator_api_token: Option<String>,
    pub text_validator_timeout_secs: u64,
    pub min_text_validation_len: usize,

    // Storage
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub public_base_url: Option<String>,

    // Notification delivery (best-effort)
    pub email_notifications_enabled: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub moderation_notify_to: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let max_image_size_mb = env::var("MAX_IMAGE_SIZE_MB")
            .unwrap_or_else(|_| MAX_IMAGE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_IMAGE_SIZE_MB);

        let storage_backend =
            match env::var("STORAGE_BACKEND").unwrap_or_default().to_lowercase().as_str() {
                "local" => StorageBackend::Local,
                _ => StorageBackend::S3,
            };

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            max_images_per_submission: env::var("MAX_IMAGES_PER_SUBMISSION")
                .unwrap_or_else(|_| MAX_IMAGES_PER_SUBMISSION.to_string())
                .parse()
                .unwrap_or(MAX_IMAGES_PER_SUBMISSION),
            max_image_size_bytes: max_image_size_mb * 1024 * 1024,
            max_image_dimension: env::var("MAX_IMAGE_DIMENSION")
                .unwrap_or_else(|_| MAX_IMAGE_DIMENSION.to_string())
                .parse()
                .unwrap_or(MAX_IMAGE_DIMENSION),
            thumbnail_dimension: env::var("THUMBNAIL_DIMENSION")
                .unwrap_or_else(|_| THUMBNAIL_DIMENSION.to_string())
                .parse()
                .unwrap_or(THUMBNAIL_DIMENSION),
            jpeg_quality: env::var("JPEG_QUALITY")
                .unwrap_or_else(|_| JPEG_QUALITY.to_string())
                .parse()
                .unwrap_or(JPEG_QUALITY),
            analysis_max_dimension: env::var("ANALYSIS_MAX_DIMENSION")
                .unwrap_or_else(|_| ANALYSIS_MAX_DIMENSION.to_string())
                .parse()
                .unwrap_or(ANALYSIS_MAX_DIMENSION),
            skin_review_threshold: env::var("SKIN_REVIEW_THRESHOLD")
                .unwrap_or_else(|_| SKIN_REVIEW_THRESHOLD.to_string())
                .parse()
                .unwrap_or(SKIN_REVIEW_THRESHOLD),
            skin_high_risk_threshold: env::var("SKIN_HIGH_RISK_THRESHOLD")
                .unwrap_or_else(|_| SKIN_HIGH_RISK_THRESHOLD.to_string())
                .parse()
                .unwrap_or(SKIN_HIGH_RISK_THRESHOLD),
            classifier_endpoint: env::var("CLASSIFIER_ENDPOINT").ok().filter(|s| !s.is_empty()),
            classifier_api_token: env::var("CLASSIFIER_API_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            classifier_timeout_secs: env::var("CLASSIFIER_TIMEOUT_SECS")
                .unwrap_or_else(|_| CLASSIFIER_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CLASSIFIER_TIMEOUT_SECS),
            classifier_score_threshold: env::var("CLASSIFIER_SCORE_THRESHOLD")
                .unwrap_or_else(|_| CLASSIFIER_SCORE_THRESHOLD.to_string())
                .parse()
                .unwrap_or(CLASSIFIER_SCORE_THRESHOLD),
            text_validator_endpoint: env::var("TEXT_VALIDATOR_ENDPOINT")
                .ok()
                .filter(|s| !s.is_empty()),
            text_validator_api_token: env::var("TEXT_VALIDATOR_API_TOKEN")
                .ok()
                .filter(|s| !s.is_empty()),
            text_validator_timeout_secs: env::var("TEXT_VALIDATOR_TIMEOUT_SECS")
                .unwrap_or_else(|_| TEXT_VALIDATOR_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(TEXT_VALIDATOR_TIMEOUT_SECS),
            min_text_validation_len: env::var("MIN_TEXT_VALIDATION_LEN")
                .unwrap_or_else(|_| MIN_TEXT_VALIDATION_LEN.to_string())
                .parse()
                .unwrap_or(MIN_TEXT_VALIDATION_LEN),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok().filter(|s| !s.is_empty()),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok()
                .filter(|s| !s.is_empty()),
            s3_endpoint: env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok().filter(|s| !s.is_empty()),
            public_base_url: env::var("PUBLIC_BASE_URL").ok().filter(|s| !s.is_empty()),
            email_notifications_enabled: env::var("EMAIL_NOTIFICATIONS_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            smtp_host: env::var("SMTP_HOST").ok().filter(|s| !s.is_empty()),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&p| p > 0),
            smtp_user: env::var("SMTP_USER").ok().filter(|s| !s.is_empty()),
            smtp_password: env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty()),
            smtp_from: env::var("SMTP_FROM").ok().filter(|s| !s.is_empty()),
            moderation_notify_to: env::var("MODERATION_NOTIFY_TO").ok().filter(|s| !s.is_empty()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    /// Whether the remote classifier has credentials and can be called.
    pub fn classifier_configured(&self) -> bool {
        self.classifier_endpoint.is_some() && self.classifier_api_token.is_some()
    }

    /// Whether the text validator has credentials and can be called.
    pub fn text_validator_configured(&self) -> bool {
        self.text_validator_endpoint.is_some() && self.text_validator_api_token.is_some()
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.max_images_per_submission == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGES_PER_SUBMISSION must be at least 1"));
        }

        if self.thumbnail_dimension > self.max_image_dimension {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_DIMENSION cannot exceed MAX_IMAGE_DIMENSION"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.email_notifications_enabled
            && (self.smtp_host.is_none() || self.smtp_from.is_none())
        {
            return Err(anyhow::anyhow!(
                "EMAIL_NOTIFICATIONS_ENABLED=true requires SMTP_HOST and SMTP_FROM to be set"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            environment: "test".to_string(),
            database_url: "postgresql://localhost/huella".to_string(),
            max_images_per_submission: 3,
            max_image_size_bytes: 10 * 1024 * 1024,
            max_image_dimension: 2000,
            thumbnail_dimension: 400,
            jpeg_quality: 85,
            analysis_max_dimension: 300,
            skin_review_threshold: 30.0,
            skin_high_risk_threshold: 50.0,
            classifier_endpoint: None,
            classifier_api_token: None,
            classifier_timeout_secs: 15,
            classifier_score_threshold: 0.70,
            text_validator_endpoint: None,
            text_validator_api_token: None,
            text_validator_timeout_secs: 10,
            min_text_validation_len: 10,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: Some("/tmp/huella".to_string()),
            public_base_url: Some("https://cdn.example.com".to_string()),
            email_notifications_enabled: false,
            smtp_host: None,
            smtp_port: None,
            smtp_user: None,
            smtp_password: None,
            smtp_from: None,
            moderation_notify_to: None,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_database_url() {
        let mut config = base_config();
        config.database_url = "mysql://localhost/huella".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_s3_requires_bucket_and_region() {
        let mut config = base_config();
        config.storage_backend = StorageBackend::S3;
        assert!(config.validate().is_err());

        config.s3_bucket = Some("huella-media".to_string());
        assert!(config.validate().is_err());

        config.s3_region = Some("us-east-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_email_requires_smtp() {
        let mut config = base_config();
        config.email_notifications_enabled = true;
        assert!(config.validate().is_err());

        config.smtp_host = Some("smtp.example.com".to_string());
        config.smtp_from = Some("noreply@example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_classifier_configured() {
        let mut config = base_config();
        assert!(!config.classifier_configured());

        config.classifier_endpoint = Some("https://api.example.com/classify".to_string());
        assert!(!config.classifier_configured());

        config.classifier_api_token = Some("token".to_string());
        assert!(config.classifier_configured());
    }
}
