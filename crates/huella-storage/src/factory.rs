//! Storage backend construction from configuration.

use std::sync::Arc;

use huella_core::Config;

use crate::local::LocalStorage;
use crate::s3::S3Storage;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;

/// Build the configured storage backend.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not set".to_string()))?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not set".to_string())
            })?;
            let storage = S3Storage::new(bucket, region, config.s3_endpoint.clone())?;
            Ok(Arc::new(storage))
        }
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not set".to_string())
            })?;
            let storage = LocalStorage::new(base_path).await?;
            Ok(Arc::new(storage))
        }
    }
}

/// Resolve the public base URL that image keys are appended to.
///
/// An explicit `PUBLIC_BASE_URL` always wins (CDN in front of either
/// backend). Without it, an S3 backend can fall back to the provider URL:
/// path-style `{endpoint}/{bucket}` for S3-compatible providers, the
/// standard virtual-hosted form for AWS. A local backend has no derivable
/// URL, so `None` is returned and the uploader rejects the configuration.
pub fn resolve_public_base_url(config: &Config) -> Option<String> {
    if let Some(ref url) = config.public_base_url {
        return Some(url.clone());
    }

    match config.storage_backend {
        StorageBackend::S3 => {
            let bucket = config.s3_bucket.as_deref()?;
            if let Some(ref endpoint) = config.s3_endpoint {
                Some(format!("{}/{}", endpoint.trim_end_matches('/'), bucket))
            } else {
                let region = config.s3_region.as_deref()?;
                Some(format!("https://{}.s3.{}.amazonaws.com", bucket, region))
            }
        }
        StorageBackend::Local => None,
    }
}
