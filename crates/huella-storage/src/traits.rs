//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait
/// so the uploader can work against any backend without coupling to
/// implementation details. Backends store and delete by key; public URL
/// construction belongs to the uploader, which owns the base URL.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `storage_key`, overwriting any existing object.
    async fn put(&self, storage_key: &str, data: Vec<u8>, content_type: &str)
        -> StorageResult<()>;

    /// Delete the object at `storage_key`. Deleting a missing object is
    /// not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check whether an object exists at `storage_key`.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Delete a full-size/thumbnail pair, best-effort. Failures are
    /// logged and swallowed; used by out-of-band cleanup where a missed
    /// delete only leaves an orphaned object.
    async fn delete_pair(&self, image_key: &str, thumbnail_key: &str) {
        for key in [image_key, thumbnail_key] {
            if let Err(e) = self.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Cleanup delete failed, object orphaned");
            }
        }
    }
}
