//! Ordered batch uploader.
//!
//! Pushes a submission's full-size/thumbnail pairs to storage
//! concurrently while preserving submission order in the returned URL
//! list. The first failed pair fails the whole batch; pairs already
//! stored by then are left orphaned for out-of-band cleanup via
//! `Storage::delete_pair`.

use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use huella_core::models::{TransformedImage, UploadedImageRef};

use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};

const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

pub struct StorageUploader {
    storage: Arc<dyn Storage>,
    base_url: String,
}

impl StorageUploader {
    /// A missing public base URL would silently produce broken image
    /// links on every persisted post, so it is rejected here instead of
    /// at upload time.
    pub fn new(storage: Arc<dyn Storage>, public_base_url: Option<String>) -> StorageResult<Self> {
        let base_url = public_base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                StorageError::ConfigError(
                    "public base URL required to construct image URLs".to_string(),
                )
            })?;

        Ok(Self {
            storage,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Upload every pair concurrently. The returned refs are in the same
    /// order as `images`; the first failure aborts the batch, naming the
    /// position of the pair that failed.
    #[tracing::instrument(skip_all, fields(image_count = images.len()))]
    pub async fn upload_batch(
        &self,
        images: &[TransformedImage],
    ) -> StorageResult<Vec<UploadedImageRef>> {
        let uploads = images.iter().enumerate().map(|(index, image)| {
            let id = Uuid::new_v4();
            async move {
                self.upload_pair(id, image)
                    .await
                    .map_err(|e| (index, e))
            }
        });

        // join_all preserves input order
        let results = join_all(uploads).await;

        let mut refs = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(image_ref) => refs.push(image_ref),
                Err((index, e)) => {
                    tracing::error!(index, error = %e, "Batch upload failed");
                    return Err(StorageError::UploadFailed(format!("image {}: {}", index, e)));
                }
            }
        }

        Ok(refs)
    }

    async fn upload_pair(
        &self,
        id: Uuid,
        image: &TransformedImage,
    ) -> StorageResult<UploadedImageRef> {
        let image_key = keys::image_key(id);
        let thumbnail_key = keys::thumbnail_key(id);

        self.storage
            .put(&image_key, image.full.clone(), IMAGE_CONTENT_TYPE)
            .await?;
        self.storage
            .put(&thumbnail_key, image.thumbnail.clone(), IMAGE_CONTENT_TYPE)
            .await?;

        Ok(UploadedImageRef {
            image_url: self.public_url(&image_key),
            thumbnail_url: self.public_url(&thumbnail_key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalStorage;
    use crate::StorageBackend;
    use async_trait::async_trait;
    use tempfile::tempdir;

    fn img(tag: u8) -> TransformedImage {
        TransformedImage {
            full: vec![tag; 16],
            thumbnail: vec![tag; 4],
            width: 100,
            height: 100,
        }
    }

    #[tokio::test]
    async fn test_missing_base_url_is_config_error() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        let result = StorageUploader::new(Arc::new(storage), None);
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_upload_batch_preserves_order() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let uploader = StorageUploader::new(
            storage.clone(),
            Some("https://cdn.example.com/".to_string()),
        )
        .unwrap();

        let images = vec![img(1), img(2), img(3)];
        let refs = uploader.upload_batch(&images).await.unwrap();

        assert_eq!(refs.len(), 3);
        for image_ref in &refs {
            assert!(image_ref.image_url.starts_with("https://cdn.example.com/posts/"));
            assert!(image_ref.thumbnail_url.ends_with("_thumb.jpg"));

            let key = image_ref
                .image_url
                .strip_prefix("https://cdn.example.com/")
                .unwrap();
            assert!(storage.exists(key).await.unwrap());
        }

        // Each pair gets its own id
        assert_ne!(refs[0].image_url, refs[1].image_url);
    }

    struct FailingStorage {
        fail_after: usize,
        puts: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Storage for FailingStorage {
        async fn put(&self, _key: &str, _data: Vec<u8>, _ct: &str) -> StorageResult<()> {
            let n = self.puts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n >= self.fail_after {
                Err(StorageError::UploadFailed("disk full".to_string()))
            } else {
                Ok(())
            }
        }

        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(false)
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }
    }

    // In-memory storage that sleeps per put, the delay taken from the
    // first payload byte, so completion order can be inverted.
    struct DelayedStorage {
        objects: tokio::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl Storage for DelayedStorage {
        async fn put(&self, key: &str, data: Vec<u8>, _ct: &str) -> StorageResult<()> {
            let delay = data.first().copied().unwrap_or(0) as u64 * 10;
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            self.objects.lock().await.insert(key.to_string(), data);
            Ok(())
        }

        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            Ok(self.objects.lock().await.contains_key(key))
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Local
        }
    }

    #[tokio::test]
    async fn test_order_preserved_under_inverted_upload_delays() {
        // Earlier images upload slower than later ones
        let storage = Arc::new(DelayedStorage {
            objects: tokio::sync::Mutex::new(std::collections::HashMap::new()),
        });
        let uploader = StorageUploader::new(
            storage.clone(),
            Some("https://cdn.example.com".to_string()),
        )
        .unwrap();

        let images = vec![img(3), img(2), img(1)];
        let refs = uploader.upload_batch(&images).await.unwrap();

        assert_eq!(refs.len(), 3);
        let objects = storage.objects.lock().await;
        for (index, image_ref) in refs.iter().enumerate() {
            let key = image_ref
                .image_url
                .strip_prefix("https://cdn.example.com/")
                .unwrap();
            let stored = objects.get(key).unwrap();
            assert_eq!(stored[0], images[index].full[0]);
        }
    }

    #[tokio::test]
    async fn test_failed_pair_fails_whole_batch_with_index() {
        // First pair (2 puts) succeeds, second pair fails
        let storage = Arc::new(FailingStorage {
            fail_after: 2,
            puts: std::sync::atomic::AtomicUsize::new(0),
        });
        let uploader =
            StorageUploader::new(storage, Some("https://cdn.example.com".to_string())).unwrap();

        let result = uploader.upload_batch(&[img(1), img(2)]).await;
        match result {
            Err(StorageError::UploadFailed(msg)) => assert!(msg.contains("image 1")),
            other => panic!("expected upload failure, got {:?}", other.map(|r| r.len())),
        }
    }
}
