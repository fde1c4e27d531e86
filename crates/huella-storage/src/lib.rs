//! Object storage for sighting images.
//!
//! Provides the `Storage` trait with S3-compatible and local-filesystem
//! backends, shared key generation, and the batch uploader that pushes a
//! submission's full-size/thumbnail pairs out concurrently while keeping
//! submission order.
//!
//! # Storage key format
//!
//! Every image pair gets a fresh UUID: `posts/{id}.jpg` for the full-size
//! encoding and `posts/{id}_thumb.jpg` for the thumbnail. Keys must not
//! contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod s3;
pub mod traits;
pub mod uploader;

pub use factory::{create_storage, resolve_public_base_url};
pub use huella_core::config::StorageBackend;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use uploader::StorageUploader;
