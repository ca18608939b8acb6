//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tubely_core::AppError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

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

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(msg) => AppError::Internal(format!("Invalid key: {}", msg)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Durable object store for finalized media.
///
/// Writes are whole-object and are not retried here; a failed call leaves no
/// object that callers should reference.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Transfer the file at `source` to `key` and return its public URL.
    ///
    /// The source is read from the start; the caller keeps ownership of the
    /// local file.
    async fn put_file(&self, key: &str, source: &Path, content_type: &str)
        -> StorageResult<String>;

    /// Delete an object by key. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Public URL an object stored under `key` is served from.
    fn public_url(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
