#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::{S3Location, S3Storage};
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use std::sync::Arc;
use tubely_core::StorageConfig;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &StorageConfig) -> StorageResult<Arc<dyn Storage>> {
    match config.backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;

            let storage = S3Storage::new(S3Location {
                bucket,
                region,
                endpoint_url: config.s3_endpoint.clone(),
                public_base_url: config.public_base_url.clone(),
                key_prefix: config.key_prefix.clone(),
            })
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config.local_storage_base_url.clone().ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
            })?;

            let storage = LocalStorage::new(base_path, base_url)
                .await?
                .with_key_prefix(config.key_prefix.clone());
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;

    fn local_config(path: Option<String>) -> StorageConfig {
        StorageConfig {
            backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            key_prefix: None,
            public_base_url: None,
            local_storage_path: path,
            local_storage_base_url: Some("http://localhost:8091/assets".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_local_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage = create_storage(&local_config(Some(
            dir.path().to_string_lossy().into_owned(),
        )))
        .await
        .unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
        assert_eq!(
            storage.public_url("abc.png"),
            "http://localhost:8091/assets/abc.png"
        );
    }

    #[tokio::test]
    async fn test_local_storage_requires_path() {
        let result = create_storage(&local_config(None)).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }
}
