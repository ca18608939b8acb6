use crate::keys::{validate_key, with_prefix};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    key_prefix: Option<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for stored assets (e.g., "/var/lib/tubely/assets")
    /// * `base_url` - Base URL the directory is served from (e.g., "http://localhost:8091/assets")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            key_prefix: None,
        })
    }

    pub fn with_key_prefix(mut self, prefix: Option<String>) -> Self {
        self.key_prefix = prefix.filter(|p| !p.trim_matches('/').is_empty());
        self
    }

    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key).map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        Ok(self
            .base_path
            .join(with_prefix(self.key_prefix.as_deref(), key)))
    }

    fn generate_url(&self, key: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            with_prefix(self.key_prefix.as_deref(), key)
        )
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let start = std::time::Instant::now();

        let size = fs::copy(source, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(self.generate_url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), key = %key, "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn public_url(&self, key: &str) -> String {
        self.generate_url(key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn source_file(dir: &TempDir, contents: &[u8]) -> PathBuf {
        let path = dir.path().join("source.bin");
        fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_put_file_copies_bytes_and_returns_url() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path(), "http://localhost:8091/assets/".to_string())
            .await
            .unwrap();
        let source = source_file(&scratch, b"fake mp4").await;

        let url = storage
            .put_file("landscape/abc.mp4", &source, "video/mp4")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:8091/assets/landscape/abc.mp4");
        let stored = fs::read(root.path().join("landscape/abc.mp4")).await.unwrap();
        assert_eq!(stored, b"fake mp4");
        // source stays with the caller
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_prefix_applies_to_path_and_url() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path(), "http://cdn.local".to_string())
            .await
            .unwrap()
            .with_key_prefix(Some("media".to_string()));
        let source = source_file(&scratch, b"png").await;

        let url = storage.put_file("abc.png", &source, "image/png").await.unwrap();

        assert_eq!(url, "http://cdn.local/media/abc.png");
        assert!(root.path().join("media/abc.png").exists());
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_ok() {
        let root = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path(), "http://localhost".to_string())
            .await
            .unwrap();

        storage.delete("portrait/nothing.mp4").await.unwrap();
        assert!(!root.path().join("portrait/nothing.mp4").exists());
    }

    #[tokio::test]
    async fn test_traversal_key_rejected() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path(), "http://localhost".to_string())
            .await
            .unwrap();
        let source = source_file(&scratch, b"x").await;

        let result = storage.put_file("../escape.mp4", &source, "video/mp4").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
