//! Mock Storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tubely_storage::{Storage, StorageBackend, StorageError, StorageResult};

/// Stores objects in memory and serves S3-style URLs.
pub struct MockStorage {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    bucket: String,
    region: String,
    key_prefix: Option<String>,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::with_bucket("tubely-test", "us-east-2", None)
    }

    pub fn with_bucket(bucket: &str, region: &str, key_prefix: Option<&str>) -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            bucket: bucket.to_string(),
            region: region.to_string(),
            key_prefix: key_prefix.map(|p| p.trim_matches('/').to_string()),
            puts: AtomicUsize::new(0),
            fail_puts: AtomicBool::new(false),
        }
    }

    /// Make every following `put_file` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Number of `put_file` calls, failed ones included.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn full_key(&self, key: &str) -> String {
        match self.key_prefix {
            Some(ref prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        _content_type: &str,
    ) -> StorageResult<String> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed("mock put failure".to_string()));
        }

        let data = tokio::fs::read(source).await?;
        self.objects().insert(key.to_string(), data);
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects().remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket,
            self.region,
            self.full_key(key)
        )
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
