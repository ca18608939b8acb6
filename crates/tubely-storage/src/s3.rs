use crate::keys::{validate_key, with_prefix};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;

/// Where objects land and how their public URLs are formed.
#[derive(Debug, Clone)]
pub struct S3Location {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers
    pub endpoint_url: Option<String>,
    /// CDN origin serving the bucket, e.g. `https://d111111abcdef8.cloudfront.net`
    pub public_base_url: Option<String>,
    pub key_prefix: Option<String>,
}

impl S3Location {
    /// Key as stored in the bucket, including the configured prefix.
    pub fn full_key(&self, key: &str) -> String {
        with_prefix(self.key_prefix.as_deref(), key)
    }

    /// Public URL for a key relative to the prefix.
    ///
    /// For AWS S3 this is `https://{bucket}.s3.{region}.amazonaws.com/{prefix}/{key}`.
    /// A public base URL wins over the bucket URL; a custom endpoint uses
    /// path-style addressing `{endpoint}/{bucket}/{prefix}/{key}`.
    pub fn url(&self, key: &str) -> String {
        let full_key = self.full_key(key);
        if let Some(ref base) = self.public_base_url {
            format!("{}/{}", base.trim_end_matches('/'), full_key)
        } else if let Some(ref endpoint) = self.endpoint_url {
            format!(
                "{}/{}/{}",
                endpoint.trim_end_matches('/'),
                self.bucket,
                full_key
            )
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, full_key
            )
        }
    }
}

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    location: S3Location,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// Credentials come from the standard AWS provider chain (environment,
    /// profile, instance metadata).
    pub async fn new(location: S3Location) -> StorageResult<Self> {
        if location.bucket.is_empty() {
            return Err(StorageError::ConfigError("S3 bucket is empty".to_string()));
        }

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(location.region.clone()))
            .load()
            .await;

        let mut builder = S3ConfigBuilder::from(&sdk_config);
        if let Some(ref endpoint) = location.endpoint_url {
            // MinIO and LocalStack only support path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        tracing::info!(
            bucket = %location.bucket,
            region = %location.region,
            key_prefix = ?location.key_prefix,
            "S3 storage initialized"
        );

        Ok(S3Storage { client, location })
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> StorageResult<String> {
        validate_key(key).map_err(|e| StorageError::InvalidKey(e.to_string()))?;
        let full_key = self.location.full_key(key);
        let size = tokio::fs::metadata(source).await?.len();
        let start = std::time::Instant::now();

        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Failed to open source: {}", e)))?;

        self.client
            .put_object()
            .bucket(&self.location.bucket)
            .key(&full_key)
            .content_type(content_type)
            .content_length(size as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %self.location.bucket,
                    key = %full_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(DisplayErrorContext(&e).to_string())
            })?;

        tracing::info!(
            bucket = %self.location.bucket,
            key = %full_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.location.url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let full_key = self.location.full_key(key);

        self.client
            .delete_object()
            .bucket(&self.location.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %self.location.bucket,
                    key = %full_key,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(DisplayErrorContext(&e).to_string())
            })?;

        tracing::info!(bucket = %self.location.bucket, key = %full_key, "S3 delete successful");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.location.url(key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> S3Location {
        S3Location {
            bucket: "tubely-1234".to_string(),
            region: "us-east-2".to_string(),
            endpoint_url: None,
            public_base_url: None,
            key_prefix: None,
        }
    }

    #[test]
    fn test_aws_url() {
        assert_eq!(
            location().url("landscape/abc.mp4"),
            "https://tubely-1234.s3.us-east-2.amazonaws.com/landscape/abc.mp4"
        );
    }

    #[test]
    fn test_prefix_is_part_of_key_and_url() {
        let loc = S3Location {
            key_prefix: Some("media".to_string()),
            ..location()
        };
        assert_eq!(loc.full_key("abc.png"), "media/abc.png");
        assert_eq!(
            loc.url("abc.png"),
            "https://tubely-1234.s3.us-east-2.amazonaws.com/media/abc.png"
        );
    }

    #[test]
    fn test_custom_endpoint_uses_path_style() {
        let loc = S3Location {
            endpoint_url: Some("http://localhost:9000/".to_string()),
            ..location()
        };
        assert_eq!(
            loc.url("other/abc.mp4"),
            "http://localhost:9000/tubely-1234/other/abc.mp4"
        );
    }

    #[test]
    fn test_public_base_url_wins() {
        let loc = S3Location {
            endpoint_url: Some("http://localhost:9000".to_string()),
            public_base_url: Some("https://d111111abcdef8.cloudfront.net".to_string()),
            ..location()
        };
        assert_eq!(
            loc.url("portrait/abc.mp4"),
            "https://d111111abcdef8.cloudfront.net/portrait/abc.mp4"
        );
    }
}
