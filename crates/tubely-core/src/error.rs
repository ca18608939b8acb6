//! Error types module
//!
//! All failures of the ingestion pipeline are unified under [`AppError`]. Each
//! variant describes how it should be presented over HTTP through the
//! [`ErrorMetadata`] trait, so the API crate never has to match on causes.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures
    Debug,
    /// Recoverable issues like oversized uploads or malformed media
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether resubmitting the same request may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the client
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Malformed media: {0}")]
    MalformedMedia(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("Invalid ID: {}", err))
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the bearer token and record ownership"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size and upload again"),
            false,
            LogLevel::Warn,
        ),
        AppError::MalformedMedia(_) => (
            422,
            "MALFORMED_MEDIA",
            false,
            Some("Upload a file containing a playable video stream"),
            false,
            LogLevel::Warn,
        ),
        AppError::Processing(_) => (
            500,
            "PROCESSING_ERROR",
            true,
            Some("Resubmit the upload; contact support if this error persists"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            502,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Database(_) => (
            503,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NotFound(_) => "NotFound",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::MalformedMedia(_) => "MalformedMedia",
            AppError::Processing(_) => "ProcessingError",
            AppError::Storage(_) => "StorageError",
            AppError::Database(_) => "Database",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::MalformedMedia(_) => "Uploaded file has no usable video stream".to_string(),
            AppError::Processing(_) => "Failed to process media".to_string(),
            AppError::Storage(_) => "Failed to store media".to_string(),
            AppError::Database(_) => "Failed to access video records".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn all_variants() -> Vec<AppError> {
        vec![
            AppError::InvalidInput("bad".into()),
            AppError::Unauthorized("nope".into()),
            AppError::NotFound("missing".into()),
            AppError::PayloadTooLarge("big".into()),
            AppError::MalformedMedia("no stream".into()),
            AppError::Processing("ffprobe exited 1".into()),
            AppError::Storage("put failed".into()),
            AppError::Database("pool closed".into()),
        ]
    }

    #[test]
    fn test_pipeline_failures_map_to_distinct_statuses() {
        let statuses: HashSet<u16> = all_variants()
            .iter()
            .map(|e| e.http_status_code())
            .collect();
        assert_eq!(statuses.len(), all_variants().len());
    }

    #[test]
    fn test_error_metadata_processing() {
        let err = AppError::Processing("ffprobe exited with status 1".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "PROCESSING_ERROR");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(!err.client_message().contains("ffprobe"));
    }

    #[test]
    fn test_error_metadata_payload_too_large() {
        let err = AppError::PayloadTooLarge("File exceeds 1024 MB".to_string());
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.client_message(), "File exceeds 1024 MB");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let err = AppError::from(anyhow::anyhow!("disk full").context("staging failed"));
        let details = err.detailed_message();
        assert!(details.contains("Internal error with source"));
        assert!(details.contains("staging failed"));
    }

    #[test]
    fn test_uuid_error_is_invalid_input() {
        let err: AppError = uuid::Uuid::parse_str("not-a-uuid").unwrap_err().into();
        assert_eq!(err.http_status_code(), 400);
    }
}
