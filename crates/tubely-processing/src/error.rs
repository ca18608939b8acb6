use std::io;
use thiserror::Error;
use tubely_core::AppError;

/// Failures of the external media tools.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: String,
        stderr: String,
    },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{tool} timed out after {secs}s")]
    TimedOut { tool: &'static str, secs: u64 },

    #[error("unparseable probe output: {0}")]
    UnparseableOutput(String),

    #[error("no usable video stream: {0}")]
    MalformedMedia(String),
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::MalformedMedia(msg) => AppError::MalformedMedia(msg),
            other => AppError::Processing(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubely_core::ErrorMetadata;

    #[test]
    fn test_tool_failure_is_server_error() {
        let err: AppError = ProcessingError::ToolFailed {
            tool: "ffprobe",
            status: "exit status: 1".to_string(),
            stderr: "moov atom not found".to_string(),
        }
        .into();
        assert_eq!(err.http_status_code(), 500);
        assert!(err.to_string().contains("moov atom not found"));
    }

    #[test]
    fn test_malformed_media_keeps_its_class() {
        let err: AppError = ProcessingError::MalformedMedia("width is 0".to_string()).into();
        assert!(matches!(err, AppError::MalformedMedia(_)));
        assert_eq!(err.http_status_code(), 422);
    }
}
