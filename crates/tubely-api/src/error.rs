//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`; any `AppError` (or a type that
//! converts into one) becomes a JSON [`ErrorResponse`] with the status code
//! and log level its [`ErrorMetadata`] prescribes.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tubely_core::{AppError, ErrorMetadata, LogLevel};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether resubmitting the same upload may succeed
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rule: AppError lives in tubely-core, IntoResponse in axum)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        let app = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(err.body_text())
        } else {
            AppError::InvalidInput(format!("Invalid multipart body: {}", err.body_text()))
        };
        HttpAppError(app)
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error.detailed_message(), error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error.detailed_message(), error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error.detailed_message(), error_type = error_type, "Request failed");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl ErrorResponse {
    fn from_app_error(app_error: &AppError, include_details: bool) -> Self {
        let (details, error_type) = if include_details {
            (
                Some(app_error.detailed_message()),
                Some(app_error.error_type().to_string()),
            )
        } else {
            (None, None)
        };

        ErrorResponse {
            error: app_error.client_message(),
            details,
            error_type,
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Production hides details for every error; elsewhere only sensitive ones.
        let include_details = !is_production_env() && !app_error.is_sensitive();
        let body = ErrorResponse::from_app_error(app_error, include_details);

        (status, Json(body)).into_response()
    }
}
