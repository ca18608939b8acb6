//! Multipart plumbing shared by the upload handlers.

use crate::auth::AuthContext;
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::extract::Multipart;
use futures::TryStreamExt;
use std::io;
use tokio_util::io::StreamReader;
use tubely_core::models::{AssetKind, Video};
use tubely_core::AppError;
use tubely_processing::UploadRequest;
use uuid::Uuid;

pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidInput(format!("Invalid video ID: {}", raw)))
}

/// Find the form field for `kind` and stream it through the ingestion pipeline.
///
/// The file body is handed to the orchestrator unread; ownership and content
/// type are checked before any of it is consumed.
pub(crate) async fn ingest_multipart(
    state: &AppState,
    auth: AuthContext,
    video_id: Uuid,
    kind: AssetKind,
    mut multipart: Multipart,
) -> Result<Video, HttpAppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(kind.form_field()) {
            continue;
        }

        // A part without Content-Type is rejected by the allow-list, after
        // the record and ownership checks.
        let content_type = field.content_type().unwrap_or_default().to_string();

        tracing::debug!(
            video_id = %video_id,
            kind = %kind,
            content_type = %content_type,
            file_name = ?field.file_name(),
            "Receiving upload"
        );

        let body = StreamReader::new(Box::pin(field.map_err(io::Error::other)));
        let video = state
            .orchestrator
            .ingest(
                auth.user_id,
                video_id,
                UploadRequest {
                    kind,
                    content_type,
                    body,
                },
            )
            .await?;

        return Ok(video);
    }

    Err(AppError::InvalidInput(format!("Missing '{}' form field", kind.form_field())).into())
}
