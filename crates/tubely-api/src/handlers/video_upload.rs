use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::{ingest_multipart, parse_video_id};
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::sync::Arc;
use tubely_core::models::{AssetKind, VideoResponse};

#[utoipa::path(
    post,
    path = "/api/video_upload/{video_id}",
    tag = "uploads",
    params(
        ("video_id" = String, Path, description = "Video record ID")
    ),
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "Form field `video` carrying an MP4 file"),
    responses(
        (status = 200, description = "Video stored and record updated", body = VideoResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Missing token or not the video owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 422, description = "No usable video stream", body = ErrorResponse),
        (status = 500, description = "Processing failed", body = ErrorResponse),
        (status = 502, description = "Object storage failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(video_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<VideoResponse>, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;
    tracing::info!(video_id = %video_id, user_id = %auth.user_id, "Uploading video");

    let video = ingest_multipart(&state, auth, video_id, AssetKind::Video, multipart).await?;

    Ok(Json(VideoResponse::from(video)))
}
