use crate::auth::AuthContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::parse_video_id;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tubely_core::models::VideoResponse;
use tubely_core::AppError;

#[utoipa::path(
    get,
    path = "/api/videos/{video_id}",
    tag = "videos",
    params(
        ("video_id" = String, Path, description = "Video record ID")
    ),
    responses(
        (status = 200, description = "Video record", body = VideoResponse),
        (status = 401, description = "Missing token or not the video owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResponse>, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;

    let video = state
        .repository
        .get_video(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Video {} not found", video_id)))?;

    if !video.is_owned_by(auth.user_id) {
        return Err(AppError::Unauthorized("You do not own this video".to_string()).into());
    }

    Ok(Json(VideoResponse::from(video)))
}
