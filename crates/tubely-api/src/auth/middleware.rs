use crate::auth::jwt::JwtService;
use crate::auth::models::AuthContext;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tubely_core::AppError;

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let (scheme, token) = auth_header.split_once(' ').ok_or_else(|| {
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ));
    }

    Ok(token)
}

pub async fn auth_middleware(
    State(jwt): State<Arc<JwtService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match bearer_token(request.headers()).and_then(|token| jwt.validate(token)) {
        Ok(claims) => claims,
        Err(err) => return HttpAppError(err).into_response(),
    };

    tracing::debug!(user_id = %claims.sub, "Request authenticated");
    request
        .extensions_mut()
        .insert(AuthContext { user_id: claims.sub });

    next.run(request).await
}
