//! Route configuration and setup

use crate::constants::{API_PREFIX, MULTIPART_OVERHEAD_BYTES};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::map_response_body::MapResponseBodyLayer;
use tower_http::trace::TraceLayer;
use tubely_core::Config;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    // Uploads are streamed to disk, so axum's 2 MB default is replaced by a
    // ceiling just above the largest per-kind limit.
    let body_limit = usize::try_from(
        config
            .max_upload_bytes()
            .saturating_add(MULTIPART_OVERHEAD_BYTES),
    )
    .unwrap_or(usize::MAX);
    tracing::info!(
        body_limit_bytes = body_limit,
        max_video_bytes = config.ingest.max_video_size_bytes,
        max_thumbnail_bytes = config.ingest.max_thumbnail_size_bytes,
        "Request body limit configured"
    );

    let app = public_routes()
        .merge(protected_routes(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::disable())
                .layer(MapResponseBodyLayer::new(axum::body::Body::new))
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
        .with_state(state);

    Ok(app)
}

/// Public routes (no authentication required)
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            &format!("{}/openapi.json", API_PREFIX),
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

/// Routes behind bearer authentication
fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/thumbnail_upload/{{video_id}}", API_PREFIX),
            post(handlers::thumbnail_upload::upload_thumbnail),
        )
        .route(
            &format!("{}/video_upload/{{video_id}}", API_PREFIX),
            post(handlers::video_upload::upload_video),
        )
        .route(
            &format!("{}/videos/{{video_id}}", API_PREFIX),
            get(handlers::video_get::get_video),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.jwt.clone(),
            crate::auth::middleware::auth_middleware,
        ))
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.base.cors_origins.iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = config
        .base
        .cors_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any))
}
