//! OpenAPI documentation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use tubely_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tubely API",
        version = "0.1.0",
        description = "Video and thumbnail ingestion. Uploads are staged, videos are probed and remuxed for fast start, and the stored object's URL is written back onto the video record."
    ),
    paths(
        handlers::video_upload::upload_video,
        handlers::thumbnail_upload::upload_thumbnail,
        handlers::video_get::get_video,
    ),
    components(schemas(
        models::VideoResponse,
        models::AssetKind,
        models::OrientationClass,
        error::ErrorResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "uploads", description = "Thumbnail and video ingestion"),
        (name = "videos", description = "Video records")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
