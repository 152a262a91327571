//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{
    DeleteResponse, ImageListItem, ImageListResponse, ImageResponse, ListMeta, UploadForm,
};
use super::handlers::{
    delete_image, get_media, health_check, images, list_images, upload_image, AppState,
};
use super::middleware::create_cors_layer;

/// OpenAPI documentation for the image uploader.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Image Uploader API",
        description = "Upload, list, serve and delete images",
    ),
    paths(
        images::upload_image,
        images::list_images,
        images::delete_image,
        images::get_media,
        images::health_check,
    ),
    components(schemas(
        UploadForm,
        ImageResponse,
        ImageListItem,
        ImageListResponse,
        ListMeta,
        DeleteResponse,
    )),
    tags(
        (name = "images", description = "Image upload and management"),
        (name = "media", description = "Raw image retrieval"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Create the application router.
///
/// Stored files are served under `public_url_prefix`, matching the URLs
/// returned by uploads and listings.
pub fn create_router(
    app_state: Arc<AppState>,
    cors_origins: &[String],
    public_url_prefix: &str,
) -> Router {
    let body_limit = app_state.body_limit();

    let api_routes = Router::new()
        .route("/images", post(upload_image).get(list_images))
        .route("/images/:filename", delete(delete_image));

    let media_path = format!("{}/:filename", public_url_prefix.trim_end_matches('/'));

    Router::new()
        .nest("/api", api_routes)
        .route(&media_path, get(get_media))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
        .merge(create_swagger_router())
}

/// Create the Swagger UI router serving `/api-docs/openapi.json`.
pub fn create_swagger_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
