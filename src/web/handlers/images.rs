//! Image handlers for Web API.

use axum::{
    body::{Body, Bytes},
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
    Json,
};
use std::io::Cursor;
use std::sync::Arc;
use utoipa;

use crate::image::UploadDraft;
use crate::web::dto::{
    ApiResponse, DeleteResponse, ImageListItem, ImageListResponse, ImageResponse, ListMeta,
    ListQuery,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Form field name clients use for the file part.
pub const FILE_FIELD: &str = "file";

/// POST /api/images - Upload one image.
///
/// Request body: multipart/form-data with exactly one file part.
#[utoipa::path(
    post,
    path = "/api/images",
    tag = "images",
    request_body(content = crate::web::dto::UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image uploaded", body = ApiResponse<ImageResponse>),
        (status = 400, description = "No file, several files, unsupported format or file too large"),
        (status = 413, description = "Request body over the transport limit"),
        (status = 500, description = "Storage or database failure"),
        (status = 503, description = "Database unavailable")
    )
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ImageResponse>>, ApiError> {
    let mut upload: Option<(Option<String>, Option<u64>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let is_file = field.file_name().is_some() || field.name() == Some(FILE_FIELD);
        if !is_file {
            continue;
        }

        if upload.is_some() {
            return Err(ApiError::bad_request(
                "Only one file can be uploaded per request.",
            ));
        }

        let original_name = field.file_name().map(|s| s.to_string());
        let declared_length = field
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let content = field.bytes().await?;
        upload = Some((original_name, declared_length, content));
    }

    let (original_name, declared_length, content) =
        upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    tracing::debug!(
        original_name = ?original_name,
        size = content.len(),
        "Received file part"
    );

    let mut draft = UploadDraft::new(original_name, Cursor::new(content));
    if let Some(length) = declared_length {
        draft = draft.with_declared_length(length);
    }
    let uploaded = state.service.upload(draft).await?;

    Ok(Json(ApiResponse::new(ImageResponse::from(uploaded))))
}

/// GET /api/images - List images, newest first.
#[utoipa::path(
    get,
    path = "/api/images",
    tag = "images",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of images", body = ImageListResponse),
        (status = 500, description = "Listing failed"),
        (status = 503, description = "Database unavailable")
    )
)]
pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ImageListResponse>, ApiError> {
    let (limit, offset) = query.resolve(state.default_limit, state.max_limit);

    let page = state.service.list(limit, offset).await?;

    Ok(Json(ImageListResponse {
        data: page.items.into_iter().map(ImageListItem::from).collect(),
        meta: ListMeta {
            limit,
            offset,
            total: page.total,
        },
    }))
}

/// DELETE /api/images/:filename - Delete an image and its record.
#[utoipa::path(
    delete,
    path = "/api/images/{filename}",
    tag = "images",
    params(
        ("filename" = String, Path, description = "Stored filename")
    ),
    responses(
        (status = 200, description = "Image deleted", body = ApiResponse<DeleteResponse>),
        (status = 400, description = "Invalid filename"),
        (status = 404, description = "Image not found"),
        (status = 500, description = "File or record could not be removed")
    )
)]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    state.service.delete(&filename).await?;

    Ok(Json(ApiResponse::new(DeleteResponse {
        filename,
        deleted: true,
    })))
}

/// GET /media/:filename - Serve a stored image.
#[utoipa::path(
    get,
    path = "/media/{filename}",
    tag = "media",
    params(
        ("filename" = String, Path, description = "Stored filename")
    ),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 400, description = "Invalid filename"),
        (status = 404, description = "Image not found")
    )
)]
pub async fn get_media(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let content = state.service.open(&filename)?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();

    Response::builder()
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /health - Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = String)
    )
)]
pub async fn health_check() -> &'static str {
    "OK"
}
