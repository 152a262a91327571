//! Response DTOs for Web API.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::image::{ImageSummary, UploadedImage};

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Listing response: one page plus its window.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImageListResponse {
    /// Images, newest first.
    pub data: Vec<ImageListItem>,
    /// Pagination metadata.
    pub meta: ListMeta,
}

/// Pagination metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListMeta {
    /// Page size used.
    pub limit: u32,
    /// Entries skipped.
    pub offset: u32,
    /// Total number of images.
    pub total: u64,
}

/// A stored image as returned by an upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImageResponse {
    /// Record ID.
    pub id: i64,
    /// Stored filename.
    pub filename: String,
    /// Public URL.
    pub url: String,
    /// Size in bytes.
    pub size: i64,
    /// Filename sent by the client.
    pub original_name: String,
    /// Normalized extension.
    pub file_type: String,
    /// Upload time.
    pub upload_time: DateTime<Utc>,
}

impl From<UploadedImage> for ImageResponse {
    fn from(uploaded: UploadedImage) -> Self {
        let record = uploaded.record;
        Self {
            id: record.id,
            filename: record.filename,
            url: uploaded.url,
            size: record.size,
            original_name: record.original_name,
            file_type: record.file_type,
            upload_time: record.upload_time,
        }
    }
}

/// One listing entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImageListItem {
    /// Record ID (absent when listing the storage directory).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Stored filename.
    pub filename: String,
    /// Stored filename without its unique suffix.
    pub display_name: String,
    /// Public URL.
    pub url: String,
    /// Size in bytes.
    pub size: i64,
    /// Normalized extension.
    pub file_type: String,
    /// Filename sent by the client (absent when listing the storage directory).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// Upload time, or file modification time.
    pub upload_time: DateTime<Utc>,
}

impl From<ImageSummary> for ImageListItem {
    fn from(summary: ImageSummary) -> Self {
        Self {
            id: summary.id,
            filename: summary.filename,
            display_name: summary.display_name,
            url: summary.url,
            size: summary.size,
            file_type: summary.file_type,
            original_name: summary.original_name,
            upload_time: summary.upload_time,
        }
    }
}

/// Deletion result.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    /// Deleted filename.
    pub filename: String,
    /// Always true; failures are reported as errors.
    pub deleted: bool,
}
