//! Request DTOs for Web API.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

/// Query parameters for the image listing.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Page size; defaults to the configured page size.
    pub limit: Option<u32>,
    /// Number of entries to skip.
    pub offset: Option<u32>,
}

impl ListQuery {
    /// Resolve to `(limit, offset)` with `limit` clamped to `1..=max_limit`.
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> (u32, u32) {
        let max_limit = max_limit.max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit);
        (limit, self.offset.unwrap_or(0))
    }
}

/// Multipart body of an upload, for the API documentation.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// The image file.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
