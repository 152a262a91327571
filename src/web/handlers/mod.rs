//! API handlers for the image uploader.

pub mod images;

pub use images::*;

use std::sync::Arc;

use crate::config::Config;
use crate::image::{ImageRepository, ImageService};

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Image operations.
    pub service: ImageService,
    /// Page size when the client sends no `limit`.
    pub default_limit: u32,
    /// Upper bound for `limit`.
    pub max_limit: u32,
    /// Maximum accepted file size in bytes.
    pub max_file_size: u64,
}

impl AppState {
    /// Create the state from configuration and a repository.
    pub fn new(config: &Config, repository: Arc<dyn ImageRepository>) -> Self {
        Self {
            service: ImageService::from_config(config, repository),
            default_limit: config.listing.default_limit,
            max_limit: config.listing.max_limit,
            max_file_size: config.storage.max_file_size,
        }
    }

    /// Request body limit for uploads.
    ///
    /// Twice the file limit plus 1 MiB of multipart overhead, so files a
    /// little over the limit still reach validation and get a precise error.
    pub fn body_limit(&self) -> usize {
        let limit = self
            .max_file_size
            .saturating_mul(2)
            .saturating_add(1024 * 1024);
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}
