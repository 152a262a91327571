//! Image metadata types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata for one stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ImageRecord {
    /// Unique image ID.
    pub id: i64,
    /// Stored filename (`<stem>_<uuid>.<ext>`).
    pub filename: String,
    /// Filename as uploaded by the client.
    pub original_name: String,
    /// File size in bytes.
    pub size: i64,
    /// Normalized extension, e.g. `.png`.
    pub file_type: String,
    /// When the record was created.
    pub upload_time: DateTime<Utc>,
}

/// Data for creating a new image record.
///
/// `id` and `upload_time` are assigned by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    /// Stored filename.
    pub filename: String,
    /// Filename as uploaded by the client.
    pub original_name: String,
    /// File size in bytes.
    pub size: i64,
    /// Normalized extension.
    pub file_type: String,
}

impl NewImage {
    /// Create a new NewImage.
    pub fn new(
        filename: impl Into<String>,
        original_name: impl Into<String>,
        size: i64,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            original_name: original_name.into(),
            size,
            file_type: file_type.into(),
        }
    }

    /// Attach the server-assigned fields.
    pub fn into_record(self, id: i64, upload_time: DateTime<Utc>) -> ImageRecord {
        ImageRecord {
            id,
            filename: self.filename,
            original_name: self.original_name,
            size: self.size,
            file_type: self.file_type,
            upload_time,
        }
    }
}
