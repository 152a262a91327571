//! Error types for the image uploader.

use thiserror::Error;

use crate::image::{RepositoryError, StorageError, ValidationError};

/// Common error type for the image uploader.
#[derive(Error, Debug)]
pub enum UploaderError {
    /// Upload rejected before anything was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// On-disk storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Metadata repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database bootstrap or migration error.
    ///
    /// Errors raised by repository operations never use this variant; they
    /// are reported as [`RepositoryError`].
    #[error("database error: {0}")]
    Database(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for UploaderError {
    fn from(e: sqlx::Error) -> Self {
        UploaderError::Database(e.to_string())
    }
}

/// Result type alias for image uploader operations.
pub type Result<T> = std::result::Result<T, UploaderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error_display() {
        let err = UploaderError::NotFound("image 'a.png'".to_string());
        assert_eq!(err.to_string(), "image 'a.png' not found");
    }

    #[test]
    fn test_config_error_display() {
        let err = UploaderError::Config("max_file_size must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: max_file_size must be positive"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: UploaderError = io_err.into();
        assert!(matches!(err, UploaderError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err: UploaderError = ValidationError::MaxSizeExceeded {
            size: 10,
            max_size: 5,
        }
        .into();
        assert!(matches!(err, UploaderError::Validation(_)));
        assert!(err.to_string().starts_with("file size exceeds"));
    }

    #[test]
    fn test_repository_error_conversion() {
        let err: UploaderError = RepositoryError::ConnectionFailure("pool closed".into()).into();
        assert!(matches!(
            err,
            UploaderError::Repository(RepositoryError::ConnectionFailure(_))
        ));
    }
}
