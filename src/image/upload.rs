//! Upload orchestration.
//!
//! An upload moves through [`UploadStage`]s. Each stage either advances or
//! aborts the request; only a failure after `Stored` has something to undo.

use std::fmt;
use std::io::{Read, Seek};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::record::{ImageRecord, NewImage};
use super::repository::ImageRepository;
use super::storage::ImageStorage;
use super::validator::{UploadDraft, UploadValidator};
use crate::Result;

/// Progress of a single upload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    /// A single file part has been extracted from the request.
    Received,
    /// Format and size checks passed.
    Validated,
    /// Bytes are on disk under a unique name.
    Stored,
    /// The metadata row exists.
    Recorded,
    /// The result has been handed back to the caller.
    Complete,
}

impl UploadStage {
    /// Stage name as used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStage::Received => "received",
            UploadStage::Validated => "validated",
            UploadStage::Stored => "stored",
            UploadStage::Recorded => "recorded",
            UploadStage::Complete => "complete",
        }
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A completed upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
    /// Persisted metadata.
    pub record: ImageRecord,
    /// Public URL of the stored file.
    pub url: String,
}

/// Join a URL prefix and a stored filename.
pub fn public_url(prefix: &str, filename: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), filename)
}

/// Runs validator, storage and repository for one upload.
#[derive(Clone)]
pub struct UploadOrchestrator {
    validator: UploadValidator,
    storage: ImageStorage,
    repository: Arc<dyn ImageRepository>,
    public_url_prefix: String,
}

impl UploadOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        validator: UploadValidator,
        storage: ImageStorage,
        repository: Arc<dyn ImageRepository>,
        public_url_prefix: impl Into<String>,
    ) -> Self {
        Self {
            validator,
            storage,
            repository,
            public_url_prefix: public_url_prefix.into(),
        }
    }

    /// Get the validator.
    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Validate, store and record one upload.
    ///
    /// If recording fails, the stored file is removed before the repository
    /// error is returned. A failed removal is logged and does not replace
    /// that error.
    pub async fn upload<R: Read + Seek>(&self, mut draft: UploadDraft<R>) -> Result<UploadedImage> {
        debug!(
            stage = %UploadStage::Received,
            original_name = ?draft.original_name,
            "Upload received"
        );

        let validated = self.validator.validate(&mut draft)?;
        debug!(
            stage = %UploadStage::Validated,
            extension = %validated.extension,
            size = validated.size,
            "Upload validated"
        );

        let stored = self
            .storage
            .store(&validated.base_name, &validated.extension, draft.source)?;
        if stored.bytes_written != validated.size {
            warn!(
                filename = %stored.filename,
                measured = validated.size,
                written = stored.bytes_written,
                "Written size differs from validated size"
            );
        }
        debug!(stage = %UploadStage::Stored, filename = %stored.filename, "Upload stored");

        let new_image = NewImage::new(
            stored.filename.clone(),
            validated.original_name,
            stored.bytes_written as i64,
            validated.extension,
        );

        let record = match self.repository.create(&new_image).await {
            Ok(record) => record,
            Err(e) => {
                warn!(filename = %stored.filename, error = %e, "Recording upload failed");
                self.discard(&stored.filename);
                return Err(e.into());
            }
        };
        debug!(stage = %UploadStage::Recorded, id = record.id, "Upload recorded");

        let url = public_url(&self.public_url_prefix, &record.filename);
        info!(
            stage = %UploadStage::Complete,
            filename = %record.filename,
            size = record.size,
            "Image uploaded"
        );

        Ok(UploadedImage { record, url })
    }

    fn discard(&self, filename: &str) {
        match self.storage.delete(filename) {
            Ok(true) => debug!(filename = %filename, "Removed file of failed upload"),
            Ok(false) => warn!(filename = %filename, "File of failed upload already gone"),
            Err(e) => error!(
                filename = %filename,
                error = %e,
                "Failed to remove file of failed upload"
            ),
        }
    }
}

impl fmt::Debug for UploadOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("validator", &self.validator)
            .field("storage", &self.storage)
            .field("public_url_prefix", &self.public_url_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{InMemoryImageRepository, RepositoryError, ValidationError};
    use crate::UploaderError;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const MB: u64 = 1024 * 1024;

    /// Repository whose writes always fail.
    #[derive(Default)]
    struct FailingRepository {
        create_calls: AtomicUsize,
        /// When set, `create` replaces the stored file with a non-empty
        /// directory so the cleanup cannot remove it.
        pin_stored_file_in: Option<PathBuf>,
    }

    #[async_trait]
    impl ImageRepository for FailingRepository {
        async fn create(&self, image: &NewImage) -> std::result::Result<ImageRecord, RepositoryError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(dir) = &self.pin_stored_file_in {
                let path = dir.join(&image.filename);
                std::fs::remove_file(&path).unwrap();
                std::fs::create_dir(&path).unwrap();
                std::fs::write(path.join("keep"), b"x").unwrap();
            }
            Err(RepositoryError::CreationFailure {
                filename: image.filename.clone(),
                reason: "disk I/O error".to_string(),
            })
        }

        async fn delete_by_id(&self, _id: i64) -> std::result::Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn delete_by_filename(&self, _filename: &str) -> std::result::Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn get_by_id(&self, _id: i64) -> std::result::Result<Option<ImageRecord>, RepositoryError> {
            Ok(None)
        }

        async fn get_by_filename(
            &self,
            _filename: &str,
        ) -> std::result::Result<Option<ImageRecord>, RepositoryError> {
            Ok(None)
        }

        async fn list_all(
            &self,
            _limit: u32,
            _offset: u32,
        ) -> std::result::Result<Vec<ImageRecord>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn count(&self) -> std::result::Result<u64, RepositoryError> {
            Ok(0)
        }
    }

    fn formats() -> Vec<String> {
        vec![".jpg".to_string(), ".png".to_string(), ".gif".to_string()]
    }

    fn orchestrator(
        temp_dir: &TempDir,
        repository: Arc<dyn ImageRepository>,
    ) -> UploadOrchestrator {
        UploadOrchestrator::new(
            UploadValidator::new(&formats(), 5 * MB),
            ImageStorage::new(temp_dir.path().join("images")),
            repository,
            "/media",
        )
    }

    fn draft(name: &str, len: u64) -> UploadDraft<Cursor<Vec<u8>>> {
        UploadDraft::new(Some(name.to_string()), Cursor::new(vec![7u8; len as usize]))
    }

    fn stored_files(temp_dir: &TempDir) -> Vec<String> {
        match std::fs::read_dir(temp_dir.path().join("images")) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().into_string().unwrap())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_upload_accented_name() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(InMemoryImageRepository::new());
        let orchestrator = orchestrator(&temp_dir, repo.clone());

        let uploaded = orchestrator.upload(draft("café.PNG", 2 * MB)).await.unwrap();

        let record = &uploaded.record;
        assert!(record.filename.starts_with("cafe_"));
        assert!(record.filename.ends_with(".png"));
        assert_eq!(record.original_name, "café.PNG");
        assert_eq!(record.size, 2_097_152);
        assert_eq!(record.file_type, ".png");
        assert_eq!(uploaded.url, format!("/media/{}", record.filename));

        assert_eq!(stored_files(&temp_dir), vec![record.filename.clone()]);
        assert_eq!(
            repo.get_by_filename(&record.filename).await.unwrap().as_ref(),
            Some(record)
        );
    }

    #[tokio::test]
    async fn test_oversize_upload_leaves_no_trace() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(InMemoryImageRepository::new());
        let orchestrator = orchestrator(&temp_dir, repo.clone());

        let err = orchestrator.upload(draft("big.jpg", 6 * MB)).await.unwrap_err();

        assert!(matches!(
            err,
            UploaderError::Validation(ValidationError::MaxSizeExceeded { .. })
        ));
        assert!(stored_files(&temp_dir).is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_format_never_reaches_repository() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(FailingRepository::default());
        let orchestrator = orchestrator(&temp_dir, repo.clone());

        let err = orchestrator.upload(draft("notes.txt", 10)).await.unwrap_err();

        assert!(matches!(
            err,
            UploaderError::Validation(ValidationError::UnsupportedFormat { .. })
        ));
        assert!(stored_files(&temp_dir).is_empty());
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repository_failure_removes_stored_file() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(FailingRepository::default());
        let orchestrator = orchestrator(&temp_dir, repo.clone());

        let err = orchestrator.upload(draft("photo.gif", 100)).await.unwrap_err();

        assert!(matches!(
            err,
            UploaderError::Repository(RepositoryError::CreationFailure { .. })
        ));
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 1);
        assert!(stored_files(&temp_dir).is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_cleanup_keeps_repository_error() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(FailingRepository {
            pin_stored_file_in: Some(temp_dir.path().join("images")),
            ..Default::default()
        });
        let orchestrator = orchestrator(&temp_dir, repo.clone());

        let err = orchestrator.upload(draft("stuck.png", 100)).await.unwrap_err();

        assert!(matches!(
            err,
            UploaderError::Repository(RepositoryError::CreationFailure { .. })
        ));
        assert_eq!(repo.create_calls.load(Ordering::SeqCst), 1);
        let leftovers = stored_files(&temp_dir);
        assert_eq!(leftovers.len(), 1);
        assert!(leftovers[0].starts_with("stuck_"));
    }

    #[tokio::test]
    async fn test_exact_limit_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(InMemoryImageRepository::new());
        let orchestrator = orchestrator(&temp_dir, repo);

        let uploaded = orchestrator.upload(draft("edge.jpg", 5 * MB)).await.unwrap();

        assert_eq!(uploaded.record.size, (5 * MB) as i64);
    }

    #[tokio::test]
    async fn test_untransliterable_name_uses_fallback_stem() {
        let temp_dir = TempDir::new().unwrap();
        let repo = Arc::new(InMemoryImageRepository::new());
        let orchestrator = orchestrator(&temp_dir, repo);

        let uploaded = orchestrator.upload(draft("写真.jpg", 10)).await.unwrap();

        assert!(uploaded.record.filename.starts_with("uploaded_file_"));
        assert_eq!(uploaded.record.original_name, "写真.jpg");
    }

    #[test]
    fn test_public_url() {
        assert_eq!(public_url("/media", "a.png"), "/media/a.png");
        assert_eq!(public_url("/media/", "a.png"), "/media/a.png");
        assert_eq!(public_url("", "a.png"), "/a.png");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(UploadStage::Received.to_string(), "received");
        assert_eq!(UploadStage::Complete.to_string(), "complete");
    }
}
