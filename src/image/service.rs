//! Listing, deletion and retrieval of stored images.

use std::io::{Read, Seek};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::display::display_name;
use super::record::ImageRecord;
use super::repository::ImageRepository;
use super::storage::{ImageStorage, StorageError, StoredFileInfo};
use super::upload::{public_url, UploadOrchestrator, UploadedImage};
use super::validator::{extension_of, UploadDraft, UploadValidator};
use crate::config::{Config, ListingSource};
use crate::{Result, UploaderError};

/// One entry of a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSummary {
    /// Record ID; absent for filesystem listings.
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
    /// Client-supplied name; absent for filesystem listings.
    pub original_name: Option<String>,
    /// Upload time, or modification time for filesystem listings.
    pub upload_time: DateTime<Utc>,
}

/// A window of the listing plus the total it was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePage {
    /// Entries, newest first.
    pub items: Vec<ImageSummary>,
    /// Number of entries across all pages.
    pub total: u64,
}

/// Image operations shared by all request handlers.
///
/// Built once at startup and handed to the boundary; the repository it
/// holds is the only handle to the metadata store.
#[derive(Clone)]
pub struct ImageService {
    orchestrator: UploadOrchestrator,
    repository: Arc<dyn ImageRepository>,
    storage: ImageStorage,
    validator: UploadValidator,
    listing_source: ListingSource,
    public_url_prefix: String,
}

impl ImageService {
    /// Create a new service.
    pub fn new(
        repository: Arc<dyn ImageRepository>,
        storage: ImageStorage,
        validator: UploadValidator,
        listing_source: ListingSource,
        public_url_prefix: impl Into<String>,
    ) -> Self {
        let public_url_prefix = public_url_prefix.into();
        let orchestrator = UploadOrchestrator::new(
            validator.clone(),
            storage.clone(),
            Arc::clone(&repository),
            public_url_prefix.clone(),
        );

        Self {
            orchestrator,
            repository,
            storage,
            validator,
            listing_source,
            public_url_prefix,
        }
    }

    /// Create a service from the application configuration.
    pub fn from_config(config: &Config, repository: Arc<dyn ImageRepository>) -> Self {
        Self::new(
            repository,
            ImageStorage::new(&config.storage.image_dir),
            UploadValidator::from_config(&config.storage),
            config.listing.source,
            config.storage.public_url_prefix.clone(),
        )
    }

    /// Get the validator.
    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Get the storage.
    pub fn storage(&self) -> &ImageStorage {
        &self.storage
    }

    /// Get the configured listing source.
    pub fn listing_source(&self) -> ListingSource {
        self.listing_source
    }

    /// Validate, store and record one upload.
    pub async fn upload<R: Read + Seek>(&self, draft: UploadDraft<R>) -> Result<UploadedImage> {
        self.orchestrator.upload(draft).await
    }

    /// List images newest first.
    pub async fn list(&self, limit: u32, offset: u32) -> Result<ImagePage> {
        match self.listing_source {
            ListingSource::Database => self.list_from_database(limit, offset).await,
            ListingSource::Filesystem => self.list_from_filesystem(limit, offset),
        }
    }

    async fn list_from_database(&self, limit: u32, offset: u32) -> Result<ImagePage> {
        let records = self.repository.list_all(limit, offset).await?;
        let total = self.repository.count().await?;

        let items = records
            .into_iter()
            .map(|record| self.summarize_record(record))
            .collect();

        Ok(ImagePage { items, total })
    }

    fn list_from_filesystem(&self, limit: u32, offset: u32) -> Result<ImagePage> {
        let files = self
            .storage
            .list_files(|name| self.validator.is_supported(name))?;
        let total = files.len() as u64;

        let items = files
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|file| self.summarize_file(file))
            .collect();

        Ok(ImagePage { items, total })
    }

    fn summarize_record(&self, record: ImageRecord) -> ImageSummary {
        ImageSummary {
            id: Some(record.id),
            display_name: display_name(&record.filename),
            url: public_url(&self.public_url_prefix, &record.filename),
            size: record.size,
            file_type: record.file_type,
            original_name: Some(record.original_name),
            upload_time: record.upload_time,
            filename: record.filename,
        }
    }

    fn summarize_file(&self, file: StoredFileInfo) -> ImageSummary {
        ImageSummary {
            id: None,
            display_name: display_name(&file.filename),
            url: public_url(&self.public_url_prefix, &file.filename),
            size: i64::try_from(file.size).unwrap_or(i64::MAX),
            file_type: extension_of(&file.filename),
            original_name: None,
            upload_time: file.modified,
            filename: file.filename,
        }
    }

    /// Delete an image's file and record.
    ///
    /// A missing file does not stop the record from being removed. A file
    /// that cannot be removed keeps the record in place.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        let record = self
            .repository
            .get_by_filename(filename)
            .await?
            .ok_or_else(|| UploaderError::NotFound(format!("image '{filename}'")))?;

        if self.storage.delete(&record.filename)? {
            debug!(filename = %record.filename, "Deleted image file");
        } else {
            warn!(filename = %record.filename, "Image file missing, removing stale record");
        }

        if !self.repository.delete_by_filename(&record.filename).await? {
            warn!(filename = %record.filename, "Image record already removed");
        }

        info!(filename = %record.filename, "Image deleted");
        Ok(())
    }

    /// Read the raw bytes of a stored image.
    pub fn open(&self, filename: &str) -> Result<Vec<u8>> {
        match self.storage.load(filename) {
            Ok(content) => Ok(content),
            Err(StorageError::NotFound(_)) => {
                Err(UploaderError::NotFound(format!("image '{filename}'")))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for ImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageService")
            .field("storage", &self.storage)
            .field("listing_source", &self.listing_source)
            .field("public_url_prefix", &self.public_url_prefix)
            .finish()
    }
}
