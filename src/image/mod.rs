//! Image upload core.
//!
//! This module provides the upload pipeline and the read/delete paths:
//! - Filename sanitization and upload validation
//! - Local-disk storage under collision-free names
//! - Metadata repository (SQLite and in-memory)
//! - Upload orchestration with compensating cleanup
//! - Listing, deletion and raw retrieval

mod display;
mod memory;
mod record;
mod repository;
mod sanitize;
mod service;
mod storage;
mod upload;
mod validator;

pub use display::display_name;
pub use memory::InMemoryImageRepository;
pub use record::{ImageRecord, NewImage};
pub use repository::{ImageRepository, RepositoryError, SqliteImageRepository};
pub use sanitize::{is_sanitized, sanitize};
pub use service::{ImagePage, ImageService, ImageSummary};
pub use storage::{ImageStorage, StorageError, StoredFile, StoredFileInfo, FALLBACK_STEM};
pub use upload::{public_url, UploadOrchestrator, UploadStage, UploadedImage};
pub use validator::{
    extension_of, UploadDraft, UploadValidator, ValidatedUpload, ValidationError,
    PLACEHOLDER_NAME,
};
