//! Image storage on the local filesystem.
//!
//! This module provides physical file storage:
//! - `<stem>_<uuid><ext>` naming, unique without locking
//! - Streamed writes with removal of partially written files
//! - Load, delete, and directory listing

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::sanitize::sanitize;

/// Stem used when sanitizing leaves nothing of the original name.
pub const FALLBACK_STEM: &str = "uploaded_file";

/// Storage failures.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Writing a new file failed; no file is left behind when cleanup succeeds.
    #[error("failed to write file '{filename}': {source}")]
    WriteFailure {
        /// Target filename.
        filename: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Removing a stored file failed.
    #[error("failed to delete file '{filename}': {source}")]
    DeleteFailure {
        /// Target filename.
        filename: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading a stored file or the storage directory failed.
    #[error("failed to read '{filename}': {source}")]
    ReadFailure {
        /// Target filename or directory.
        filename: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The stored file does not exist.
    #[error("file '{0}' not found")]
    NotFound(String),

    /// The filename would resolve outside the storage directory.
    #[error("invalid filename '{0}'")]
    InvalidName(String),
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated filename.
    pub filename: String,
    /// Bytes copied from the source.
    pub bytes_written: u64,
}

/// A file found in the storage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFileInfo {
    /// Filename.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

/// Image storage rooted at a single flat directory.
///
/// The directory is shared between workers without coordination: every
/// stored name carries a fresh UUIDv4 and files are opened with
/// `create_new`, so two writers never target the same path.
#[derive(Debug, Clone)]
pub struct ImageStorage {
    /// Base directory for stored images.
    base_path: PathBuf,
}

impl ImageStorage {
    /// Create a new ImageStorage with the given base path.
    ///
    /// The directory is created lazily by the first write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Generate a stored name: `sanitize(base_name)_<uuid><extension>`.
    ///
    /// `extension` is expected with its leading dot (`.png`).
    pub fn generate_filename(base_name: &str, extension: &str) -> String {
        let stem = sanitize(&base_name.to_lowercase());
        let stem = if stem.is_empty() {
            FALLBACK_STEM
        } else {
            stem.as_str()
        };
        format!("{stem}_{}{extension}", Uuid::new_v4())
    }

    /// Stream `source` into a newly named file.
    ///
    /// On failure the partially written file is removed on a best-effort
    /// basis before the error is returned.
    pub fn store<R: Read>(
        &self,
        base_name: &str,
        extension: &str,
        mut source: R,
    ) -> Result<StoredFile, StorageError> {
        let filename = Self::generate_filename(base_name, extension);
        let write_error = |source: io::Error| StorageError::WriteFailure {
            filename: filename.clone(),
            source,
        };

        fs::create_dir_all(&self.base_path).map_err(write_error)?;

        let path = self.base_path.join(&filename);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(write_error)?;

        match Self::copy_into(file, &mut source) {
            Ok(bytes_written) => {
                tracing::debug!(filename = %filename, bytes_written, "Stored file");
                Ok(StoredFile {
                    filename,
                    bytes_written,
                })
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&path) {
                    tracing::warn!(
                        filename = %filename,
                        error = %cleanup,
                        "Failed to remove partially written file"
                    );
                }
                Err(write_error(e))
            }
        }
    }

    fn copy_into<R: Read>(file: File, source: &mut R) -> io::Result<u64> {
        let mut writer = BufWriter::new(file);
        let written = io::copy(source, &mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(written)
    }

    /// Load a stored file.
    pub fn load(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.file_path(filename)?;

        match fs::read(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(StorageError::ReadFailure {
                filename: filename.to_string(),
                source: e,
            }),
        }
    }

    /// Delete a stored file.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub fn delete(&self, filename: &str) -> Result<bool, StorageError> {
        let path = self.file_path(filename)?;

        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailure {
                filename: filename.to_string(),
                source: e,
            }),
        }
    }

    /// Check if a stored file exists.
    pub fn exists(&self, filename: &str) -> Result<bool, StorageError> {
        Ok(self.file_path(filename)?.is_file())
    }

    /// List regular files accepted by `keep`, newest first (ties by name).
    ///
    /// A missing storage directory lists as empty.
    pub fn list_files<F>(&self, keep: F) -> Result<Vec<StoredFileInfo>, StorageError>
    where
        F: Fn(&str) -> bool,
    {
        let read_error = |source: io::Error| StorageError::ReadFailure {
            filename: self.base_path.display().to_string(),
            source,
        };

        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_error(e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(read_error)?;
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };
            if !keep(&filename) {
                continue;
            }

            let metadata = entry.metadata().map_err(read_error)?;
            if !metadata.is_file() {
                continue;
            }

            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            files.push(StoredFileInfo {
                filename,
                size: metadata.len(),
                modified,
            });
        }

        files.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| a.filename.cmp(&b.filename))
        });

        Ok(files)
    }

    /// Get the full path for a stored name.
    ///
    /// Rejects names that are empty, contain a path separator or a `..`
    /// component, so callers can never reach outside the base directory.
    pub fn file_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        if !is_safe_filename(filename) {
            return Err(StorageError::InvalidName(filename.to_string()));
        }
        Ok(self.base_path.join(filename))
    }
}

fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && !filename.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn setup_storage() -> (TempDir, ImageStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = ImageStorage::new(temp_dir.path().join("images"));
        (temp_dir, storage)
    }

    /// Reader that fails after yielding some bytes.
    struct FailingReader {
        remaining: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionAborted,
                    "client went away",
                ));
            }
            let n = self.remaining.min(buf.len());
            buf[..n].fill(0xAB);
            self.remaining -= n;
            Ok(n)
        }
    }

    #[test]
    fn test_store_creates_directory() {
        let (_temp_dir, storage) = setup_storage();
        assert!(!storage.base_path().exists());

        storage.store("photo", ".png", Cursor::new(b"data")).unwrap();

        assert!(storage.base_path().is_dir());
    }

    #[test]
    fn test_store_and_load() {
        let (_temp_dir, storage) = setup_storage();
        let content = b"\x89PNG\r\n\x1a\n";

        let stored = storage.store("photo", ".png", Cursor::new(content)).unwrap();

        assert_eq!(stored.bytes_written, content.len() as u64);
        assert!(stored.filename.starts_with("photo_"));
        assert!(stored.filename.ends_with(".png"));
        assert_eq!(storage.load(&stored.filename).unwrap(), content);
    }

    #[test]
    fn test_generate_filename_shape() {
        let name = ImageStorage::generate_filename("Café Menu", ".jpg");

        let stem = name.strip_suffix(".jpg").unwrap();
        let (prefix, uuid) = stem.split_at(stem.len() - 36);
        assert_eq!(prefix, "cafe_menu_");
        assert!(Uuid::parse_str(uuid).is_ok());
    }

    #[test]
    fn test_generate_filename_fallback_stem() {
        let name = ImageStorage::generate_filename("日本語", ".png");
        assert!(name.starts_with("uploaded_file_"));
    }

    #[test]
    fn test_generate_filename_unique_under_concurrency() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..1250)
                        .map(|_| ImageStorage::generate_filename("same", ".png"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut names = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(names.insert(name), "duplicate filename generated");
            }
        }
        assert_eq!(names.len(), 10_000);
    }

    #[test]
    fn test_store_failure_removes_partial_file() {
        let (_temp_dir, storage) = setup_storage();

        let err = storage
            .store("broken", ".png", FailingReader { remaining: 64 * 1024 })
            .unwrap_err();

        assert!(matches!(err, StorageError::WriteFailure { .. }));
        assert_eq!(fs::read_dir(storage.base_path()).unwrap().count(), 0);
    }

    #[test]
    fn test_load_not_found() {
        let (_temp_dir, storage) = setup_storage();

        let result = storage.load("missing_1.png");

        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let (_temp_dir, storage) = setup_storage();
        let stored = storage.store("a", ".gif", Cursor::new(b"GIF")).unwrap();
        assert!(storage.exists(&stored.filename).unwrap());

        assert!(storage.delete(&stored.filename).unwrap());
        assert!(!storage.exists(&stored.filename).unwrap());
    }

    #[test]
    fn test_delete_not_found() {
        let (_temp_dir, storage) = setup_storage();

        assert!(!storage.delete("missing_1.png").unwrap());
    }

    #[test]
    fn test_rejects_traversal_names() {
        let (_temp_dir, storage) = setup_storage();

        for name in ["", ".", "..", "../secret.png", "a/b.png", "a\\b.png"] {
            assert!(
                matches!(storage.load(name), Err(StorageError::InvalidName(_))),
                "{name:?} should be rejected"
            );
            assert!(matches!(
                storage.delete(name),
                Err(StorageError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn test_list_files_filters_and_orders() {
        let (_temp_dir, storage) = setup_storage();
        fs::create_dir_all(storage.base_path()).unwrap();
        fs::write(storage.base_path().join("a.png"), b"1").unwrap();
        fs::write(storage.base_path().join("b.txt"), b"22").unwrap();
        fs::create_dir(storage.base_path().join("dir.png")).unwrap();

        let files = storage.list_files(|name| name.ends_with(".png")).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "a.png");
        assert_eq!(files[0].size, 1);
    }

    #[test]
    fn test_list_files_missing_directory() {
        let (_temp_dir, storage) = setup_storage();

        assert!(storage.list_files(|_| true).unwrap().is_empty());
    }
}
