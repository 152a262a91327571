//! Upload validation.
//!
//! Uploads are checked for format and size before a single byte is written
//! to disk or to the database.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;

use crate::config::{normalize_formats, StorageConfig};

/// Name used when the client sends a file part without a filename.
pub const PLACEHOLDER_NAME: &str = "uploaded_file";

/// Reasons an upload is rejected before any write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The file extension is not in the allow-list.
    #[error("unsupported file format '{extension}'. Supported formats: {}", .supported.join(", "))]
    UnsupportedFormat {
        /// Extension derived from the declared name (may be empty).
        extension: String,
        /// Configured allow-list.
        supported: Vec<String>,
    },

    /// The file is larger than the configured limit.
    #[error("file size exceeds the maximum allowed size of {:.2} MB", megabytes(.max_size))]
    MaxSizeExceeded {
        /// Observed size in bytes.
        size: u64,
        /// Configured limit in bytes.
        max_size: u64,
    },

    /// The byte source could not be measured.
    #[error("failed to read upload: {0}")]
    Unreadable(String),
}

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// A file received from the client, not yet validated or persisted.
#[derive(Debug)]
pub struct UploadDraft<R> {
    /// Filename declared by the client, if any.
    pub original_name: Option<String>,
    /// File contents.
    pub source: R,
    /// Length declared by the transport, if any.
    pub declared_length: Option<u64>,
}

impl<R> UploadDraft<R> {
    /// Create a new draft.
    pub fn new(original_name: Option<String>, source: R) -> Self {
        Self {
            original_name,
            source,
            declared_length: None,
        }
    }

    /// Set the transport-declared length.
    pub fn with_declared_length(mut self, length: u64) -> Self {
        self.declared_length = Some(length);
        self
    }
}

/// Facts established about an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    /// Client-supplied name, or the placeholder.
    pub original_name: String,
    /// Lowercased name without extension, not yet sanitized.
    pub base_name: String,
    /// Lowercase extension with a leading dot, e.g. `.png`.
    pub extension: String,
    /// Measured size in bytes.
    pub size: u64,
}

/// Format and size policy.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    supported_formats: Vec<String>,
    max_size: u64,
}

impl UploadValidator {
    /// Create a validator. Extensions are normalized to `.ext` lowercase.
    pub fn new(supported_formats: &[String], max_size: u64) -> Self {
        Self {
            supported_formats: normalize_formats(supported_formats),
            max_size,
        }
    }

    /// Create a validator from the storage configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.supported_formats, config.max_file_size)
    }

    /// Normalized allow-list.
    pub fn supported_formats(&self) -> &[String] {
        &self.supported_formats
    }

    /// Size limit in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Check a draft. The source is measured and rewound to its start.
    pub fn validate<R: Read + Seek>(
        &self,
        draft: &mut UploadDraft<R>,
    ) -> Result<ValidatedUpload, ValidationError> {
        let original_name = match draft.original_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => PLACEHOLDER_NAME.to_string(),
        };

        let extension = extension_of(&original_name);
        if !self.supported_formats.contains(&extension) {
            tracing::warn!(extension = %extension, "Unsupported format");
            return Err(ValidationError::UnsupportedFormat {
                extension,
                supported: self.supported_formats.clone(),
            });
        }

        let size = measure(&mut draft.source)
            .map_err(|e| ValidationError::Unreadable(e.to_string()))?;

        if let Some(declared) = draft.declared_length {
            if declared != size {
                tracing::debug!(declared, size, "Declared length differs from measured size");
            }
        }

        if size > self.max_size {
            tracing::warn!(size, max_size = self.max_size, "File too large");
            return Err(ValidationError::MaxSizeExceeded {
                size,
                max_size: self.max_size,
            });
        }

        Ok(ValidatedUpload {
            base_name: base_name_of(&original_name),
            original_name,
            extension,
            size,
        })
    }

    /// Returns true if `filename` carries an allowed extension.
    pub fn is_supported(&self, filename: &str) -> bool {
        self.supported_formats.contains(&extension_of(filename))
    }
}

/// Lowercase extension with a leading dot, or an empty string.
///
/// A leading dot alone does not start an extension: `.png` has none.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

fn base_name_of(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
        .to_lowercase()
}

/// Total length of a seekable source; leaves the cursor at the start.
fn measure<R: Seek>(source: &mut R) -> io::Result<u64> {
    let size = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(0))?;
    Ok(size)
}
