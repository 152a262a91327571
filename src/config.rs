//! Configuration module for the image uploader.

use serde::Deserialize;
use std::path::Path;
use validator::Validate;

use crate::{Result, UploaderError};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins (empty = allow any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    #[validate(range(min = 1))]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_db_path() -> String {
    "data/images.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

/// Image storage and upload policy configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StorageConfig {
    /// Directory uploaded images are written to.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    /// Maximum accepted file size in bytes.
    #[serde(default = "default_max_file_size")]
    #[validate(range(min = 1))]
    pub max_file_size: u64,
    /// Accepted file extensions (".jpg" or "jpg", case-insensitive).
    #[serde(default = "default_supported_formats")]
    #[validate(length(min = 1))]
    pub supported_formats: Vec<String>,
    /// URL prefix under which stored files are served.
    #[serde(default = "default_public_url_prefix")]
    pub public_url_prefix: String,
}

fn default_image_dir() -> String {
    "images".to_string()
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_supported_formats() -> Vec<String> {
    [".jpg", ".jpeg", ".png", ".gif", ".webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_public_url_prefix() -> String {
    "/media".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            max_file_size: default_max_file_size(),
            supported_formats: default_supported_formats(),
            public_url_prefix: default_public_url_prefix(),
        }
    }
}

/// Where the image listing is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingSource {
    /// List metadata records from the database.
    #[default]
    Database,
    /// List files found in the storage directory.
    Filesystem,
}

/// Listing configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListingConfig {
    /// Listing source.
    #[serde(default)]
    pub source: ListingSource,
    /// Page size used when the client does not pass `limit`.
    #[serde(default = "default_limit")]
    #[validate(range(min = 1))]
    pub default_limit: u32,
    /// Upper bound for client-supplied `limit`.
    #[serde(default = "default_max_limit")]
    #[validate(range(min = 1))]
    pub max_limit: u32,
}

fn default_limit() -> u32 {
    10
}

fn default_max_limit() -> u32 {
    100
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            source: ListingSource::default(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory holding the log file.
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Log file name; only warnings and errors are written to it.
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_file_name() -> String {
    "app.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            file_name: default_log_file_name(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Listing configuration.
    #[serde(default)]
    pub listing: ListingConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(UploaderError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(s)
            .map_err(|e| UploaderError::Config(format!("config parse error: {e}")))?;
        config.storage.supported_formats = normalize_formats(&config.storage.supported_formats);
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `IMAGE_UPLOADER_IMAGE_DIR`: storage directory
    /// - `IMAGE_UPLOADER_LOG_DIR`: log directory
    /// - `IMAGE_UPLOADER_MAX_FILE_SIZE`: maximum file size in bytes
    /// - `IMAGE_UPLOADER_DATABASE_PATH`: SQLite database path
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = non_empty_env("IMAGE_UPLOADER_IMAGE_DIR") {
            self.storage.image_dir = dir;
        }
        if let Some(dir) = non_empty_env("IMAGE_UPLOADER_LOG_DIR") {
            self.logging.dir = dir;
        }
        if let Some(size) = non_empty_env("IMAGE_UPLOADER_MAX_FILE_SIZE") {
            match size.parse::<u64>() {
                Ok(size) => self.storage.max_file_size = size,
                Err(_) => {
                    tracing::warn!(value = %size, "Ignoring invalid IMAGE_UPLOADER_MAX_FILE_SIZE")
                }
            }
        }
        if let Some(path) = non_empty_env("IMAGE_UPLOADER_DATABASE_PATH") {
            self.database.path = path;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.database
            .validate()
            .map_err(|e| UploaderError::Config(format!("[database] {e}")))?;
        self.storage
            .validate()
            .map_err(|e| UploaderError::Config(format!("[storage] {e}")))?;
        self.listing
            .validate()
            .map_err(|e| UploaderError::Config(format!("[listing] {e}")))?;

        if self.listing.default_limit > self.listing.max_limit {
            return Err(UploaderError::Config(format!(
                "[listing] default_limit ({}) exceeds max_limit ({})",
                self.listing.default_limit, self.listing.max_limit
            )));
        }

        if !self.storage.public_url_prefix.starts_with('/') {
            return Err(UploaderError::Config(format!(
                "[storage] public_url_prefix must start with '/': {:?}",
                self.storage.public_url_prefix
            )));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Normalize extensions to lowercase with a leading dot, dropping duplicates.
pub fn normalize_formats(formats: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(formats.len());
    for format in formats {
        let trimmed = format.trim().trim_start_matches('.').to_lowercase();
        if trimmed.is_empty() {
            continue;
        }
        let ext = format!(".{trimmed}");
        if !normalized.contains(&ext) {
            normalized.push(ext);
        }
    }
    normalized
}
