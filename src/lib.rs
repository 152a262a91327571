//! Image Uploader
//!
//! An HTTP service that accepts image uploads, stores them on local disk
//! under collision-free names and keeps their metadata in SQLite.

pub mod config;
pub mod db;
pub mod error;
pub mod image;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{Result, UploaderError};
pub use image::{
    ImageRecord, ImageRepository, ImageService, ImageStorage, InMemoryImageRepository,
    SqliteImageRepository, UploadDraft, UploadValidator,
};
pub use web::WebServer;
