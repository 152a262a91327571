//! Web API module for the image uploader.
//!
//! This module provides the REST API over the image service: multipart
//! upload, paginated listing, deletion and raw file retrieval.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_router, ApiDoc};
pub use server::WebServer;
