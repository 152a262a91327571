use std::sync::Arc;

use tracing::{error, info};

use image_uploader::web::AppState;
use image_uploader::{Config, Database, SqliteImageRepository, WebServer};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {CONFIG_PATH}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = image_uploader::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        image_uploader::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("Image Uploader starting");
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );
    info!(
        image_dir = %config.storage.image_dir,
        max_file_size = config.storage.max_file_size,
        formats = ?config.storage.supported_formats,
        "Storage configured"
    );

    let db = match Database::open(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let repository = Arc::new(SqliteImageRepository::new(db.pool().clone()));
    let state = AppState::new(&config, repository);

    let server = match WebServer::new(&config, state) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {}", e);
    }

    db.close().await;
    info!("Image Uploader stopped");
}
