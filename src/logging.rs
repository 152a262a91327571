//! Logging configuration and initialization for the image uploader.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize the logging system with the given configuration.
///
/// Every event at the configured level goes to stdout. The log file under
/// `config.dir` is opened in append mode and only receives warnings and
/// errors, so it stays a short record of failed uploads and cleanups.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = parse_level(&config.level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let dir = Path::new(&config.dir);
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(&config.file_name))?;
    let log_file = Arc::new(log_file);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(log_file)
                .with_ansi(false)
                .with_target(true)
                .with_filter(LevelFilter::WARN),
        )
        .init();

    Ok(())
}

/// Initialize console-only logging (for development/testing).
pub fn init_console_only(level: &str) {
    let level = parse_level(level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(true)
                .with_target(true),
        )
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level() {
        let cases = [
            ("trace", Level::TRACE),
            ("DEBUG", Level::DEBUG),
            ("Info", Level::INFO),
            ("warning", Level::WARN),
            ("error", Level::ERROR),
            ("verbose", Level::INFO),
            ("", Level::INFO),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_level(input), expected, "level {input:?}");
        }
    }

    #[test]
    fn test_file_receives_only_warnings() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            level: "debug".to_string(),
            dir: temp_dir.path().join("logs").to_string_lossy().into_owned(),
            file_name: "app.log".to_string(),
        };

        init(&config).unwrap();
        tracing::info!("routine upload event");
        tracing::warn!("compensating delete failed");

        let contents = fs::read_to_string(temp_dir.path().join("logs/app.log")).unwrap();
        assert!(contents.contains("compensating delete failed"));
        assert!(!contents.contains("routine upload event"));
    }
}
