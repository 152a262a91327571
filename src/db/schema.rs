//! Database schema and migrations.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Image metadata
    r#"
CREATE TABLE images (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    filename        TEXT NOT NULL UNIQUE,      -- stored name: <stem>_<uuid>.<ext>
    original_name   TEXT NOT NULL,             -- client-supplied name
    size            INTEGER NOT NULL,          -- bytes
    file_type       TEXT NOT NULL,             -- normalized extension, e.g. '.png'
    upload_time     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX idx_images_upload_time ON images(upload_time);
"#,
];
