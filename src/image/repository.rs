//! Image metadata repository.
//!
//! [`ImageRepository`] is the storage-agnostic contract; the service holds it
//! as `Arc<dyn ImageRepository>`. [`SqliteImageRepository`] is the production
//! implementation, [`super::InMemoryImageRepository`] the test double.

use async_trait::async_trait;
use sqlx::SqlitePool;
use thiserror::Error;

use super::record::{ImageRecord, NewImage};

/// Repository failures. Backing-store error types never cross this boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A record could not be created.
    #[error("failed to create image record '{filename}': {reason}")]
    CreationFailure {
        /// Filename of the rejected record.
        filename: String,
        /// Backing-store message.
        reason: String,
    },

    /// A record could not be deleted.
    #[error("failed to delete image record '{identifier}': {reason}")]
    DeletionFailure {
        /// ID or filename of the record.
        identifier: String,
        /// Backing-store message.
        reason: String,
    },

    /// A read query failed.
    #[error("query '{operation}' failed: {reason}")]
    QueryFailure {
        /// Name of the failed operation.
        operation: &'static str,
        /// Backing-store message.
        reason: String,
    },

    /// The backing store could not be reached.
    #[error("database connection failed: {0}")]
    ConnectionFailure(String),
}

impl RepositoryError {
    /// Returns true if the store was unreachable rather than the statement failing.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, RepositoryError::ConnectionFailure(_))
    }
}

/// Metadata CRUD over a persistent store.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    /// Insert a record; `id` and `upload_time` are assigned by the store.
    async fn create(&self, image: &NewImage) -> Result<ImageRecord, RepositoryError>;

    /// Delete by ID. Returns false if no row existed.
    async fn delete_by_id(&self, id: i64) -> Result<bool, RepositoryError>;

    /// Delete by stored filename. Returns false if no row existed.
    async fn delete_by_filename(&self, filename: &str) -> Result<bool, RepositoryError>;

    /// Get a record by ID.
    async fn get_by_id(&self, id: i64) -> Result<Option<ImageRecord>, RepositoryError>;

    /// Get a record by stored filename.
    async fn get_by_filename(&self, filename: &str)
        -> Result<Option<ImageRecord>, RepositoryError>;

    /// List records newest first, ties broken by insertion order (newest first).
    ///
    /// `limit` and `offset` are trusted; the boundary clamps them.
    async fn list_all(&self, limit: u32, offset: u32) -> Result<Vec<ImageRecord>, RepositoryError>;

    /// Total number of records.
    async fn count(&self) -> Result<u64, RepositoryError>;
}

/// Classify a sqlx error, keeping only its message.
fn classify(e: sqlx::Error, otherwise: impl FnOnce(String) -> RepositoryError) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => RepositoryError::ConnectionFailure(e.to_string()),
        other => otherwise(other.to_string()),
    }
}

fn query_failure(operation: &'static str) -> impl FnOnce(String) -> RepositoryError {
    move |reason| RepositoryError::QueryFailure { operation, reason }
}

const SELECT_COLUMNS: &str = "SELECT id, filename, original_name, size, file_type, upload_time FROM images";

/// SQLite-backed repository.
///
/// Each call acquires a pooled connection for a single statement.
#[derive(Debug, Clone)]
pub struct SqliteImageRepository {
    pool: SqlitePool,
}

impl SqliteImageRepository {
    /// Create a new SqliteImageRepository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImageRepository for SqliteImageRepository {
    async fn create(&self, image: &NewImage) -> Result<ImageRecord, RepositoryError> {
        let record = sqlx::query_as::<_, ImageRecord>(
            "INSERT INTO images (filename, original_name, size, file_type)
             VALUES (?, ?, ?, ?)
             RETURNING id, filename, original_name, size, file_type, upload_time",
        )
        .bind(&image.filename)
        .bind(&image.original_name)
        .bind(image.size)
        .bind(&image.file_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            classify(e, |reason| RepositoryError::CreationFailure {
                filename: image.filename.clone(),
                reason,
            })
        })?;

        tracing::debug!(id = record.id, filename = %record.filename, "Image record created");
        Ok(record)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                classify(e, |reason| RepositoryError::DeletionFailure {
                    identifier: id.to_string(),
                    reason,
                })
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_filename(&self, filename: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM images WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                classify(e, |reason| RepositoryError::DeletionFailure {
                    identifier: filename.to_string(),
                    reason,
                })
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ImageRecord>, RepositoryError> {
        sqlx::query_as::<_, ImageRecord>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, query_failure("get_by_id")))
    }

    async fn get_by_filename(
        &self,
        filename: &str,
    ) -> Result<Option<ImageRecord>, RepositoryError> {
        sqlx::query_as::<_, ImageRecord>(&format!("{SELECT_COLUMNS} WHERE filename = ?"))
            .bind(filename)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(e, query_failure("get_by_filename")))
    }

    async fn list_all(&self, limit: u32, offset: u32) -> Result<Vec<ImageRecord>, RepositoryError> {
        sqlx::query_as::<_, ImageRecord>(&format!(
            "{SELECT_COLUMNS} ORDER BY upload_time DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify(e, query_failure("list_all")))
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, query_failure("count")))?;
        Ok(count.0.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup() -> (Database, SqliteImageRepository) {
        let db = Database::open_in_memory().await.unwrap();
        let repo = SqliteImageRepository::new(db.pool().clone());
        (db, repo)
    }

    fn new_image(filename: &str) -> NewImage {
        NewImage::new(filename, "café.PNG", 2_097_152, ".png")
    }

    #[tokio::test]
    async fn test_create_and_get_by_filename() {
        let (_db, repo) = setup().await;
        let image = new_image("cafe_1.png");

        let created = repo.create(&image).await.unwrap();
        assert!(created.id > 0);

        let fetched = repo.get_by_filename("cafe_1.png").await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.filename, image.filename);
        assert_eq!(fetched.original_name, image.original_name);
        assert_eq!(fetched.size, image.size);
        assert_eq!(fetched.file_type, image.file_type);
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let (_db, repo) = setup().await;
        let created = repo.create(&new_image("a_1.png")).await.unwrap();

        assert_eq!(repo.get_by_id(created.id).await.unwrap(), Some(created));
        assert!(repo.get_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (_db, repo) = setup().await;

        assert!(repo.get_by_filename("missing.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_filename_is_creation_failure() {
        let (_db, repo) = setup().await;
        repo.create(&new_image("dup_1.png")).await.unwrap();

        let err = repo.create(&new_image("dup_1.png")).await.unwrap_err();

        assert!(matches!(
            err,
            RepositoryError::CreationFailure { ref filename, .. } if filename == "dup_1.png"
        ));
    }

    #[tokio::test]
    async fn test_delete_by_filename() {
        let (_db, repo) = setup().await;
        repo.create(&new_image("gone_1.png")).await.unwrap();

        assert!(repo.delete_by_filename("gone_1.png").await.unwrap());
        assert!(!repo.delete_by_filename("gone_1.png").await.unwrap());
        assert!(repo.get_by_filename("gone_1.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let (_db, repo) = setup().await;
        let created = repo.create(&new_image("b_1.png")).await.unwrap();

        assert!(repo.delete_by_id(created.id).await.unwrap());
        assert!(!repo.delete_by_id(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let (_db, repo) = setup().await;
        for name in ["first_1.png", "second_1.png", "third_1.png"] {
            repo.create(&new_image(name)).await.unwrap();
        }

        let records = repo.list_all(10, 0).await.unwrap();
        let names: Vec<_> = records.iter().map(|r| r.filename.as_str()).collect();

        assert_eq!(names, vec!["third_1.png", "second_1.png", "first_1.png"]);
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_list_all_pagination() {
        let (_db, repo) = setup().await;
        for i in 0..5 {
            repo.create(&new_image(&format!("img_{i}.png"))).await.unwrap();
        }

        let page = repo.list_all(2, 2).await.unwrap();
        let names: Vec<_> = page.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["img_2.png", "img_1.png"]);

        assert!(repo.list_all(10, 5).await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_closed_pool_is_connection_failure() {
        let (db, repo) = setup().await;
        db.close().await;

        let err = repo.count().await.unwrap_err();

        assert!(err.is_connection_failure());
    }
}
