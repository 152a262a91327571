//! In-memory image repository.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::record::{ImageRecord, NewImage};
use super::repository::{ImageRepository, RepositoryError};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: Vec<ImageRecord>,
}

/// Repository backed by a vector, for tests and database-less runs.
///
/// Records are kept in insertion order, so ids grow monotonically and
/// listing walks the vector backwards.
#[derive(Debug, Default)]
pub struct InMemoryImageRepository {
    inner: RwLock<Inner>,
}

impl InMemoryImageRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageRepository for InMemoryImageRepository {
    async fn create(&self, image: &NewImage) -> Result<ImageRecord, RepositoryError> {
        let mut inner = self.inner.write().await;

        if inner.records.iter().any(|r| r.filename == image.filename) {
            return Err(RepositoryError::CreationFailure {
                filename: image.filename.clone(),
                reason: "UNIQUE constraint failed: images.filename".to_string(),
            });
        }

        inner.next_id += 1;
        let record = image.clone().into_record(inner.next_id, Utc::now());
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner.records.retain(|r| r.id != id);
        Ok(inner.records.len() < before)
    }

    async fn delete_by_filename(&self, filename: &str) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().await;
        let before = inner.records.len();
        inner.records.retain(|r| r.filename != filename);
        Ok(inner.records.len() < before)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ImageRecord>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    async fn get_by_filename(
        &self,
        filename: &str,
    ) -> Result<Option<ImageRecord>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.records.iter().find(|r| r.filename == filename).cloned())
    }

    async fn list_all(&self, limit: u32, offset: u32) -> Result<Vec<ImageRecord>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut records = inner.records.clone();
        records.sort_by(|a, b| b.upload_time.cmp(&a.upload_time).then(b.id.cmp(&a.id)));

        Ok(records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.inner.read().await.records.len() as u64)
    }
}
