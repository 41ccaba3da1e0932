use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Document, DocumentPatch, NewDocument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Keyed persistence of document records.
///
/// Implementations must make every call atomic with respect to concurrent
/// callers. Two overlapping `update`s on one id end up applied in a definite
/// order and the later one wins for every field it carries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Document>, StoreError>;

    /// First document (lowest id) with this exact filename
    async fn get_by_filename(&self, filename: &str) -> Result<Option<Document>, StoreError>;

    /// All documents ordered by id
    async fn list(&self) -> Result<Vec<Document>, StoreError>;

    /// Number of stored documents, without loading them
    async fn count(&self) -> Result<usize, StoreError>;

    /// Allocates a fresh id
    async fn create(&self, new_doc: NewDocument) -> Result<Document, StoreError>;

    /// Returns `None` for an unknown id; never creates a record.
    async fn update(&self, id: i64, patch: DocumentPatch) -> Result<Option<Document>, StoreError>;

    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
