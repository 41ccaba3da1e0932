use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::docstore::{DocumentStore, StoreError};
use crate::models::{Document, DocumentPatch, NewDocument};

struct MemState {
    docs: BTreeMap<i64, Document>,
    next_id: i64,
}

/// In-process document store, used when no database is configured
pub struct MemStore {
    state: RwLock<MemState>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemState {
                docs: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemStore {
    async fn get(&self, id: i64) -> Result<Option<Document>, StoreError> {
        Ok(self.state.read().await.docs.get(&id).cloned())
    }

    async fn get_by_filename(&self, filename: &str) -> Result<Option<Document>, StoreError> {
        let state = self.state.read().await;
        Ok(state.docs.values().find(|doc| doc.filename == filename).cloned())
    }

    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        Ok(self.state.read().await.docs.values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.state.read().await.docs.len())
    }

    async fn create(&self, new_doc: NewDocument) -> Result<Document, StoreError> {
        let mut state = self.state.write().await;
        let id = state.next_id;
        state.next_id += 1;
        let doc = Document::from_new(id, new_doc);
        state.docs.insert(id, doc.clone());
        debug!("Created document {} ({})", id, doc.filename);
        Ok(doc)
    }

    async fn update(&self, id: i64, patch: DocumentPatch) -> Result<Option<Document>, StoreError> {
        let mut state = self.state.write().await;
        match state.docs.get_mut(&id) {
            Some(doc) => {
                doc.apply(patch);
                Ok(Some(doc.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.state.write().await.docs.remove(&id).is_some())
    }
}
