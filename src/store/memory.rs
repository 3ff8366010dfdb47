use crate::models::{Document, DocumentId};
use crate::store::{DocumentStore, StoreError, StoreObserver, StoreResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// In-memory document store (for hosting tests and small deployments).
///
/// Observers are registered at configuration time, before the store is
/// shared; every put and delete notifies each observer in registration
/// order with the mutated document's identity.
pub struct InMemoryStore {
    documents: Arc<DashMap<DocumentId, Document>>,
    observers: Vec<Arc<dyn StoreObserver>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(DashMap::new()),
            observers: Vec::new(),
        }
    }

    /// Register a change observer. Must be called before the store is
    /// shared; registration is not thread-safe by design.
    pub fn register_observer(&mut self, observer: Arc<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    /// Put a document, assigning the next revision, and notify observers.
    pub async fn put(&self, mut document: Document) -> StoreResult<()> {
        let id = document.id();
        let previous = self.documents.get(&id).map(|entry| entry.revision);
        document.revision = previous.map_or(1, |rev| rev + 1);
        self.documents.insert(id.clone(), document);

        tracing::debug!(document_id = %id, "document stored");
        self.notify(&id).await;
        Ok(())
    }

    /// Delete a document and notify observers; `NotFound` when absent.
    pub async fn delete(&self, id: &DocumentId) -> StoreResult<()> {
        if self.documents.remove(id).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }

        tracing::debug!(document_id = %id, "document deleted");
        self.notify(id).await;
        Ok(())
    }

    async fn notify(&self, id: &DocumentId) {
        for observer in &self.observers {
            observer.document_changed(self, id).await;
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let collections: BTreeSet<String> = self
            .documents
            .iter()
            .map(|entry| entry.key().collection.clone())
            .collect();
        Ok(collections.into_iter().collect())
    }

    async fn list_collection_documents(&self, collection: &str) -> StoreResult<Vec<DocumentId>> {
        let mut ids: Vec<DocumentId> = self
            .documents
            .iter()
            .filter(|entry| entry.key().collection == collection)
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ids)
    }

    async fn get(&self, id: &DocumentId) -> StoreResult<Document> {
        self.documents
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
