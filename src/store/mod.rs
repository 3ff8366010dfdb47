//! Document store collaborator interface
//!
//! The store is the authoritative side of the system; this crate only
//! consumes it. [`DocumentStore`] is the read surface the index
//! synchronizer needs, and [`StoreObserver`] is the notification seam a
//! store implementation accepts at configuration time. Observers get one
//! unified callback for both puts and deletes; they are expected to
//! re-derive the document's current state from the store rather than trust
//! the event.

pub mod memory;

pub use memory::InMemoryStore;

use crate::models::{Document, DocumentId};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors reported by the document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// No document exists for the identity
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    /// Backend failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Read surface of the document store consumed by the indexing side
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List all collection names
    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    /// List the identities of all documents in a collection
    async fn list_collection_documents(&self, collection: &str) -> StoreResult<Vec<DocumentId>>;

    /// Fetch a document by identity; `StoreError::NotFound` when absent
    async fn get(&self, id: &DocumentId) -> StoreResult<Document>;
}

/// Observer of store-level document changes.
///
/// Fired synchronously on every put and delete. Implementations must not
/// propagate failures back into the store path; indexing trouble is never
/// allowed to take down the primary store-serving path.
#[async_trait]
pub trait StoreObserver: Send + Sync {
    async fn document_changed(&self, store: &dyn DocumentStore, id: &DocumentId);
}
