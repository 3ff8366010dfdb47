//! Store-to-index synchronization
//!
//! The synchronizer is registered as a [`StoreObserver`] and never trusts
//! the notification label: every event is resolved by re-fetching the
//! document from the store by identity. Still present means upsert, gone
//! means delete. That collapses puts and deletes into one idempotent
//! reconciliation step and tolerates duplicate, reordered, and
//! delete-then-recreate races. The same rule drives bulk reindexing and
//! the queued worker path.

use crate::models::DocumentId;
use crate::search::error::SearchResult;
use crate::search::index::IndexManager;
use crate::search::mutation::MutationBatch;
use crate::search::writer::WriterBroker;
use crate::store::{DocumentStore, StoreError, StoreObserver};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome summary of a bulk reindex run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReindexReport {
    /// Collections whose batch committed
    pub collections_indexed: usize,

    /// Collections skipped because no writer was obtainable
    pub collections_skipped: usize,

    /// Collections whose batch was rolled back after an error
    pub collections_failed: usize,

    /// Documents upserted across all committed batches
    pub documents_indexed: usize,
}

/// Keeps the index reconciled with the store
pub struct IndexSynchronizer {
    manager: Arc<IndexManager>,
    broker: WriterBroker,
}

impl IndexSynchronizer {
    pub fn new(manager: Arc<IndexManager>, broker: WriterBroker) -> Self {
        Self { manager, broker }
    }

    pub fn manager(&self) -> &Arc<IndexManager> {
        &self.manager
    }

    /// Re-derive the correct index state for one identity from the store.
    ///
    /// When no writer is obtainable the mutation is dropped after logging;
    /// the resulting store/index gap is bounded and repaired by the next
    /// reindex. All failures end in rollback, never a partial commit.
    pub async fn reconcile(&self, store: &dyn DocumentStore, id: &DocumentId) {
        let Some(mut batch) = self.broker.lease(&self.manager).await else {
            tracing::warn!(
                document_id = %id,
                "unable to get index writer (locked), dropping index update"
            );
            return;
        };

        let step = match store.get(id).await {
            Ok(document) => batch.upsert(&document),
            Err(StoreError::NotFound(_)) => batch.delete(id),
            Err(err) => {
                tracing::error!(document_id = %id, error = %err, "store lookup failed during reconcile");
                if let Err(err) = batch.rollback() {
                    tracing::error!(error = %err, "rollback failed");
                }
                return;
            }
        };

        match step {
            Ok(()) => {
                if let Err(err) = batch.commit() {
                    tracing::error!(document_id = %id, error = %err, "commit failed");
                }
            }
            Err(err) => {
                tracing::error!(document_id = %id, error = %err, "exception while indexing");
                if let Err(err) = batch.rollback() {
                    tracing::error!(error = %err, "rollback failed");
                }
            }
        }
    }

    /// Rebuild the index from the store's full contents.
    ///
    /// One writer batch per collection: a collection whose writer cannot
    /// be obtained is skipped, a collection whose batch errors is rolled
    /// back, and either way the run continues with the next collection.
    /// `prefix` restricts the rebuild to documents whose name starts with
    /// it, case-sensitively.
    pub async fn reindex(
        &self,
        store: &dyn DocumentStore,
        prefix: Option<&str>,
    ) -> crate::Result<ReindexReport> {
        let mut report = ReindexReport::default();

        for collection in store.list_collections().await? {
            let Some(mut batch) = self.broker.lease(&self.manager).await else {
                tracing::warn!(
                    collection = %collection,
                    "unable to get index writer (locked), skipping collection"
                );
                report.collections_skipped += 1;
                continue;
            };

            match self
                .index_collection(store, &collection, prefix, &mut batch)
                .await
            {
                Ok(count) => match batch.commit() {
                    Ok(()) => {
                        tracing::debug!(
                            collection = %collection,
                            documents = count,
                            "collection reindexed"
                        );
                        report.collections_indexed += 1;
                        report.documents_indexed += count;
                    }
                    Err(err) => {
                        tracing::error!(collection = %collection, error = %err, "commit failed");
                        report.collections_failed += 1;
                    }
                },
                Err(err) => {
                    tracing::error!(
                        collection = %collection,
                        error = %err,
                        "exception while indexing, rolling back collection"
                    );
                    if let Err(err) = batch.rollback() {
                        tracing::error!(error = %err, "rollback failed");
                    }
                    report.collections_failed += 1;
                }
            }
        }

        Ok(report)
    }

    async fn index_collection(
        &self,
        store: &dyn DocumentStore,
        collection: &str,
        prefix: Option<&str>,
        batch: &mut MutationBatch<'_>,
    ) -> crate::Result<usize> {
        let mut count = 0;

        for id in store.list_collection_documents(collection).await? {
            if let Some(prefix) = prefix {
                if !id.name.starts_with(prefix) {
                    continue;
                }
            }
            match store.get(&id).await {
                Ok(document) => {
                    batch.upsert(&document)?;
                    count += 1;
                }
                // Deleted between listing and fetch; nothing to index.
                Err(StoreError::NotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(count)
    }

    /// Compact index storage by merging segments.
    ///
    /// Expects no concurrent writers; returns without optimizing when the
    /// writer is unavailable.
    pub async fn optimize(&self) -> SearchResult<bool> {
        let Some(batch) = self.broker.lease(&self.manager).await else {
            tracing::warn!("unable to get index writer (locked), skipping optimize");
            return Ok(false);
        };
        batch.optimize()?;
        Ok(true)
    }
}

#[async_trait]
impl StoreObserver for IndexSynchronizer {
    async fn document_changed(&self, store: &dyn DocumentStore, id: &DocumentId) {
        self.reconcile(store, id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use crate::search::query::QueryEngine;
    use crate::search::schema::SearchSchema;
    use crate::store::InMemoryStore;
    use std::time::Duration;
    use tempfile::TempDir;

    fn synchronizer(manager: Arc<IndexManager>) -> IndexSynchronizer {
        IndexSynchronizer::new(
            manager,
            WriterBroker::new(5, Duration::from_millis(10), 15_000_000),
        )
    }

    fn text_doc(collection: &str, name: &str, text: &str) -> Document {
        let mut doc = Document::new(collection, name);
        doc.text = text.to_string();
        doc
    }

    #[tokio::test]
    async fn test_reconcile_upserts_present_document() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            Arc::new(IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap());
        let sync = synchronizer(manager.clone());

        let store = InMemoryStore::new();
        store.put(text_doc("bag1", "doc1", "sunflower")).await.unwrap();

        sync.reconcile(&store, &DocumentId::new("bag1", "doc1"))
            .await;

        let engine = QueryEngine::new(manager, 51);
        let hits = engine.search("sunflower", 51).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "bag1:doc1");
    }

    #[tokio::test]
    async fn test_reconcile_deletes_absent_document() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            Arc::new(IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap());
        let sync = synchronizer(manager.clone());

        let store = InMemoryStore::new();
        let id = DocumentId::new("bag1", "doc1");

        store.put(text_doc("bag1", "doc1", "sunflower")).await.unwrap();
        sync.reconcile(&store, &id).await;

        // Document disappears from the store; the stale event label does
        // not matter, reconciliation re-checks.
        store.delete(&id).await.unwrap();
        sync.reconcile(&store, &id).await;

        let engine = QueryEngine::new(manager, 51);
        assert!(engine.search("sunflower", 51).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            Arc::new(IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap());
        let sync = synchronizer(manager.clone());

        let store = InMemoryStore::new();
        let id = DocumentId::new("bag1", "doc1");
        store.put(text_doc("bag1", "doc1", "evergreen")).await.unwrap();

        sync.reconcile(&store, &id).await;
        sync.reconcile(&store, &id).await;

        let engine = QueryEngine::new(manager.clone(), 51);
        assert_eq!(engine.search("evergreen", 51).unwrap().len(), 1);
        assert_eq!(manager.stats().unwrap().total_documents, 1);
    }

    #[tokio::test]
    async fn test_reconcile_drops_mutation_when_writer_held() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            Arc::new(IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap());
        let sync = IndexSynchronizer::new(
            manager.clone(),
            WriterBroker::new(2, Duration::from_millis(5), 15_000_000),
        );

        let store = InMemoryStore::new();
        store.put(text_doc("bag1", "doc1", "contended")).await.unwrap();

        let held = WriterBroker::new(1, Duration::from_millis(5), 15_000_000)
            .lease(&manager)
            .await
            .unwrap();

        sync.reconcile(&store, &DocumentId::new("bag1", "doc1"))
            .await;
        held.rollback().unwrap();

        // The mutation was dropped, leaving the known consistency gap
        let engine = QueryEngine::new(manager.clone(), 51);
        assert!(engine.search("contended", 51).unwrap().is_empty());

        // A later reindex repairs it
        sync.reindex(&store, None).await.unwrap();
        assert_eq!(engine.search("contended", 51).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reindex_full_store() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            Arc::new(IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap());
        let sync = synchronizer(manager.clone());

        let store = InMemoryStore::new();
        store.put(text_doc("alpha", "one", "shared")).await.unwrap();
        store.put(text_doc("alpha", "two", "shared")).await.unwrap();
        store.put(text_doc("beta", "three", "shared")).await.unwrap();

        let report = sync.reindex(&store, None).await.unwrap();
        assert_eq!(report.collections_indexed, 2);
        assert_eq!(report.documents_indexed, 3);
        assert_eq!(report.collections_skipped, 0);
        assert_eq!(report.collections_failed, 0);

        let engine = QueryEngine::new(manager, 51);
        assert_eq!(engine.search("shared", 51).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reindex_with_prefix_filter() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            Arc::new(IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap());
        let sync = synchronizer(manager.clone());

        let store = InMemoryStore::new();
        store.put(text_doc("bag1", "apple", "fruit")).await.unwrap();
        store.put(text_doc("bag1", "apricot", "fruit")).await.unwrap();
        store.put(text_doc("bag1", "banana", "fruit")).await.unwrap();
        store.put(text_doc("bag1", "Avocado", "fruit")).await.unwrap();

        let report = sync.reindex(&store, Some("ap")).await.unwrap();
        // Case-sensitive prefix match: Avocado does not count
        assert_eq!(report.documents_indexed, 2);

        let engine = QueryEngine::new(manager, 51);
        assert_eq!(engine.search("fruit", 51).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_reindex_skips_collections_without_writer() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            Arc::new(IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap());
        let sync = IndexSynchronizer::new(
            manager.clone(),
            WriterBroker::new(1, Duration::from_millis(5), 15_000_000),
        );

        let store = InMemoryStore::new();
        store.put(text_doc("alpha", "one", "word")).await.unwrap();
        store.put(text_doc("beta", "two", "word")).await.unwrap();

        let held = WriterBroker::new(1, Duration::from_millis(5), 15_000_000)
            .lease(&manager)
            .await
            .unwrap();
        let report = sync.reindex(&store, None).await.unwrap();
        held.rollback().unwrap();

        assert_eq!(report.collections_skipped, 2);
        assert_eq!(report.collections_indexed, 0);
    }

    #[tokio::test]
    async fn test_optimize_runs_when_idle() {
        let temp_dir = TempDir::new().unwrap();
        let manager =
            Arc::new(IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap());
        let sync = synchronizer(manager.clone());

        let store = InMemoryStore::new();
        store.put(text_doc("bag1", "doc1", "words")).await.unwrap();
        sync.reindex(&store, None).await.unwrap();

        assert!(sync.optimize().await.unwrap());
    }
}
