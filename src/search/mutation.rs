//! Index mutation batches
//!
//! A [`MutationBatch`] is one exclusive writer session: zero or more
//! upserts and deletes followed by exactly one commit or rollback. Both
//! finishers consume the batch, so a handle cannot be left dangling, and a
//! half-applied batch can always be discarded as a unit. On any error
//! mid-batch the correct recovery is rollback, never a partial commit.

use crate::models::{Document, DocumentId};
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::IndexManager;
use crate::search::schema::{ProjectedDocument, IDENTITY_FIELD};
use tantivy::schema::Field;
use tantivy::{IndexWriter, TantivyDocument, Term};

/// A short-lived exclusive mutation session against the index
pub struct MutationBatch<'a> {
    manager: &'a IndexManager,
    writer: IndexWriter,
}

impl<'a> MutationBatch<'a> {
    pub(crate) fn new(manager: &'a IndexManager, writer: IndexWriter) -> Self {
        Self { manager, writer }
    }

    fn identity_field(&self) -> SearchResult<Field> {
        self.manager.schema().get_field(IDENTITY_FIELD).map_err(|_| {
            SearchError::SchemaError(format!(
                "index schema is missing the '{}' field",
                IDENTITY_FIELD
            ))
        })
    }

    /// Upsert a document: replace any existing entry with this identity.
    ///
    /// A binary document is removed from the index instead of indexed, so
    /// re-encountering a document that turned binary clears its stale
    /// entry.
    pub fn upsert(&mut self, document: &Document) -> SearchResult<()> {
        let id = document.id().to_string();
        let identity_field = self.identity_field()?;
        let id_term = Term::from_field_text(identity_field, &id);

        match self.manager.search_schema().project(document) {
            ProjectedDocument::Excluded => {
                tracing::debug!(document_id = %id, "binary document excluded from index");
                self.writer.delete_term(id_term);
                Ok(())
            }
            ProjectedDocument::Fields(fields) => {
                tracing::debug!(document_id = %id, "indexing document");

                // Update-or-insert, never add-duplicate.
                self.writer.delete_term(id_term);

                let schema = self.manager.schema();
                let mut doc = TantivyDocument::new();
                for (name, value) in fields {
                    if let Ok(field) = schema.get_field(&name) {
                        doc.add_text(field, &value);
                    }
                }
                // Identity goes in last and unconditionally.
                doc.add_text(identity_field, &id);

                self.writer.add_document(doc).map_err(|e| {
                    SearchError::IndexingFailed(format!("Failed to add document: {}", e))
                })?;
                Ok(())
            }
        }
    }

    /// Remove the entry for `id`; a no-op when none exists.
    pub fn delete(&mut self, id: &DocumentId) -> SearchResult<()> {
        tracing::debug!(document_id = %id, "deleting document from index");
        let identity_field = self.identity_field()?;
        self.writer
            .delete_term(Term::from_field_text(identity_field, &id.to_string()));
        Ok(())
    }

    /// Durably apply every mutation in the batch.
    pub fn commit(mut self) -> SearchResult<()> {
        self.writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit batch: {}", e)))?;
        Ok(())
    }

    /// Commit, then block until segment merging settles. Used by the
    /// administrative optimize path to compact index storage.
    pub fn optimize(mut self) -> SearchResult<()> {
        self.writer
            .commit()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to commit: {}", e)))?;
        self.writer
            .wait_merging_threads()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to merge segments: {}", e)))?;
        Ok(())
    }

    /// Discard every mutation in the batch.
    pub fn rollback(mut self) -> SearchResult<()> {
        self.writer
            .rollback()
            .map_err(|e| SearchError::IndexingFailed(format!("Failed to roll back batch: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::schema::SearchSchema;
    use crate::search::writer::WriterBroker;
    use std::time::Duration;
    use tantivy::collector::Count;
    use tantivy::query::AllQuery;
    use tempfile::TempDir;

    fn doc_count(manager: &IndexManager) -> u64 {
        manager.stats().unwrap().total_documents
    }

    async fn lease(manager: &IndexManager) -> MutationBatch<'_> {
        WriterBroker::new(5, Duration::from_millis(10), 15_000_000)
            .lease(manager)
            .await
            .unwrap()
    }

    fn text_doc(collection: &str, name: &str, text: &str) -> Document {
        let mut doc = Document::new(collection, name);
        doc.text = text.to_string();
        doc
    }

    #[tokio::test]
    async fn test_upsert_commit_is_visible() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap();

        let mut batch = lease(&manager).await;
        batch.upsert(&text_doc("bag1", "doc1", "hello")).unwrap();
        batch.commit().unwrap();

        assert_eq!(doc_count(&manager), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_entry() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap();

        let mut batch = lease(&manager).await;
        batch.upsert(&text_doc("bag1", "doc1", "first")).unwrap();
        batch.commit().unwrap();

        let mut batch = lease(&manager).await;
        batch.upsert(&text_doc("bag1", "doc1", "second")).unwrap();
        batch.commit().unwrap();

        assert_eq!(doc_count(&manager), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap();

        let mut batch = lease(&manager).await;
        batch.delete(&DocumentId::new("bag1", "ghost")).unwrap();
        batch.commit().unwrap();

        assert_eq!(doc_count(&manager), 0);
    }

    #[tokio::test]
    async fn test_rollback_discards_whole_batch() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap();

        let mut batch = lease(&manager).await;
        batch.upsert(&text_doc("bag1", "doc1", "one")).unwrap();
        batch.upsert(&text_doc("bag1", "doc2", "two")).unwrap();
        batch.rollback().unwrap();

        let reader = manager.index().reader().unwrap();
        let count = reader.searcher().search(&AllQuery, &Count).unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_binary_upsert_removes_stale_entry() {
        let temp_dir = TempDir::new().unwrap();
        let manager = IndexManager::open(temp_dir.path(), SearchSchema::default()).unwrap();

        let mut batch = lease(&manager).await;
        batch.upsert(&text_doc("bag1", "doc1", "plain")).unwrap();
        batch.commit().unwrap();
        assert_eq!(doc_count(&manager), 1);

        // Same identity comes back as binary content
        let mut binary = text_doc("bag1", "doc1", "plain");
        binary.content_type = Some("image/png".to_string());

        let mut batch = lease(&manager).await;
        batch.upsert(&binary).unwrap();
        batch.commit().unwrap();

        assert_eq!(doc_count(&manager), 0);
    }
}
