//! Search index management

use crate::search::error::{SearchError, SearchResult};
use crate::search::schema::SearchSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tantivy::collector::Count;
use tantivy::schema::Schema;
use tantivy::{Index, ReloadPolicy};

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Total number of documents in the index
    pub total_documents: u64,

    /// Index size in bytes
    pub index_size_bytes: u64,

    /// Number of segments
    pub num_segments: usize,
}

/// Owns the Tantivy index; all writer and searcher handles come from here.
///
/// Opening is idempotent and self-healing on first use: a missing directory
/// is created, a missing index is initialized from the configured schema,
/// an existing index is opened as-is. When an index already exists its
/// persisted schema governs; the configured schema takes effect only after
/// a rebuild into a fresh directory.
pub struct IndexManager {
    index: Index,
    schema: Schema,
    search_schema: Arc<SearchSchema>,
    location: PathBuf,
}

impl IndexManager {
    /// Open the index at `location`, creating it if absent.
    ///
    /// Storage I/O errors other than "not found" are fatal and surface as
    /// `IndexInitFailed`; there is no retry at this layer.
    pub fn open(location: impl Into<PathBuf>, search_schema: SearchSchema) -> SearchResult<Self> {
        let location = location.into();

        std::fs::create_dir_all(&location).map_err(|e| {
            SearchError::IndexInitFailed(format!("Failed to create index directory: {}", e))
        })?;

        let index = if Self::index_exists(&location) {
            Index::open_in_dir(&location).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to open existing index: {}", e))
            })?
        } else {
            Index::create_in_dir(&location, search_schema.to_tantivy()).map_err(|e| {
                SearchError::IndexInitFailed(format!("Failed to create new index: {}", e))
            })?
        };

        // The on-disk schema wins for an existing index.
        let schema = index.schema();

        tracing::debug!(location = %location.display(), "search index opened");

        Ok(Self {
            index,
            schema,
            search_schema: Arc::new(search_schema),
            location,
        })
    }

    /// Check if an index exists at the given path
    fn index_exists(path: &Path) -> bool {
        path.join("meta.json").exists()
    }

    /// Get the index
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Get the Tantivy schema (as persisted on disk)
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get the declared projection schema
    pub fn search_schema(&self) -> &SearchSchema {
        &self.search_schema
    }

    /// Get the index directory
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Get index statistics
    pub fn stats(&self) -> SearchResult<IndexStats> {
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e: tantivy::TantivyError| SearchError::SearchFailed(e.to_string()))?;
        let searcher = reader.searcher();

        let total_documents = searcher
            .search(&tantivy::query::AllQuery, &Count)
            .map_err(|e| SearchError::SearchFailed(format!("Failed to count documents: {}", e)))?
            as u64;

        let num_segments = searcher.segment_readers().len();

        let index_size_bytes = std::fs::read_dir(&self.location)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0);

        Ok(IndexStats {
            total_documents,
            index_size_bytes,
            num_segments,
        })
    }
}
