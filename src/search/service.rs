//! Search service facade
//!
//! Ties the index manager, writer broker, query engine, and synchronizer
//! together behind the operations the host surfaces: query serving plus
//! the administrative rebuild, queued rebuild, and optimize actions.

use crate::config::SearchConfig;
use crate::models::DocumentId;
use crate::queue::{enqueue_reindex, JobQueue};
use crate::search::error::SearchResult;
use crate::search::index::{IndexManager, IndexStats};
use crate::search::query::{QueryEngine, SearchHit};
use crate::search::schema::SearchSchema;
use crate::search::sync::{IndexSynchronizer, ReindexReport};
use crate::search::writer::WriterBroker;
use crate::store::DocumentStore;
use std::sync::Arc;

/// Main search service
pub struct SearchService {
    manager: Arc<IndexManager>,
    synchronizer: Arc<IndexSynchronizer>,
    engine: QueryEngine,
    config: SearchConfig,
}

impl SearchService {
    /// Create a service over the default schema
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        Self::with_schema(config, SearchSchema::default())
    }

    /// Create a service over a custom schema
    pub fn with_schema(config: SearchConfig, schema: SearchSchema) -> SearchResult<Self> {
        let manager = Arc::new(IndexManager::open(config.index_path.clone(), schema)?);
        let broker = WriterBroker::from_config(&config);
        let synchronizer = Arc::new(IndexSynchronizer::new(manager.clone(), broker));
        let engine = QueryEngine::new(manager.clone(), config.results_limit);

        Ok(Self {
            manager,
            synchronizer,
            engine,
            config,
        })
    }

    /// The synchronizer, for registration as a store observer
    pub fn synchronizer(&self) -> Arc<IndexSynchronizer> {
        self.synchronizer.clone()
    }

    pub fn manager(&self) -> &Arc<IndexManager> {
        &self.manager
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Execute a query, returning ranked hits. `limit` falls back to the
    /// configured results limit.
    pub async fn search(&self, query: &str, limit: Option<usize>) -> SearchResult<Vec<SearchHit>> {
        let limit = limit.unwrap_or(self.config.results_limit);
        self.engine.search(query, limit)
    }

    /// Execute a query, returning only the matching document identities in
    /// rank order (the terminal-search shape).
    pub async fn search_ids(&self, query: &str) -> SearchResult<Vec<DocumentId>> {
        let hits = self.search(query, None).await?;
        Ok(hits.into_iter().filter_map(|hit| hit.document).collect())
    }

    /// Rebuild the index from the store, optionally restricted to
    /// documents whose name starts with `prefix`.
    pub async fn reindex(
        &self,
        store: &dyn DocumentStore,
        prefix: Option<&str>,
    ) -> crate::Result<ReindexReport> {
        self.synchronizer.reindex(store, prefix).await
    }

    /// Queue a rebuild instead of mutating the index inline: one job per
    /// document, consumed by [`crate::queue::ReindexWorker`]. Returns the
    /// number of jobs queued; individual enqueue failures are logged and
    /// dropped.
    pub async fn reindex_async(
        &self,
        store: &dyn DocumentStore,
        queue: &dyn JobQueue,
        principal: &str,
        prefix: Option<&str>,
    ) -> crate::Result<usize> {
        enqueue_reindex(store, queue, principal, prefix).await
    }

    /// Compact index storage. Expected to run with no concurrent writers;
    /// returns `false` when the writer was unavailable.
    pub async fn optimize(&self) -> SearchResult<bool> {
        self.synchronizer.optimize().await
    }

    /// Get index statistics
    pub async fn stats(&self) -> SearchResult<IndexStats> {
        self.manager.stats()
    }
}
