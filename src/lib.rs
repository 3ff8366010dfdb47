//! # searchsync
//!
//! Keeps a Tantivy full-text index synchronized with an authoritative,
//! mutable document store and serves boosted multi-field queries against it.
//!
//! The store remains the source of truth; the index is a derived artifact
//! that is repaired incrementally (change notifications), in bulk
//! (reindexing), or asynchronously (a queued worker pool):
//!
//! ```text
//! store mutation ──▶ StoreObserver ──▶ reconcile ──▶ index
//! admin rebuild  ──▶ reindex / job queue ──▶ reconcile ──▶ index
//! query string   ──▶ QueryEngine ──▶ ranked document identities
//! ```
//!
//! Every index mutation funnels through a short-lived, exclusive writer
//! lease obtained with bounded retry; a batch of mutations is committed or
//! rolled back as one unit. Reconciliation never trusts a notification
//! label: it re-fetches the document by identity and upserts or deletes
//! based on what the store currently holds, which makes duplicate and
//! reordered notifications harmless.

pub mod config;
pub mod error;
pub mod models;
pub mod queue;
pub mod search;
pub mod store;

pub use config::{Config, QueueConfig, SearchConfig, SearchConfigBuilder};
pub use error::{Error, Result};
pub use models::{Document, DocumentId, FieldValue};
pub use queue::{
    enqueue_reindex, InMemoryQueue, JobQueue, QueueError, RedisQueue, ReindexJob, ReindexWorker,
};
pub use search::{
    FieldKind, FieldSource, IndexManager, IndexStats, IndexSynchronizer, MutationBatch,
    QueryEngine, ReindexReport, SearchError, SearchHit, SearchSchema, SearchSchemaBuilder,
    SearchService, WriterBroker,
};
pub use store::{DocumentStore, InMemoryStore, StoreError, StoreObserver};
