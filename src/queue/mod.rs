//! Asynchronous reindex pipeline
//!
//! Decomposes bulk reindexing into per-document jobs on a durable work
//! queue, consumed by [`ReindexWorker`]. Delivery is best-effort
//! at-least-once: a failed enqueue is logged and the job dropped, and a
//! worker never trusts the job payload beyond the identity it names — each
//! job re-derives the document's state from the store, so duplicate or
//! stale jobs are harmless.

mod memory;
mod redis;
mod worker;

pub use memory::InMemoryQueue;
pub use redis::RedisQueue;
pub use worker::ReindexWorker;

use crate::models::DocumentId;
use crate::store::{DocumentStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Errors reported by the job queue transport
#[derive(Error, Debug)]
pub enum QueueError {
    /// Transport/connection failure
    #[error("Queue connection error: {0}")]
    Connection(String),

    /// Job payload could not be (de)serialized
    #[error("Queue serialization error: {0}")]
    Serialization(String),

    /// The queue was closed and will yield no further jobs
    #[error("Queue closed")]
    Closed,
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

/// One queued unit of reindex work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexJob {
    /// Acting principal that requested the rebuild
    pub principal: String,

    /// Collection of the document to reconcile
    pub collection: String,

    /// Name of the document to reconcile
    pub name: String,

    /// Store revision at enqueue time (informational; the worker re-reads
    /// the store rather than trusting this)
    pub revision: u64,

    /// When the job was enqueued
    pub requested_at: DateTime<Utc>,
}

impl ReindexJob {
    pub fn document_id(&self) -> DocumentId {
        DocumentId::new(self.collection.clone(), self.name.clone())
    }
}

/// Named work queue carrying [`ReindexJob`]s
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Push one job onto the queue
    async fn push(&self, job: &ReindexJob) -> QueueResult<()>;

    /// Pop the next job, waiting up to `timeout`; `Ok(None)` on timeout
    async fn pop(&self, timeout: Duration) -> QueueResult<Option<ReindexJob>>;
}

/// Enqueue one reindex job per store document, optionally restricted to
/// names starting with `prefix`.
///
/// Enqueueing is best-effort: a push failure is logged and that job is
/// dropped; the run continues. Returns the number of jobs queued.
pub async fn enqueue_reindex(
    store: &dyn DocumentStore,
    queue: &dyn JobQueue,
    principal: &str,
    prefix: Option<&str>,
) -> crate::Result<usize> {
    let mut queued = 0;

    for collection in store.list_collections().await? {
        for id in store.list_collection_documents(&collection).await? {
            if let Some(prefix) = prefix {
                if !id.name.starts_with(prefix) {
                    continue;
                }
            }

            let revision = match store.get(&id).await {
                Ok(document) => document.revision,
                // Deleted since listing; the worker would only delete a
                // nonexistent entry, skip the job.
                Err(StoreError::NotFound(_)) => continue,
                Err(err) => return Err(err.into()),
            };

            let job = ReindexJob {
                principal: principal.to_string(),
                collection: id.collection.clone(),
                name: id.name.clone(),
                revision,
                requested_at: Utc::now(),
            };

            match queue.push(&job).await {
                Ok(()) => queued += 1,
                Err(err) => {
                    tracing::error!(
                        document_id = %id,
                        error = %err,
                        "unable to enqueue reindex job, dropping"
                    );
                }
            }
        }
    }

    Ok(queued)
}
