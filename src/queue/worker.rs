//! Queued reindex worker

use crate::queue::{JobQueue, QueueError, ReindexJob};
use crate::search::IndexSynchronizer;
use crate::store::DocumentStore;
use std::sync::Arc;
use std::time::Duration;

/// Long-running consumer of [`ReindexJob`]s.
///
/// Jobs are processed sequentially; each one re-fetches its document from
/// the store and upserts or deletes accordingly — the same reconciliation
/// rule as the live change hook, applied per job. Running several workers
/// is safe for the same reason, though their writer acquisitions still
/// serialize on the index lock.
pub struct ReindexWorker {
    store: Arc<dyn DocumentStore>,
    queue: Arc<dyn JobQueue>,
    synchronizer: Arc<IndexSynchronizer>,
    poll_timeout: Duration,
}

impl ReindexWorker {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        queue: Arc<dyn JobQueue>,
        synchronizer: Arc<IndexSynchronizer>,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            store,
            queue,
            synchronizer,
            poll_timeout,
        }
    }

    /// Reconcile the document a single job names.
    pub async fn process(&self, job: &ReindexJob) {
        let id = job.document_id();
        tracing::debug!(document_id = %id, principal = %job.principal, "processing reindex job");
        self.synchronizer.reconcile(self.store.as_ref(), &id).await;
    }

    /// Process jobs until the queue reports empty. Useful for tests and
    /// for draining a backlog in a bounded administrative run.
    pub async fn drain(&self) {
        loop {
            match self.queue.pop(self.poll_timeout).await {
                Ok(Some(job)) => self.process(&job).await,
                Ok(None) | Err(QueueError::Closed) => return,
                Err(err) => {
                    tracing::error!(error = %err, "queue receive failed, stopping drain");
                    return;
                }
            }
        }
    }

    /// Consume jobs until the queue closes. Transport errors are logged
    /// and retried after a short pause; they never terminate the worker.
    pub async fn run(&self) {
        tracing::info!("reindex worker started");
        loop {
            match self.queue.pop(self.poll_timeout).await {
                Ok(Some(job)) => self.process(&job).await,
                Ok(None) => continue,
                Err(QueueError::Closed) => {
                    tracing::info!("job queue closed, reindex worker stopping");
                    return;
                }
                Err(err) => {
                    tracing::error!(error = %err, "queue receive failed");
                    tokio::time::sleep(self.poll_timeout).await;
                }
            }
        }
    }
}
