use crate::queue::{JobQueue, QueueError, QueueResult, ReindexJob};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// In-memory job queue (for tests and single-process deployments)
pub struct InMemoryQueue {
    jobs: Mutex<VecDeque<ReindexJob>>,
    notify: Notify,
    closed: AtomicBool,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Close the queue: pending jobs drain, then pops report `Closed`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Number of jobs currently waiting
    pub fn len(&self) -> usize {
        self.lock_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_front(&self) -> Option<ReindexJob> {
        self.lock_jobs().pop_front()
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, VecDeque<ReindexJob>> {
        // No invariant spans the critical sections, so a poisoned lock is
        // still safe to reuse.
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for InMemoryQueue {
    async fn push(&self, job: &ReindexJob) -> QueueResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        self.lock_jobs().push_back(job.clone());
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> QueueResult<Option<ReindexJob>> {
        loop {
            if let Some(job) = self.take_front() {
                return Ok(Some(job));
            }
            if self.closed.load(Ordering::SeqCst) {
                return Err(QueueError::Closed);
            }
            if tokio::time::timeout(timeout, self.notify.notified())
                .await
                .is_err()
            {
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str) -> ReindexJob {
        ReindexJob {
            principal: "admin".to_string(),
            collection: "bag1".to_string(),
            name: name.to_string(),
            revision: 1,
            requested_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = InMemoryQueue::new();
        queue.push(&job("first")).await.unwrap();
        queue.push(&job("second")).await.unwrap();

        let timeout = Duration::from_millis(10);
        assert_eq!(queue.pop(timeout).await.unwrap().unwrap().name, "first");
        assert_eq!(queue.pop(timeout).await.unwrap().unwrap().name, "second");
        assert_eq!(queue.pop(timeout).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pop_times_out_when_empty() {
        let queue = InMemoryQueue::new();
        let popped = queue.pop(Duration::from_millis(10)).await.unwrap();
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn test_closed_queue_drains_then_reports_closed() {
        let queue = InMemoryQueue::new();
        queue.push(&job("last")).await.unwrap();
        queue.close();

        let timeout = Duration::from_millis(10);
        assert!(queue.pop(timeout).await.unwrap().is_some());
        assert!(matches!(queue.pop(timeout).await, Err(QueueError::Closed)));
        assert!(matches!(queue.push(&job("late")).await, Err(QueueError::Closed)));
    }
}
