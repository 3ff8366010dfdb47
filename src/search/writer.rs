//! Exclusive writer leasing with bounded retry
//!
//! Tantivy enforces a single live index writer through its own directory
//! lock; this broker does not add a mutex of its own, it only retries on
//! the engine-reported lock conflict. Acquisition is an explicit state
//! machine rather than an inline sleep loop: Attempting moves to Backoff
//! on contention, Backoff sleeps and re-attempts, and the run ends
//! Acquired or Exhausted. Exhaustion and unexpected acquisition errors
//! both degrade to "no lease" after logging; callers skip the mutation
//! instead of failing their own path, accepting a bounded staleness window
//! that a later reindex repairs.

use crate::config::SearchConfig;
use crate::search::index::IndexManager;
use crate::search::mutation::MutationBatch;
use std::time::Duration;
use tantivy::TantivyError;

#[derive(Debug, Clone, Copy)]
enum AcquireState {
    Attempting { attempt: u32 },
    Backoff { attempt: u32 },
}

/// Acquires short-lived exclusive writer leases against an index
#[derive(Debug, Clone)]
pub struct WriterBroker {
    max_attempts: u32,
    retry_interval: Duration,
    heap_size: usize,
}

impl WriterBroker {
    pub fn new(max_attempts: u32, retry_interval: Duration, heap_size: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_interval,
            heap_size,
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            config.lock_attempts,
            config.lock_retry_interval(),
            config.writer_heap_size,
        )
    }

    /// Try to lease the exclusive writer as a [`MutationBatch`].
    ///
    /// Returns `None` when the lock stays contended through every attempt
    /// or acquisition fails for any other reason; both are logged, never
    /// propagated. The caller must check for `None` and skip the mutation.
    pub async fn lease<'a>(&self, manager: &'a IndexManager) -> Option<MutationBatch<'a>> {
        let mut state = AcquireState::Attempting { attempt: 1 };

        loop {
            state = match state {
                AcquireState::Attempting { attempt } => {
                    match manager.index().writer(self.heap_size) {
                        Ok(writer) => return Some(MutationBatch::new(manager, writer)),
                        Err(TantivyError::LockFailure(..)) if attempt < self.max_attempts => {
                            AcquireState::Backoff { attempt }
                        }
                        Err(TantivyError::LockFailure(..)) => {
                            tracing::debug!(
                                attempts = attempt,
                                "index writer still locked, giving up"
                            );
                            return None;
                        }
                        Err(err) => {
                            tracing::debug!(error = %err, "failed to acquire index writer");
                            return None;
                        }
                    }
                }
                AcquireState::Backoff { attempt } => {
                    tokio::time::sleep(self.retry_interval).await;
                    AcquireState::Attempting {
                        attempt: attempt + 1,
                    }
                }
            };
        }
    }
}
