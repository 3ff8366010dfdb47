use crate::config::QueueConfig;
use crate::queue::{JobQueue, QueueError, QueueResult, ReindexJob};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Redis-list-backed job queue.
///
/// Jobs are JSON payloads on a single list key: producers LPUSH, workers
/// BRPOP. Durability and delivery follow redis semantics; this layer adds
/// no acknowledgment tracking.
#[derive(Clone)]
pub struct RedisQueue {
    connection: ConnectionManager,
    queue_key: String,
}

impl RedisQueue {
    /// Connect to redis and verify the connection with a PING.
    pub async fn new(url: &str, queue_key: &str) -> QueueResult<Self> {
        let client = Client::open(url)
            .map_err(|e| QueueError::Connection(format!("Failed to create redis client: {}", e)))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to connect to redis: {}", e)))?;

        let mut test_conn = connection.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut test_conn)
            .await
            .map_err(|e| QueueError::Connection(format!("Redis connection test failed: {}", e)))?;

        tracing::info!(queue = %queue_key, "connected to redis job queue");

        Ok(Self {
            connection,
            queue_key: queue_key.to_string(),
        })
    }

    pub async fn from_config(config: &QueueConfig) -> QueueResult<Self> {
        Self::new(&config.url, &config.queue_name).await
    }
}

#[async_trait]
impl JobQueue for RedisQueue {
    async fn push(&self, job: &ReindexJob) -> QueueResult<()> {
        let payload = serde_json::to_string(job)?;
        let mut conn = self.connection.clone();
        let _: () = conn
            .lpush(&self.queue_key, payload)
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to push job: {}", e)))?;
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> QueueResult<Option<ReindexJob>> {
        let mut conn = self.connection.clone();

        let popped: Option<(String, String)> = conn
            .brpop(&self.queue_key, brpop_timeout_secs(timeout))
            .await
            .map_err(|e| QueueError::Connection(format!("Failed to pop job: {}", e)))?;

        match popped {
            Some((_key, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

/// BRPOP timeout in seconds. A zero timeout would block forever; keep at
/// least 1s so the worker loop stays responsive.
fn brpop_timeout_secs(timeout: Duration) -> f64 {
    timeout.as_secs_f64().max(1.0)
}
