use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Index/search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Queue configuration (for the async reindex path)
    #[serde(default)]
    pub queue: Option<QueueConfig>,
}

impl Config {
    /// Load configuration from defaults, an optional file, and environment.
    ///
    /// The file path is taken from `SEARCHSYNC_CONFIG` (default
    /// `searchsync.toml`, optional); environment variables use the
    /// `SEARCHSYNC` prefix with `__` as the section separator, e.g.
    /// `SEARCHSYNC__SEARCH__INDEX_PATH`.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("SEARCHSYNC_CONFIG").unwrap_or_else(|_| "searchsync.toml".to_string());

        config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SEARCHSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            queue: None,
        }
    }
}

/// Search index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path to the search index directory
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Index writer heap size in bytes (default: 50MB)
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Maximum attempts to obtain the exclusive index writer
    #[serde(default = "default_lock_attempts")]
    pub lock_attempts: u32,

    /// Sleep between writer acquisition attempts, in milliseconds
    #[serde(default = "default_lock_retry_ms")]
    pub lock_retry_ms: u64,

    /// Maximum search results to return when the caller gives no limit
    #[serde(default = "default_results_limit")]
    pub results_limit: usize,
}

impl SearchConfig {
    pub fn lock_retry_interval(&self) -> Duration {
        Duration::from_millis(self.lock_retry_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            writer_heap_size: default_writer_heap_size(),
            lock_attempts: default_lock_attempts(),
            lock_retry_ms: default_lock_retry_ms(),
            results_limit: default_results_limit(),
        }
    }
}

/// Queue configuration for the async reindex pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Redis connection URL
    #[serde(default = "default_queue_url")]
    pub url: String,

    /// Name of the work queue (redis list key)
    #[serde(default = "default_queue_name")]
    pub queue_name: String,

    /// Blocking pop timeout for the worker loop, in seconds
    #[serde(default = "default_pop_timeout_secs")]
    pub pop_timeout_secs: u64,

    /// Acting principal recorded on enqueued jobs
    #[serde(default = "default_principal")]
    pub principal: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: default_queue_url(),
            queue_name: default_queue_name(),
            pop_timeout_secs: default_pop_timeout_secs(),
            principal: default_principal(),
        }
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn index_path(mut self, path: PathBuf) -> Self {
        self.config.index_path = path;
        self
    }

    pub fn writer_heap_size(mut self, size: usize) -> Self {
        self.config.writer_heap_size = size;
        self
    }

    pub fn lock_attempts(mut self, attempts: u32) -> Self {
        self.config.lock_attempts = attempts;
        self
    }

    pub fn lock_retry_ms(mut self, ms: u64) -> Self {
        self.config.lock_retry_ms = ms;
        self
    }

    pub fn results_limit(mut self, limit: usize) -> Self {
        self.config.results_limit = limit;
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./indexdir")
}

fn default_writer_heap_size() -> usize {
    50_000_000
}

fn default_lock_attempts() -> u32 {
    5
}

fn default_lock_retry_ms() -> u64 {
    100
}

fn default_results_limit() -> usize {
    51
}

fn default_queue_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_queue_name() -> String {
    "searchsync:reindex".to_string()
}

fn default_pop_timeout_secs() -> u64 {
    5
}

fn default_principal() -> String {
    "admin".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_search_config() {
        let config = SearchConfig::default();
        assert_eq!(config.index_path, PathBuf::from("./indexdir"));
        assert_eq!(config.lock_attempts, 5);
        assert_eq!(config.results_limit, 51);
    }

    #[test]
    fn test_builder() {
        let config = SearchConfigBuilder::new()
            .index_path(PathBuf::from("/tmp/idx"))
            .lock_attempts(3)
            .results_limit(10)
            .build();

        assert_eq!(config.index_path, PathBuf::from("/tmp/idx"));
        assert_eq!(config.lock_attempts, 3);
        assert_eq!(config.results_limit, 10);
    }

    #[test]
    fn test_retry_interval() {
        let config = SearchConfigBuilder::new().lock_retry_ms(250).build();
        assert_eq!(config.lock_retry_interval(), Duration::from_millis(250));
    }
}
