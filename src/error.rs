use thiserror::Error;

/// Crate-level error type
#[derive(Error, Debug)]
pub enum Error {
    /// Search/index errors
    #[error(transparent)]
    Search(#[from] crate::search::SearchError),

    /// Document store errors
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    /// Job queue errors
    #[error(transparent)]
    Queue(#[from] crate::queue::QueueError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
