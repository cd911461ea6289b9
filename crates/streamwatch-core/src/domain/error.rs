//! Error taxonomy for streamwatch-core.

use streamwatch_inventory::{InventoryError, Stream};

/// Submission to the worker pool failed.
///
/// The rejected stream travels inside the error so the dispatcher can turn
/// it into a `queue_error` result instead of dropping it.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("probe queue is full (capacity {capacity})")]
    QueueFull { capacity: usize, stream: Stream },

    #[error("worker pool is shut down")]
    PoolClosed { stream: Stream },
}

impl DispatchError {
    /// The stream that could not be submitted.
    pub fn stream(&self) -> &Stream {
        match self {
            DispatchError::QueueFull { stream, .. } | DispatchError::PoolClosed { stream } => {
                stream
            }
        }
    }

    pub fn into_stream(self) -> Stream {
        match self {
            DispatchError::QueueFull { stream, .. } | DispatchError::PoolClosed { stream } => {
                stream
            }
        }
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors that abort a whole cycle.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),

    #[error("result sink error: {0}")]
    Sink(#[source] std::io::Error),
}

/// Result type for streamwatch-core operations.
pub type Result<T> = std::result::Result<T, WatchError>;
