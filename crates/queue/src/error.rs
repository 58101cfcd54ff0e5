//! Error types for queue operations.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job {id} is {actual}, expected {expected}")]
    InvalidState {
        id: String,
        expected: &'static str,
        actual: String,
    },
}
