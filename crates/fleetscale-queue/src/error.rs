//! Broker error types.

use thiserror::Error;

/// Result type alias for broker operations.
pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The broker is unreachable or the connection/channel was lost.
    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("acknowledge failed: {0}")]
    Ack(String),
}

impl QueueError {
    /// Whether this error means the transport itself is gone.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, QueueError::Connection(_))
    }
}
