//! Ingestor error types.

use fleetscale_queue::QueueError;
use thiserror::Error;

pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that stop the ingestion loop.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("status transport error: {0}")]
    Transport(#[from] QueueError),

    #[error("status consumer on queue {0} was cancelled by the broker")]
    Cancelled(String),
}
