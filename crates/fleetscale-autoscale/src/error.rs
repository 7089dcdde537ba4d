//! Autoscaler error types.

use fleetscale_provider::ProviderError;
use fleetscale_queue::QueueError;
use thiserror::Error;

pub type AutoscaleResult<T> = Result<T, AutoscaleError>;

#[derive(Debug, Error)]
pub enum AutoscaleError {
    /// The task queue could not be reached.
    #[error("task queue transport error: {0}")]
    Transport(#[from] QueueError),

    /// The fleet inventory could not be listed this tick.
    #[error("fleet inventory unavailable: {0}")]
    Inventory(ProviderError),
}

impl AutoscaleError {
    /// Fatal errors end the control loop; the rest skip one tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AutoscaleError::Transport(_))
    }
}
