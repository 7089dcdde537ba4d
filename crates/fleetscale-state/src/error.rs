//! Error types for the fleetscale state crate.

use thiserror::Error;

/// Result type alias for state and codec operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors raised while decoding or encoding queue payloads.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("malformed {kind} payload: {reason}")]
    Malformed { kind: &'static str, reason: String },

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl StateError {
    pub(crate) fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            reason: reason.into(),
        }
    }
}
