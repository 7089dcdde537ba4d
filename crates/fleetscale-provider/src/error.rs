//! Provisioning backend error types.

use thiserror::Error;

/// Result type alias for provisioning backend calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure to issue or read back a backend call as a whole.
///
/// Per-operation errors and warnings reported by the backend are not
/// `ProviderError`s; they are carried in an `OperationReport`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("backend returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("failed to obtain credentials: {0}")]
    Auth(String),
}
