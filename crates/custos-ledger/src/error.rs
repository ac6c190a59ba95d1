//! Error types for the grant ledger.

use custos_core::{GrantId, GrantStatus};
use thiserror::Error;

/// Errors that can occur during grant lifecycle operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No grant with that id.
    #[error("grant not found: {0}")]
    NotFound(GrantId),

    /// The operation is not legal in the grant's current state.
    #[error("operation not allowed while grant is {0}")]
    InvalidState(GrantStatus),

    /// No grant holds the presented code (or it is malformed).
    #[error("invalid validation code")]
    InvalidCode,

    /// The code's validity window has closed.
    #[error("validation code has expired")]
    Expired,

    /// The code is valid but authorizes a different resource.
    #[error("validation code does not authorize this resource")]
    Forbidden,

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] custos_store::StoreError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
