//! Error types for the Custos core.

use thiserror::Error;

/// Errors from pure domain parsing and validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A presented validation code could not have been minted here.
    #[error("malformed validation code: {0}")]
    MalformedCode(String),

    /// A persisted enum column held an unknown value.
    #[error("invalid stored value: {0}")]
    InvalidStoredValue(String),
}
