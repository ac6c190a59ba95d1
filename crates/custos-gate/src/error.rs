//! Error types for the gate.

use thiserror::Error;

/// Errors that can occur issuing or verifying bearer tokens.
#[derive(Debug, Error)]
pub enum GateError {
    /// Bad signature, malformed structure, or expiry in the past.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token could not be produced.
    #[error("token issuance failed: {0}")]
    Issue(String),

    /// No signing secret configured and the profile forbids the
    /// development fallback.
    #[error("no token signing secret configured")]
    MissingSecret,
}

/// Result type for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
