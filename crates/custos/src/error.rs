//! Error types for the broker.

use custos_core::ResourceId;
use custos_gate::GateError;
use custos_ledger::LedgerError;
use custos_store::StoreError;
use custos_vault::VaultError;
use thiserror::Error;

/// Errors that can occur during broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The client exceeded its request budget. No side effect.
    #[error("too many requests, please slow down")]
    RateLimited,

    /// The grant checked out but the resource has no stored file.
    #[error("no file stored for resource {0}")]
    NoFile(ResourceId),

    /// Grant lifecycle error.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// File custody error.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Token gate error.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl BrokerError {
    /// The HTTP status the boundary layer should answer with.
    ///
    /// Validation and state-machine failures surface as 4xx with the error's
    /// display text; cryptographic and storage failures are fatal for the
    /// operation and surface as 500 without detail.
    pub fn http_status(&self) -> u16 {
        match self {
            BrokerError::RateLimited => 429,
            BrokerError::NoFile(_) => 404,
            BrokerError::Ledger(err) => match err {
                LedgerError::NotFound(_) | LedgerError::InvalidCode => 404,
                LedgerError::InvalidState(_) => 409,
                LedgerError::Expired => 410,
                LedgerError::Forbidden => 403,
                LedgerError::Store(_) => 500,
            },
            BrokerError::Vault(err) => match err {
                VaultError::TooLarge { .. } => 413,
                VaultError::UnsupportedType(_) => 415,
                VaultError::NotFound(_) => 404,
                _ => 500,
            },
            BrokerError::Gate(err) => match err {
                GateError::InvalidToken(_) => 401,
                _ => 500,
            },
            BrokerError::Store(_) => 500,
        }
    }
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
