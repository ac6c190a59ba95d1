//! Error types for the vault.

use custos_core::BlobId;
use thiserror::Error;

/// Errors that can occur during file custody operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Upload exceeds the configured ceiling.
    #[error("file too large: {size} bytes exceeds the {limit}-byte limit")]
    TooLarge { size: u64, limit: u64 },

    /// The filename's extension is not in the allow-list.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// No blob with that id.
    #[error("file not found: {0}")]
    NotFound(BlobId),

    /// No key configured and the profile forbids the development fallback.
    #[error("no file encryption key configured")]
    MissingKey,

    /// Configured key material could not be parsed.
    #[error("invalid file encryption key: {0}")]
    InvalidKey(String),

    /// Cipher setup or seal failure.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// The authentication tag did not verify: corrupted ciphertext, wrong
    /// nonce, or wrong key. Fatal for the operation; never masked.
    #[error("ciphertext authentication failed")]
    Authentication,

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] custos_store::StoreError),
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;
