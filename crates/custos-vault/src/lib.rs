//! # Custos Vault
//!
//! Authenticated symmetric encryption of stored files and the custody layer
//! binding it to blob persistence.
//!
//! ## Overview
//!
//! File bytes are sealed under a single 256-bit ChaCha20-Poly1305 key with a
//! fresh 96-bit nonce per blob. The nonce rides next to the ciphertext in
//! the blob record; the 128-bit tag makes any tampering detectable at open
//! time. A deployment toggle can disable encryption, in which case bytes are
//! stored verbatim with a zero-filled nonce placeholder so the record shape
//! never changes.
//!
//! ## Key Types
//!
//! - [`FileKey`] / [`FileNonce`] - the cipher primitives
//! - [`Envelope`] - nonce + ciphertext, sealed and opened as a unit
//! - [`FileVault`] - upload policy, seal-on-write, open-on-read
//! - [`VaultConfig`] - key sourcing and the encryption toggle

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod policy;
pub mod vault;

pub use config::{VaultConfig, ENV_FILE_ENCRYPT, ENV_FILE_KEY};
pub use crypto::{FileKey, FileNonce, KEY_LEN, TAG_LEN};
pub use envelope::Envelope;
pub use error::{Result, VaultError};
pub use policy::{check_upload, ALLOWED_EXTENSIONS, MAX_UPLOAD_BYTES};
pub use vault::{FileContent, FileVault};
