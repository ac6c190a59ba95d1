//! Cipher primitives for file custody.
//!
//! A single 256-bit ChaCha20-Poly1305 key, sourced once at startup, seals
//! every stored file. Each seal draws a fresh random 96-bit nonce; a nonce
//! must never be reused under the same key.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use std::fmt;

use custos_core::NONCE_LEN;

use crate::error::{Result, VaultError};

/// Key length in bytes (256-bit).
pub const KEY_LEN: usize = 32;

/// Poly1305 authentication tag length appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// The 256-bit symmetric key files are sealed under.
#[derive(Clone)]
pub struct FileKey([u8; KEY_LEN]);

impl FileKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; KEY_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse configured key material.
    ///
    /// Accepts either 64 hex characters or a raw 32-byte string, so both a
    /// generated hex key and the legacy ASCII form work.
    pub fn from_config_str(s: &str) -> Result<Self> {
        if s.len() == 2 * KEY_LEN {
            if let Ok(decoded) = hex::decode(s) {
                let bytes: [u8; KEY_LEN] = decoded
                    .try_into()
                    .map_err(|_| VaultError::InvalidKey("hex key has wrong length".to_string()))?;
                return Ok(Self(bytes));
            }
        }
        let raw = s.as_bytes();
        if raw.len() == KEY_LEN {
            let mut bytes = [0u8; KEY_LEN];
            bytes.copy_from_slice(raw);
            return Ok(Self(bytes));
        }
        Err(VaultError::InvalidKey(format!(
            "expected {} hex chars or {} raw bytes, got {} bytes",
            2 * KEY_LEN,
            KEY_LEN,
            raw.len()
        )))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Seal plaintext under this key and nonce.
    ///
    /// The returned ciphertext is `plaintext.len() + TAG_LEN` bytes.
    /// Deterministic for a fixed (key, nonce, plaintext); never call twice
    /// with the same nonce.
    pub fn seal(&self, plaintext: &[u8], nonce: &FileNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        let nonce = Nonce::from_slice(nonce.as_bytes());
        cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| VaultError::Encryption(e.to_string()))
    }

    /// Open ciphertext sealed under this key and nonce.
    ///
    /// Fails with [`VaultError::Authentication`] when the tag does not
    /// verify - corrupted ciphertext, wrong nonce, or wrong key. Never
    /// returns partial data.
    pub fn open(&self, ciphertext: &[u8], nonce: &FileNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        let nonce = Nonce::from_slice(nonce.as_bytes());
        cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::Authentication)
    }
}

// The key never appears in logs.
impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileKey(<{} bytes>)", KEY_LEN)
    }
}

/// A 96-bit nonce, generated fresh per seal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileNonce([u8; NONCE_LEN]);

impl FileNonce {
    /// All-zero placeholder recorded when encryption is disabled.
    pub const ZERO: Self = Self([0u8; NONCE_LEN]);

    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; NONCE_LEN];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}
