//! Encrypted payload envelope.
//!
//! The envelope pairs a ciphertext with the nonce it was sealed under.
//! Sealing draws a fresh nonce every time; opening must use exactly the
//! stored pair.

use crate::crypto::{FileKey, FileNonce};
use crate::error::Result;

/// A sealed payload: nonce + ciphertext, moved as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Nonce used for encryption (unique per seal).
    pub nonce: FileNonce,

    /// The encrypted data (includes authentication tag).
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Seal plaintext under the given key with a fresh nonce.
    pub fn seal(key: &FileKey, plaintext: &[u8]) -> Result<Self> {
        let nonce = FileNonce::generate();
        let ciphertext = key.seal(plaintext, &nonce)?;
        Ok(Self { nonce, ciphertext })
    }

    /// Open with the given key.
    pub fn open(&self, key: &FileKey) -> Result<Vec<u8>> {
        key.open(&self.ciphertext, &self.nonce)
    }

    /// Get the size of the ciphertext.
    pub fn ciphertext_len(&self) -> usize {
        self.ciphertext.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::TAG_LEN;
    use crate::error::VaultError;
    use proptest::prelude::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let key = FileKey::generate();
        let envelope = Envelope::seal(&key, b"confidential expertise report").unwrap();

        assert_eq!(envelope.ciphertext_len(), 29 + TAG_LEN);
        assert_eq!(envelope.open(&key).unwrap(), b"confidential expertise report");
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = FileKey::generate();
        let a = Envelope::seal(&key, b"same plaintext").unwrap();
        let b = Envelope::seal(&key, b"same plaintext").unwrap();

        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let envelope = Envelope::seal(&FileKey::generate(), b"secret").unwrap();
        assert!(matches!(
            envelope.open(&FileKey::generate()),
            Err(VaultError::Authentication)
        ));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_identity(plaintext in proptest::collection::vec(any::<u8>(), 0..512)) {
            let key = FileKey::from_bytes([0x11; 32]);
            let envelope = Envelope::seal(&key, &plaintext).unwrap();
            prop_assert_eq!(envelope.open(&key).unwrap(), plaintext);
        }

        #[test]
        fn prop_any_flipped_byte_fails_auth(
            plaintext in proptest::collection::vec(any::<u8>(), 1..256),
            flip_index in any::<usize>(),
            flip_bit in 0u8..8,
        ) {
            let key = FileKey::from_bytes([0x11; 32]);
            let mut envelope = Envelope::seal(&key, &plaintext).unwrap();

            let index = flip_index % envelope.ciphertext.len();
            envelope.ciphertext[index] ^= 1 << flip_bit;

            prop_assert!(matches!(envelope.open(&key), Err(VaultError::Authentication)));
        }
    }
}
