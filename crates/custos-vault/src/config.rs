//! Vault configuration: key sourcing and the encryption toggle.
//!
//! The key arrives via `APP_FILE_KEY` and the toggle via `APP_FILE_ENCRYPT`.
//! In the development profile a missing key falls back to a fixed constant
//! with a warning; in production it is a startup error.

use custos_core::Profile;
use tracing::warn;

use crate::crypto::FileKey;
use crate::error::{Result, VaultError};
use crate::policy::MAX_UPLOAD_BYTES;

/// Environment variable holding the file encryption key.
pub const ENV_FILE_KEY: &str = "APP_FILE_KEY";

/// Environment variable toggling encryption at rest.
pub const ENV_FILE_ENCRYPT: &str = "APP_FILE_ENCRYPT";

/// Fixed development-only key (32 raw bytes). Never acceptable in production.
const DEV_FILE_KEY: &str = "0123456789ABCDEF0123456789ABCDEF";

/// Configuration for the file vault.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// The symmetric key files are sealed under.
    pub key: FileKey,
    /// Whether bytes are sealed on write and opened on read. When false,
    /// bytes are stored verbatim with a zero-filled nonce placeholder.
    pub encrypt: bool,
    /// Upload size ceiling in bytes.
    pub max_upload_bytes: u64,
}

impl VaultConfig {
    /// Build from the process environment for the given profile.
    pub fn from_env(profile: Profile) -> Result<Self> {
        Self::from_lookup(profile, |var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Tests inject a closure instead of mutating process env.
    pub fn from_lookup<F>(profile: Profile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = match lookup(ENV_FILE_KEY).filter(|v| !v.trim().is_empty()) {
            Some(value) => FileKey::from_config_str(value.trim())?,
            None if profile.is_production() => return Err(VaultError::MissingKey),
            None => {
                warn!(
                    "{} not set; falling back to the built-in development key",
                    ENV_FILE_KEY
                );
                FileKey::from_config_str(DEV_FILE_KEY)?
            }
        };

        let encrypt = match lookup(ENV_FILE_ENCRYPT) {
            Some(value) => value.trim().eq_ignore_ascii_case("true") || value.trim() == "1",
            None => true,
        };
        if !encrypt {
            warn!("file encryption disabled; blobs will be stored in plaintext");
        }

        Ok(Self {
            key,
            encrypt,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        })
    }

    /// A throwaway config with a random key, for tests.
    pub fn for_tests() -> Self {
        Self {
            key: FileKey::generate(),
            encrypt: true,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}
