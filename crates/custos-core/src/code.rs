//! Validation codes: the short credential minted when a grant is approved.
//!
//! A code authorizes exactly one resource's download while its grant is
//! still valid. Codes are read back to humans over e-mail and SMS, so the
//! alphabet drops the glyphs that are routinely confused (`I`/`1`, `O`/`0`).

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Number of characters in a validation code.
pub const CODE_LEN: usize = 8;

/// Unambiguous alphanumeric alphabet (32 glyphs).
const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// An 8-character opaque validation code.
///
/// Uniqueness is not guaranteed by generation alone; the store's unique
/// index on the code column is the authoritative collision detector and
/// callers regenerate on a violation.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValidationCode(String);

impl ValidationCode {
    /// Draw a fresh random code.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code: String = (0..CODE_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Parse a code presented by a caller.
    ///
    /// Rejects anything that could not have been minted here, so lookups
    /// for malformed input never reach the store.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s.len() != CODE_LEN {
            return Err(CoreError::MalformedCode(format!(
                "expected {} characters, got {}",
                CODE_LEN,
                s.len()
            )));
        }
        if !s.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(CoreError::MalformedCode(
                "character outside the code alphabet".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// The code as presented to the requester.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// The code is a live credential; keep it out of debug logs.
impl fmt::Debug for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidationCode(********)")
    }
}

impl TryFrom<String> for ValidationCode {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ValidationCode> for String {
    fn from(code: ValidationCode) -> Self {
        code.0
    }
}
