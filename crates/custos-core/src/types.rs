//! Strong identifier types for the Custos domain.
//!
//! All row identifiers are newtypes to prevent misuse at compile time:
//! a grant id cannot be passed where a resource id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an access grant record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantId(pub i64);

impl GrantId {
    /// Get the raw row id.
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for GrantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GrantId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of the protected resource (report) a grant refers to.
///
/// Resource records themselves live outside this core; the id is opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

impl ResourceId {
    /// Get the raw row id.
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of a stored encrypted blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(pub i64);

impl BlobId {
    /// Get the raw row id.
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for BlobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_types() {
        let grant = GrantId(7);
        let resource = ResourceId(7);
        assert_eq!(grant.as_i64(), resource.as_i64());
        assert_eq!(format!("{}", grant), "7");
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = BlobId(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "42");
        let back: BlobId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
