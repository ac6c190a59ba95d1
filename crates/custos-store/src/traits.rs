//! Store traits: the abstract interface for grant and blob persistence.
//!
//! These traits keep the ledger and the vault storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).
//!
//! # Design Notes
//!
//! - **Conditional pending insert**: `insert_pending` is a single atomic
//!   operation. A second submission for the same (requester, resource) while
//!   one is pending returns `Existing` with the earlier row, never a
//!   duplicate, even under concurrent callers.
//! - **Guarded transitions**: `mark_approved`/`mark_rejected` only fire from
//!   `Pending`. Of two concurrent approvals exactly one observes `Applied`;
//!   the other observes `WrongState`.
//! - **Atomic redemption**: `redeem_code` classifies the code and performs
//!   the `Approved -> Downloaded` transition in one step.

use async_trait::async_trait;
use custos_core::{
    AccessGrant, BlobId, EncryptedBlob, GrantId, GrantStatus, NewBlob, NewGrant, ResourceId,
    ValidationCode,
};

use crate::error::Result;

/// Result of submitting a pending grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingInsert {
    /// A new pending grant was created.
    Created(AccessGrant),
    /// A pending grant for the same (requester, resource) already exists
    /// (idempotent submission - not an error).
    Existing(AccessGrant),
}

impl PendingInsert {
    /// The grant, whether fresh or pre-existing.
    pub fn into_grant(self) -> AccessGrant {
        match self {
            PendingInsert::Created(g) | PendingInsert::Existing(g) => g,
        }
    }
}

/// Result of a guarded `Pending -> {Approved, Rejected}` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The transition was applied; the updated grant is returned.
    Applied(AccessGrant),
    /// No grant with that id exists.
    NotFound,
    /// The grant is not `Pending`; its actual state is returned.
    WrongState(GrantStatus),
}

/// Result of presenting a validation code for redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redemption {
    /// First redemption: the grant moved `Approved -> Downloaded`.
    Downloaded(AccessGrant),
    /// Repeat redemption inside the validity window; the grant is unchanged.
    Repeat(AccessGrant),
    /// No grant holds this code.
    UnknownCode,
    /// The grant's state does not admit redemption.
    WrongState(GrantStatus),
    /// The validity window has closed.
    Expired(AccessGrant),
}

/// Persistence contract for the access-grant ledger.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Submit a pending grant.
    ///
    /// Must be implemented as a single conditional insert (unique constraint
    /// or equivalent), not a read-then-write pair.
    async fn insert_pending(&self, grant: NewGrant) -> Result<PendingInsert>;

    /// Get a grant by id.
    async fn get_grant(&self, id: GrantId) -> Result<Option<AccessGrant>>;

    /// Get the grant holding a validation code, if any.
    async fn find_by_code(&self, code: &ValidationCode) -> Result<Option<AccessGrant>>;

    /// Approve a pending grant: store the code, stamp the approver and
    /// processing time, open the redemption window.
    ///
    /// Returns `Err(StoreError::DuplicateCode)` when the code collides with
    /// one already issued; the caller regenerates and retries.
    async fn mark_approved(
        &self,
        id: GrantId,
        approved_by: &str,
        code: &ValidationCode,
        now: i64,
    ) -> Result<Transition>;

    /// Reject a pending grant. No code is issued.
    async fn mark_rejected(&self, id: GrantId, rejected_by: &str, now: i64) -> Result<Transition>;

    /// Redeem a code: classify it and, when first redeemed, move the grant
    /// to `Downloaded` with the download timestamp.
    async fn redeem_code(&self, code: &ValidationCode, now: i64) -> Result<Redemption>;

    /// All grants targeting a resource, most recent first.
    async fn list_for_resource(&self, resource_id: ResourceId) -> Result<Vec<AccessGrant>>;

    /// All grants submitted by a requester, most recent first.
    async fn list_by_requester(&self, requester_id: &str) -> Result<Vec<AccessGrant>>;

    /// All pending grants, most recent first.
    async fn list_pending(&self) -> Result<Vec<AccessGrant>>;

    /// Grants submitted at or after `since`, most recent first.
    async fn list_recent(&self, since: i64) -> Result<Vec<AccessGrant>>;

    /// Pending grants submitted at or before `older_than`, most recent first.
    ///
    /// Operational visibility: requests that have waited past a threshold.
    async fn list_stale_pending(&self, older_than: i64) -> Result<Vec<AccessGrant>>;

    /// Number of pending grants.
    async fn count_pending(&self) -> Result<u64>;
}

/// Persistence contract for encrypted file custody.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist a sealed blob and return the stored record.
    async fn insert_blob(&self, blob: NewBlob) -> Result<EncryptedBlob>;

    /// Get a blob by id.
    async fn get_blob(&self, id: BlobId) -> Result<Option<EncryptedBlob>>;

    /// All blobs attached to a resource, most recent first.
    async fn list_blobs(&self, resource_id: ResourceId) -> Result<Vec<EncryptedBlob>>;

    /// Hard-delete a blob. Returns whether a record was removed.
    async fn delete_blob(&self, id: BlobId) -> Result<bool>;

    /// Hard-delete every blob attached to a resource (cascade support).
    /// Returns the number of records removed.
    async fn delete_blobs_for_resource(&self, resource_id: ResourceId) -> Result<u64>;
}
