//! The grant ledger service.
//!
//! Owns code generation and expiry on top of the store's guarded
//! transitions. The store is the point of atomicity; this layer maps
//! transition outcomes to the error taxonomy and fires notifications.

use std::sync::Arc;

use custos_core::{
    AccessGrant, Clock, GrantId, NewGrant, RequesterProfile, ResourceId, ValidationCode,
};
use custos_store::{GrantStore, PendingInsert, Redemption, StoreError, Transition};
use tracing::warn;

use crate::error::{LedgerError, Result};
use crate::notify::Notifier;

/// Window for the "recent requests" projection (24 hours).
pub const RECENT_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// A pending request older than this is surfaced as overdue (2 hours).
pub const STALE_PENDING_MS: i64 = 2 * 60 * 60 * 1000;

/// The access-grant lifecycle service.
pub struct GrantLedger<S> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl<S: GrantStore> GrantLedger<S> {
    /// Create a ledger over the given store.
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    /// Submit a disclosure request.
    ///
    /// Idempotent: while a pending request for the same (requester,
    /// resource) exists, it is returned unchanged and no duplicate is
    /// created or re-notified.
    pub async fn create(
        &self,
        resource_id: ResourceId,
        requester_id: &str,
        requester: RequesterProfile,
        reason: &str,
    ) -> Result<AccessGrant> {
        let grant = NewGrant {
            resource_id,
            requester_id: requester_id.to_string(),
            requester,
            reason: reason.to_string(),
            requested_at: self.clock.now_millis(),
        };

        match self.store.insert_pending(grant).await? {
            PendingInsert::Created(grant) => {
                if let Err(err) = self.notifier.request_submitted(&grant).await {
                    warn!("request-submitted notification failed: {err:#}");
                }
                Ok(grant)
            }
            PendingInsert::Existing(grant) => Ok(grant),
        }
    }

    /// Approve a pending request, minting its validation code.
    ///
    /// The code is generated without a pre-check; the store's unique index
    /// is the collision detector and generation is retried exactly once on
    /// a violation.
    pub async fn approve(&self, id: GrantId, approved_by: &str) -> Result<AccessGrant> {
        let now = self.clock.now_millis();
        let mut retried = false;

        loop {
            let code = {
                let mut rng = rand::thread_rng();
                ValidationCode::generate(&mut rng)
            };

            match self.store.mark_approved(id, approved_by, &code, now).await {
                Ok(Transition::Applied(grant)) => {
                    if let Err(err) = self.notifier.code_issued(&grant, &code).await {
                        warn!("code delivery failed for grant {id}: {err:#}");
                    }
                    return Ok(grant);
                }
                Ok(Transition::NotFound) => return Err(LedgerError::NotFound(id)),
                Ok(Transition::WrongState(status)) => {
                    return Err(LedgerError::InvalidState(status))
                }
                Err(StoreError::DuplicateCode) if !retried => {
                    warn!("validation code collision for grant {id}; regenerating");
                    retried = true;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Reject a pending request. Terminal; no code is issued.
    pub async fn reject(&self, id: GrantId, rejected_by: &str) -> Result<AccessGrant> {
        let now = self.clock.now_millis();
        match self.store.mark_rejected(id, rejected_by, now).await? {
            Transition::Applied(grant) => Ok(grant),
            Transition::NotFound => Err(LedgerError::NotFound(id)),
            Transition::WrongState(status) => Err(LedgerError::InvalidState(status)),
        }
    }

    /// Redeem a validation code.
    ///
    /// The first redemption moves the grant to `Downloaded` and notifies
    /// the owner; repeats inside the validity window return the grant
    /// unchanged (this supports resuming an interrupted transfer).
    pub async fn redeem(&self, code: &str) -> Result<AccessGrant> {
        let code = ValidationCode::parse(code).map_err(|_| LedgerError::InvalidCode)?;
        let now = self.clock.now_millis();

        match self.store.redeem_code(&code, now).await? {
            Redemption::Downloaded(grant) => {
                if let Err(err) = self.notifier.download_completed(&grant).await {
                    warn!("download notification failed for grant {}: {err:#}", grant.id);
                }
                Ok(grant)
            }
            Redemption::Repeat(grant) => Ok(grant),
            Redemption::UnknownCode => Err(LedgerError::InvalidCode),
            Redemption::WrongState(status) => Err(LedgerError::InvalidState(status)),
            Redemption::Expired(_) => Err(LedgerError::Expired),
        }
    }

    /// Redeem a code on behalf of a download of `resource_id`.
    ///
    /// Fails `Forbidden` when the code authorizes a different resource.
    /// The redemption itself still lands first, matching the order the
    /// download endpoint performs the two checks in.
    pub async fn redeem_for(&self, code: &str, resource_id: ResourceId) -> Result<AccessGrant> {
        let grant = self.redeem(code).await?;
        if grant.resource_id != resource_id {
            return Err(LedgerError::Forbidden);
        }
        Ok(grant)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read projections
    // ─────────────────────────────────────────────────────────────────────

    /// Get a grant by id.
    pub async fn grant(&self, id: GrantId) -> Result<Option<AccessGrant>> {
        Ok(self.store.get_grant(id).await?)
    }

    /// All requests targeting a resource, most recent first.
    pub async fn requests_for_resource(&self, resource_id: ResourceId) -> Result<Vec<AccessGrant>> {
        Ok(self.store.list_for_resource(resource_id).await?)
    }

    /// All requests submitted by a requester, most recent first.
    pub async fn requests_of(&self, requester_id: &str) -> Result<Vec<AccessGrant>> {
        Ok(self.store.list_by_requester(requester_id).await?)
    }

    /// All pending requests, most recent first.
    pub async fn pending(&self) -> Result<Vec<AccessGrant>> {
        Ok(self.store.list_pending().await?)
    }

    /// Requests submitted in the last 24 hours.
    pub async fn recent(&self) -> Result<Vec<AccessGrant>> {
        let since = self.clock.now_millis() - RECENT_WINDOW_MS;
        Ok(self.store.list_recent(since).await?)
    }

    /// Pending requests that have waited more than two hours.
    pub async fn overdue(&self) -> Result<Vec<AccessGrant>> {
        let older_than = self.clock.now_millis() - STALE_PENDING_MS;
        Ok(self.store.list_stale_pending(older_than).await?)
    }

    /// Number of pending requests.
    pub async fn count_pending(&self) -> Result<u64> {
        Ok(self.store.count_pending().await?)
    }
}
