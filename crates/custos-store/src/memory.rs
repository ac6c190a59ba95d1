//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite but
//! keeps everything in memory with no persistence. Every operation takes
//! the single write lock, which gives the same serialized-transition
//! guarantees as the SQLite connection mutex.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use custos_core::{
    AccessGrant, BlobId, EncryptedBlob, GrantId, GrantStatus, NewBlob, NewGrant, ResourceId,
    ValidationCode,
};

use crate::error::Result;
use crate::traits::{BlobStore, GrantStore, PendingInsert, Redemption, Transition};
use crate::StoreError;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Grants indexed by id.
    grants: HashMap<GrantId, AccessGrant>,

    /// Code index: validation code -> grant id.
    codes: HashMap<String, GrantId>,

    next_grant_id: i64,

    /// Blobs indexed by id.
    blobs: HashMap<BlobId, EncryptedBlob>,

    next_blob_id: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                grants: HashMap::new(),
                codes: HashMap::new(),
                next_grant_id: 1,
                blobs: HashMap::new(),
                next_blob_id: 1,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Most-recent-first: submission time descending, id as tiebreaker.
fn sort_recent_first(grants: &mut [AccessGrant]) {
    grants.sort_by(|a, b| {
        b.requested_at
            .cmp(&a.requested_at)
            .then(b.id.as_i64().cmp(&a.id.as_i64()))
    });
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn insert_pending(&self, grant: NewGrant) -> Result<PendingInsert> {
        let mut inner = self.inner.write().unwrap();

        // Conditional insert: an existing pending row for the same
        // (requester, resource) wins.
        if let Some(existing) = inner
            .grants
            .values()
            .find(|g| {
                g.is_pending()
                    && g.requester_id == grant.requester_id
                    && g.resource_id == grant.resource_id
            })
            .cloned()
        {
            return Ok(PendingInsert::Existing(existing));
        }

        let id = GrantId(inner.next_grant_id);
        inner.next_grant_id += 1;

        let stored = grant.into_grant(id);
        inner.grants.insert(id, stored.clone());
        Ok(PendingInsert::Created(stored))
    }

    async fn get_grant(&self, id: GrantId) -> Result<Option<AccessGrant>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.grants.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &ValidationCode) -> Result<Option<AccessGrant>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .codes
            .get(code.as_str())
            .and_then(|id| inner.grants.get(id))
            .cloned())
    }

    async fn mark_approved(
        &self,
        id: GrantId,
        approved_by: &str,
        code: &ValidationCode,
        now: i64,
    ) -> Result<Transition> {
        let mut inner = self.inner.write().unwrap();

        if inner.codes.contains_key(code.as_str()) {
            return Err(StoreError::DuplicateCode);
        }

        let Some(grant) = inner.grants.get_mut(&id) else {
            return Ok(Transition::NotFound);
        };
        if !grant.is_pending() {
            return Ok(Transition::WrongState(grant.status));
        }

        grant.approve(approved_by, code.clone(), now);
        let updated = grant.clone();
        inner.codes.insert(code.as_str().to_string(), id);
        Ok(Transition::Applied(updated))
    }

    async fn mark_rejected(&self, id: GrantId, rejected_by: &str, now: i64) -> Result<Transition> {
        let mut inner = self.inner.write().unwrap();

        let Some(grant) = inner.grants.get_mut(&id) else {
            return Ok(Transition::NotFound);
        };
        if !grant.is_pending() {
            return Ok(Transition::WrongState(grant.status));
        }

        grant.reject(rejected_by, now);
        Ok(Transition::Applied(grant.clone()))
    }

    async fn redeem_code(&self, code: &ValidationCode, now: i64) -> Result<Redemption> {
        let mut inner = self.inner.write().unwrap();

        let Some(&id) = inner.codes.get(code.as_str()) else {
            return Ok(Redemption::UnknownCode);
        };
        let grant = inner
            .grants
            .get_mut(&id)
            .expect("code index points at a live grant");

        match grant.status {
            GrantStatus::Approved | GrantStatus::Downloaded => {
                if grant.is_expired(now) {
                    return Ok(Redemption::Expired(grant.clone()));
                }
                if grant.is_approved() {
                    grant.mark_downloaded(now);
                    Ok(Redemption::Downloaded(grant.clone()))
                } else {
                    Ok(Redemption::Repeat(grant.clone()))
                }
            }
            status => Ok(Redemption::WrongState(status)),
        }
    }

    async fn list_for_resource(&self, resource_id: ResourceId) -> Result<Vec<AccessGrant>> {
        let inner = self.inner.read().unwrap();
        let mut grants: Vec<AccessGrant> = inner
            .grants
            .values()
            .filter(|g| g.resource_id == resource_id)
            .cloned()
            .collect();
        sort_recent_first(&mut grants);
        Ok(grants)
    }

    async fn list_by_requester(&self, requester_id: &str) -> Result<Vec<AccessGrant>> {
        let inner = self.inner.read().unwrap();
        let mut grants: Vec<AccessGrant> = inner
            .grants
            .values()
            .filter(|g| g.requester_id == requester_id)
            .cloned()
            .collect();
        sort_recent_first(&mut grants);
        Ok(grants)
    }

    async fn list_pending(&self) -> Result<Vec<AccessGrant>> {
        let inner = self.inner.read().unwrap();
        let mut grants: Vec<AccessGrant> = inner
            .grants
            .values()
            .filter(|g| g.is_pending())
            .cloned()
            .collect();
        sort_recent_first(&mut grants);
        Ok(grants)
    }

    async fn list_recent(&self, since: i64) -> Result<Vec<AccessGrant>> {
        let inner = self.inner.read().unwrap();
        let mut grants: Vec<AccessGrant> = inner
            .grants
            .values()
            .filter(|g| g.requested_at >= since)
            .cloned()
            .collect();
        sort_recent_first(&mut grants);
        Ok(grants)
    }

    async fn list_stale_pending(&self, older_than: i64) -> Result<Vec<AccessGrant>> {
        let inner = self.inner.read().unwrap();
        let mut grants: Vec<AccessGrant> = inner
            .grants
            .values()
            .filter(|g| g.is_pending() && g.requested_at <= older_than)
            .cloned()
            .collect();
        sort_recent_first(&mut grants);
        Ok(grants)
    }

    async fn count_pending(&self) -> Result<u64> {
        let inner = self.inner.read().unwrap();
        Ok(inner.grants.values().filter(|g| g.is_pending()).count() as u64)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn insert_blob(&self, blob: NewBlob) -> Result<EncryptedBlob> {
        let mut inner = self.inner.write().unwrap();

        let id = BlobId(inner.next_blob_id);
        inner.next_blob_id += 1;

        let stored = blob.into_blob(id);
        inner.blobs.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_blob(&self, id: BlobId) -> Result<Option<EncryptedBlob>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.blobs.get(&id).cloned())
    }

    async fn list_blobs(&self, resource_id: ResourceId) -> Result<Vec<EncryptedBlob>> {
        let inner = self.inner.read().unwrap();
        let mut blobs: Vec<EncryptedBlob> = inner
            .blobs
            .values()
            .filter(|b| b.resource_id == resource_id)
            .cloned()
            .collect();
        blobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.as_i64().cmp(&a.id.as_i64()))
        });
        Ok(blobs)
    }

    async fn delete_blob(&self, id: BlobId) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.blobs.remove(&id).is_some())
    }

    async fn delete_blobs_for_resource(&self, resource_id: ResourceId) -> Result<u64> {
        let mut inner = self.inner.write().unwrap();
        let doomed: Vec<BlobId> = inner
            .blobs
            .values()
            .filter(|b| b.resource_id == resource_id)
            .map(|b| b.id)
            .collect();
        for id in &doomed {
            inner.blobs.remove(id);
        }
        Ok(doomed.len() as u64)
    }
}
