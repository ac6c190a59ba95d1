//! The disclosure broker: unified API over ledger, vault, and gate.
//!
//! This is what the (external) routing layer calls. Every externally
//! reachable operation passes the rate limiter first; the administrative
//! surfaces additionally require verified claims, which the boundary
//! obtains from [`DisclosureBroker::tokens`].

use std::sync::Arc;

use bytes::Bytes;
use custos_core::{
    AccessGrant, BlobId, Clock, EncryptedBlob, GrantId, Profile, RequesterProfile, ResourceId,
};
use custos_gate::{Claims, LimitClass, RateLimiter, TokenAuthority, TokenConfig};
use custos_ledger::{GrantLedger, Notifier};
use custos_store::{BlobStore, GrantStore};
use custos_vault::{FileContent, FileVault, VaultConfig};
use tracing::info;

use crate::error::{BrokerError, Result};

/// Configuration for the broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub vault: VaultConfig,
    pub token: TokenConfig,
}

impl BrokerConfig {
    /// Build from the process environment for the given profile.
    ///
    /// In production this fails fast when `APP_FILE_KEY` or `JWT_SECRET`
    /// is absent.
    pub fn from_env(profile: Profile) -> Result<Self> {
        Ok(Self {
            vault: VaultConfig::from_env(profile)?,
            token: TokenConfig::from_env(profile)?,
        })
    }

    /// Throwaway config with random secrets, for tests.
    pub fn for_tests() -> Self {
        Self {
            vault: VaultConfig::for_tests(),
            token: TokenConfig::for_tests(),
        }
    }
}

/// An upload as received from the multipart boundary.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub category: Option<String>,
}

/// The disclosure broker.
pub struct DisclosureBroker<S> {
    ledger: GrantLedger<S>,
    vault: FileVault<S>,
    limiter: RateLimiter,
    tokens: TokenAuthority,
}

impl<S: GrantStore + BlobStore> DisclosureBroker<S> {
    /// Create a broker over the given store.
    pub fn new(
        store: Arc<S>,
        config: BrokerConfig,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger: GrantLedger::new(Arc::clone(&store), notifier, Arc::clone(&clock)),
            vault: FileVault::new(store, config.vault, Arc::clone(&clock)),
            limiter: RateLimiter::new(Arc::clone(&clock)),
            tokens: TokenAuthority::new(config.token, clock),
        }
    }

    /// The token authority, for the boundary's header authentication.
    pub fn tokens(&self) -> &TokenAuthority {
        &self.tokens
    }

    /// Direct access to the grant ledger.
    pub fn ledger(&self) -> &GrantLedger<S> {
        &self.ledger
    }

    /// Direct access to the file vault.
    pub fn vault(&self) -> &FileVault<S> {
        &self.vault
    }

    fn check_rate(&self, class: LimitClass, client_addr: &str) -> Result<()> {
        if self.limiter.allow_class(class, client_addr) {
            Ok(())
        } else {
            Err(BrokerError::RateLimited)
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Authentication surface
    // ─────────────────────────────────────────────────────────────────────

    /// Mint a bearer token for an authenticated subject.
    ///
    /// Credential checking happens upstream (identity management is
    /// external); this applies the auth-class rate budget and signs.
    pub fn issue_token(
        &self,
        client_addr: &str,
        subject: &str,
        roles: &[String],
    ) -> Result<String> {
        self.check_rate(LimitClass::Auth, client_addr)?;
        Ok(self.tokens.issue(subject, roles)?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Disclosure surface
    // ─────────────────────────────────────────────────────────────────────

    /// Submit a disclosure request for a resource.
    pub async fn submit_request(
        &self,
        client_addr: &str,
        resource_id: ResourceId,
        requester_id: &str,
        requester: RequesterProfile,
        reason: &str,
    ) -> Result<AccessGrant> {
        self.check_rate(LimitClass::Disclosure, client_addr)?;
        Ok(self
            .ledger
            .create(resource_id, requester_id, requester, reason)
            .await?)
    }

    /// Approve a pending request. The caller's subject becomes the
    /// processor identity.
    pub async fn approve_request(&self, claims: &Claims, grant_id: GrantId) -> Result<AccessGrant> {
        Ok(self.ledger.approve(grant_id, &claims.sub).await?)
    }

    /// Reject a pending request.
    pub async fn reject_request(&self, claims: &Claims, grant_id: GrantId) -> Result<AccessGrant> {
        Ok(self.ledger.reject(grant_id, &claims.sub).await?)
    }

    /// Redeem a validation code and return the resource's newest file.
    ///
    /// The code is the only credential here. It must authorize exactly the
    /// requested resource; a mismatch is `Forbidden`.
    pub async fn download(
        &self,
        client_addr: &str,
        resource_id: ResourceId,
        code: &str,
    ) -> Result<FileContent> {
        self.check_rate(LimitClass::Disclosure, client_addr)?;
        self.ledger.redeem_for(code, resource_id).await?;

        let blob = self
            .vault
            .latest(resource_id)
            .await?
            .ok_or(BrokerError::NoFile(resource_id))?;
        Ok(self.vault.fetch(blob.id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // File surface (authenticated)
    // ─────────────────────────────────────────────────────────────────────

    /// Store an uploaded file for a resource.
    pub async fn upload(
        &self,
        claims: &Claims,
        resource_id: ResourceId,
        upload: FileUpload,
    ) -> Result<EncryptedBlob> {
        let blob = self
            .vault
            .store(
                resource_id,
                &upload.file_name,
                &upload.content_type,
                upload.bytes,
                upload.category,
            )
            .await?;
        info!(
            "{} uploaded {} ({} bytes) to resource {}",
            claims.sub, blob.file_name, blob.plain_len, resource_id
        );
        Ok(blob)
    }

    /// Fetch a stored file by its internal identifier (owner path).
    pub async fn fetch_file(&self, _claims: &Claims, blob_id: BlobId) -> Result<FileContent> {
        Ok(self.vault.fetch(blob_id).await?)
    }

    /// Hard-delete a stored file.
    pub async fn remove_file(&self, claims: &Claims, blob_id: BlobId) -> Result<()> {
        self.vault.remove(blob_id).await?;
        info!("{} removed blob {}", claims.sub, blob_id);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read projections
    // ─────────────────────────────────────────────────────────────────────

    /// All requests targeting a resource, most recent first.
    pub async fn requests_for_resource(&self, resource_id: ResourceId) -> Result<Vec<AccessGrant>> {
        Ok(self.ledger.requests_for_resource(resource_id).await?)
    }

    /// All requests submitted by a requester, most recent first.
    pub async fn requests_of(&self, requester_id: &str) -> Result<Vec<AccessGrant>> {
        Ok(self.ledger.requests_of(requester_id).await?)
    }

    /// All pending requests, most recent first.
    pub async fn pending_requests(&self) -> Result<Vec<AccessGrant>> {
        Ok(self.ledger.pending().await?)
    }

    /// Requests from the last 24 hours.
    pub async fn recent_requests(&self) -> Result<Vec<AccessGrant>> {
        Ok(self.ledger.recent().await?)
    }

    /// Pending requests that have waited more than two hours.
    pub async fn overdue_requests(&self) -> Result<Vec<AccessGrant>> {
        Ok(self.ledger.overdue().await?)
    }
}
