//! Notification seam.
//!
//! Delivery (e-mail, SMS, in-app) lives outside this crate. The ledger only
//! owns the dispatch points and the policy that a failing collaborator is
//! logged and swallowed - it must never roll back or fail a grant
//! transition that already succeeded.

use async_trait::async_trait;
use custos_core::{AccessGrant, ValidationCode};

/// Receives lifecycle events for delivery to the involved parties.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A new pending request landed: tell the resource owner, confirm to
    /// the requester.
    async fn request_submitted(&self, grant: &AccessGrant) -> anyhow::Result<()>;

    /// A request was approved: deliver the code and its expiry to the
    /// requester.
    async fn code_issued(&self, grant: &AccessGrant, code: &ValidationCode)
        -> anyhow::Result<()>;

    /// A code was redeemed for the first time: tell the resource owner.
    async fn download_completed(&self, grant: &AccessGrant) -> anyhow::Result<()>;
}

/// A notifier that delivers nothing. Default for tests and embedded use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn request_submitted(&self, _grant: &AccessGrant) -> anyhow::Result<()> {
        Ok(())
    }

    async fn code_issued(
        &self,
        _grant: &AccessGrant,
        _code: &ValidationCode,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn download_completed(&self, _grant: &AccessGrant) -> anyhow::Result<()> {
        Ok(())
    }
}
