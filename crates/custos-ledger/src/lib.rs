//! # Custos Ledger
//!
//! The access-grant lifecycle: a disclosure request is submitted as
//! `Pending`, the owner approves (minting a time-boxed validation code) or
//! rejects it, and the requester later redeems the code to download.
//!
//! ## Guarantees
//!
//! - Submission is idempotent per (requester, resource) while pending.
//! - Approval and rejection fire exactly once; concurrent attempts observe
//!   `InvalidState`.
//! - A code redeems only while the grant is `Approved` or `Downloaded` and
//!   before its expiry; the first redemption transitions the grant, repeats
//!   inside the window return it unchanged.
//! - Notification dispatch is best-effort: a failing collaborator never
//!   rolls back a transition that already landed.

pub mod error;
pub mod ledger;
pub mod notify;

pub use error::{LedgerError, Result};
pub use ledger::{GrantLedger, RECENT_WINDOW_MS, STALE_PENDING_MS};
pub use notify::{Notifier, NoopNotifier};
