//! The access grant: a disclosure request tracked through its lifecycle.
//!
//! State machine: `Pending -> {Approved, Rejected}`, `Approved -> Downloaded`,
//! and `Downloaded -> Downloaded` on repeat redemption inside the validity
//! window. `Rejected` is absorbing. There is no path back to `Pending`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::code::ValidationCode;
use crate::types::{GrantId, ResourceId};

/// How long a validation code stays usable after approval (24 hours).
pub const CODE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Lifecycle state of an access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// Submitted, awaiting the owner's decision.
    Pending,
    /// Approved; a validation code has been issued.
    Approved,
    /// Rejected by the owner. Terminal.
    Rejected,
    /// The code has been redeemed at least once.
    Downloaded,
}

impl GrantStatus {
    /// Stable string form used by the persistence layer.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Pending => "pending",
            GrantStatus::Approved => "approved",
            GrantStatus::Rejected => "rejected",
            GrantStatus::Downloaded => "downloaded",
        }
    }

    /// Parse the persisted string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(GrantStatus::Pending),
            "approved" => Some(GrantStatus::Approved),
            "rejected" => Some(GrantStatus::Rejected),
            "downloaded" => Some(GrantStatus::Downloaded),
            _ => None,
        }
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact details of the party requesting disclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterProfile {
    /// Display name.
    pub name: String,
    /// E-mail address codes and confirmations are sent to.
    pub email: String,
    /// Organization the requester acts for.
    pub organization: String,
    /// Optional phone number for SMS delivery.
    pub phone: Option<String>,
}

/// A disclosure request and its full lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Row identifier, assigned by the store.
    pub id: GrantId,
    /// The resource this grant would disclose.
    pub resource_id: ResourceId,
    /// Stable identity of the requester (account id or similar).
    pub requester_id: String,
    /// Who is asking.
    pub requester: RequesterProfile,
    /// Free-text justification supplied with the request.
    pub reason: String,
    /// Current lifecycle state.
    pub status: GrantStatus,
    /// Present once approved; unique across all grants.
    pub validation_code: Option<ValidationCode>,
    /// Unix ms after which the code no longer redeems.
    pub expires_at: Option<i64>,
    /// When the request was submitted (Unix ms).
    pub requested_at: i64,
    /// When it was approved or rejected.
    pub processed_at: Option<i64>,
    /// Identity of the approver/rejecter.
    pub processed_by: Option<String>,
    /// When the code was first redeemed.
    pub downloaded_at: Option<i64>,
}

/// A grant as submitted, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGrant {
    pub resource_id: ResourceId,
    pub requester_id: String,
    pub requester: RequesterProfile,
    pub reason: String,
    pub requested_at: i64,
}

impl AccessGrant {
    pub fn is_pending(&self) -> bool {
        self.status == GrantStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == GrantStatus::Approved
    }

    pub fn is_rejected(&self) -> bool {
        self.status == GrantStatus::Rejected
    }

    pub fn is_downloaded(&self) -> bool {
        self.status == GrantStatus::Downloaded
    }

    /// Whether the code's validity window has closed.
    ///
    /// A grant with no expiry (never approved) is not "expired".
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(expires) if now >= expires)
    }

    /// Whether the code currently redeems: state in {Approved, Downloaded}
    /// and inside the validity window.
    pub fn code_usable(&self, now: i64) -> bool {
        matches!(self.status, GrantStatus::Approved | GrantStatus::Downloaded)
            && !self.is_expired(now)
    }

    /// Apply the approval transition. Only legal from `Pending`.
    ///
    /// Stamps the approver and processing time and opens the 24-hour
    /// redemption window.
    pub fn approve(&mut self, processed_by: &str, code: ValidationCode, now: i64) {
        debug_assert!(self.is_pending());
        self.status = GrantStatus::Approved;
        self.validation_code = Some(code);
        self.processed_by = Some(processed_by.to_string());
        self.processed_at = Some(now);
        self.expires_at = Some(now + CODE_TTL_MS);
    }

    /// Apply the rejection transition. Only legal from `Pending`. No code
    /// is issued.
    pub fn reject(&mut self, processed_by: &str, now: i64) {
        debug_assert!(self.is_pending());
        self.status = GrantStatus::Rejected;
        self.processed_by = Some(processed_by.to_string());
        self.processed_at = Some(now);
    }

    /// Record the first redemption. Only legal from `Approved`.
    pub fn mark_downloaded(&mut self, now: i64) {
        debug_assert!(self.is_approved());
        self.status = GrantStatus::Downloaded;
        self.downloaded_at = Some(now);
    }
}

impl NewGrant {
    /// Materialize the grant the store will hold, with the assigned id.
    pub fn into_grant(self, id: GrantId) -> AccessGrant {
        AccessGrant {
            id,
            resource_id: self.resource_id,
            requester_id: self.requester_id,
            requester: self.requester,
            reason: self.reason,
            status: GrantStatus::Pending,
            validation_code: None,
            expires_at: None,
            requested_at: self.requested_at,
            processed_at: None,
            processed_by: None,
            downloaded_at: None,
        }
    }
}
