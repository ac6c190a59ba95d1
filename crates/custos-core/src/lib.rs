//! # Custos Core
//!
//! Pure domain types for the Custos disclosure broker: access grants,
//! validation codes, blob metadata, and the clock abstraction.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over the disclosure-request state machine.
//!
//! ## Key Types
//!
//! - [`AccessGrant`] - A disclosure request tracked through its lifecycle
//! - [`GrantStatus`] - The four lifecycle states of a grant
//! - [`ValidationCode`] - The short opaque credential minted on approval
//! - [`EncryptedBlob`] - Metadata and payload of a stored file version
//! - [`Clock`] - Injectable time source so expiry logic is testable

pub mod blob;
pub mod clock;
pub mod code;
pub mod error;
pub mod grant;
pub mod profile;
pub mod types;

pub use blob::{EncryptedBlob, FileKind, NewBlob, NONCE_LEN};
pub use clock::{now_millis, Clock, ManualClock, SystemClock};
pub use code::ValidationCode;
pub use error::CoreError;
pub use grant::{AccessGrant, GrantStatus, NewGrant, RequesterProfile, CODE_TTL_MS};
pub use profile::Profile;
pub use types::{BlobId, GrantId, ResourceId};
