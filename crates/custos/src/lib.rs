//! # Custos
//!
//! Controlled, time-limited disclosure of sensitive documents, with the
//! documents held at rest in encrypted form.
//!
//! ## Overview
//!
//! A requesting party submits a disclosure request for a resource. The
//! owner approves it, which mints a short validation code with a 24-hour
//! expiry, or rejects it. The requester presents the code to the download
//! endpoint; while the code is valid the stored file is opened and
//! returned, and the grant is marked downloaded. Repeat redemption inside
//! the window resumes an interrupted transfer; nothing re-opens an expired
//! or rejected grant.
//!
//! ## Key Concepts
//!
//! - **Grant**: one disclosure request, tracked `Pending -> Approved ->
//!   Downloaded` (or `Rejected`). Transitions are atomic against the store.
//! - **Validation code**: the only credential the public download endpoint
//!   accepts; unique across all grants, usable for exactly one resource.
//! - **Vault**: files are sealed with ChaCha20-Poly1305 under a fresh nonce
//!   per blob; tampering fails closed at fetch time.
//! - **Gate**: fixed-window rate limits per client address, and HS256
//!   bearer tokens for the administrative surfaces.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use custos::{BrokerConfig, DisclosureBroker};
//! use custos::core::{Profile, ResourceId, RequesterProfile, SystemClock};
//! use custos::ledger::NoopNotifier;
//! use custos::store::SqliteStore;
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("custos.db").unwrap());
//!     let config = BrokerConfig::from_env(Profile::from_env()).unwrap();
//!     let broker = DisclosureBroker::new(
//!         store,
//!         config,
//!         Arc::new(NoopNotifier),
//!         Arc::new(SystemClock),
//!     );
//!
//!     let requester = RequesterProfile {
//!         name: "Alice Martin".into(),
//!         email: "alice@example.org".into(),
//!         organization: "Example SA".into(),
//!         phone: None,
//!     };
//!     let grant = broker
//!         .submit_request("203.0.113.9", ResourceId(1), "alice", requester, "audit")
//!         .await
//!         .unwrap();
//!     println!("request {} is {}", grant.id, grant.status);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `custos::core` - Domain types (AccessGrant, ValidationCode, etc.)
//! - `custos::store` - Storage abstraction and SQLite
//! - `custos::ledger` - Grant lifecycle
//! - `custos::vault` - Encrypted file custody
//! - `custos::gate` - Rate limiting and bearer tokens

pub mod broker;
pub mod error;

// Re-export component crates
pub use custos_core as core;
pub use custos_gate as gate;
pub use custos_ledger as ledger;
pub use custos_store as store;
pub use custos_vault as vault;

// Re-export main types for convenience
pub use broker::{BrokerConfig, DisclosureBroker, FileUpload};
pub use error::{BrokerError, Result};

// Re-export commonly used component types
pub use custos_core::{
    AccessGrant, BlobId, Clock, EncryptedBlob, FileKind, GrantId, GrantStatus, Profile,
    RequesterProfile, ResourceId, SystemClock, ValidationCode,
};
pub use custos_gate::{Claims, LimitClass, RateLimiter, TokenAuthority};
pub use custos_ledger::{GrantLedger, Notifier, NoopNotifier};
pub use custos_vault::{FileContent, FileVault};
