//! # Custos Gate
//!
//! The two components that wrap every externally reachable operation:
//!
//! - [`RateLimiter`] - fixed-window request counters per client address and
//!   endpoint class. Denials carry no side effect; the boundary surfaces
//!   them as HTTP 429.
//! - [`TokenAuthority`] - issues and verifies the signed, time-boxed bearer
//!   tokens that gate the administrative and disclosure surfaces. A failed
//!   verification never raises past the boundary; the caller simply
//!   proceeds unauthenticated.

pub mod error;
pub mod limiter;
pub mod token;

pub use error::{GateError, Result};
pub use limiter::{LimitClass, RateLimiter, WINDOW};
pub use token::{
    bearer_token, Claims, TokenAuthority, TokenConfig, ENV_JWT_EXPIRATION_MS, ENV_JWT_SECRET,
};
