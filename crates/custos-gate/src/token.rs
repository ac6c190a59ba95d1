//! Signed, time-boxed bearer tokens.
//!
//! HS256 under a shared secret from `JWT_SECRET`, with the lifetime from
//! `JWT_EXPIRATION_MS`. Claims carry the subject and a role list for the
//! downstream authorization checks.

use std::sync::Arc;

use custos_core::{Clock, Profile};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GateError, Result};

/// Environment variable holding the signing secret.
pub const ENV_JWT_SECRET: &str = "JWT_SECRET";

/// Environment variable holding the token lifetime in milliseconds.
pub const ENV_JWT_EXPIRATION_MS: &str = "JWT_EXPIRATION_MS";

/// Fixed development-only secret. Never acceptable in production.
const DEV_SECRET: &str = "change-this-super-secret-key-change-this-super-secret-key";

/// Default token lifetime: one hour.
const DEFAULT_EXPIRATION_MS: i64 = 60 * 60 * 1000;

/// The claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Caller identity.
    pub sub: String,
    /// Role list for downstream authorization.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Token gate configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_ms: i64,
}

impl TokenConfig {
    /// Build from the process environment for the given profile.
    pub fn from_env(profile: Profile) -> Result<Self> {
        Self::from_lookup(profile, |var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Tests inject a closure instead of mutating process env.
    pub fn from_lookup<F>(profile: Profile, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = match lookup(ENV_JWT_SECRET).filter(|v| !v.trim().is_empty()) {
            Some(value) => value,
            None if profile.is_production() => return Err(GateError::MissingSecret),
            None => {
                warn!(
                    "{} not set; falling back to the built-in development secret",
                    ENV_JWT_SECRET
                );
                DEV_SECRET.to_string()
            }
        };

        let ttl_ms = match lookup(ENV_JWT_EXPIRATION_MS) {
            Some(value) => match value.trim().parse::<i64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    warn!(
                        "unparseable {}; using the {}ms default",
                        ENV_JWT_EXPIRATION_MS, DEFAULT_EXPIRATION_MS
                    );
                    DEFAULT_EXPIRATION_MS
                }
            },
            None => DEFAULT_EXPIRATION_MS,
        };

        Ok(Self { secret, ttl_ms })
    }

    /// A throwaway config with a random secret, for tests.
    pub fn for_tests() -> Self {
        Self {
            secret: format!("test-secret-{}", custos_core::now_millis()),
            ttl_ms: DEFAULT_EXPIRATION_MS,
        }
    }
}

/// Issues and verifies bearer tokens.
pub struct TokenAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_ms: i64,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    pub fn new(config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; the grant's own window is the only tolerance.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl_ms: config.ttl_ms,
            clock,
        }
    }

    /// Mint a token for `subject` with the configured lifetime.
    pub fn issue(&self, subject: &str, roles: &[String]) -> Result<String> {
        self.issue_with_ttl(subject, roles, self.ttl_ms)
    }

    /// Mint a token with an explicit lifetime.
    pub fn issue_with_ttl(&self, subject: &str, roles: &[String], ttl_ms: i64) -> Result<String> {
        let now = self.clock.now_millis();
        let claims = Claims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            iat: now / 1000,
            exp: (now + ttl_ms) / 1000,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| GateError::Issue(e.to_string()))
    }

    /// Verify a token and return its claims.
    ///
    /// Fails on a bad signature, malformed structure, or expiry in the
    /// past.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| GateError::InvalidToken(e.to_string()))
    }

    /// Authenticate an `Authorization` header value, if one was sent.
    ///
    /// Returns `None` for a missing header, a non-bearer scheme, or a
    /// token that fails verification - the caller proceeds unauthenticated
    /// and downstream authorization denies protected routes.
    pub fn authenticate(&self, authorization: Option<&str>) -> Option<Claims> {
        let token = bearer_token(authorization?)?;
        match self.verify(token) {
            Ok(claims) => Some(claims),
            Err(err) => {
                debug!("rejected bearer token: {err}");
                None
            }
        }
    }
}

/// Extract the token from a `Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
