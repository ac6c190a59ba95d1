//! Deployment profile.
//!
//! Components that source secrets from the environment consult the profile:
//! production deployments must fail fast when a secret is absent, while
//! development falls back to fixed constants (with a warning) so local runs
//! need no setup.

use std::fmt;

/// The deployment profile, from `APP_PROFILE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Local development: insecure fallbacks allowed, loudly.
    #[default]
    Development,
    /// Production: missing secrets are a startup error.
    Production,
}

impl Profile {
    /// Environment variable the profile is read from.
    pub const ENV_VAR: &'static str = "APP_PROFILE";

    /// Read the profile from the environment; anything other than
    /// `production`/`prod` is development.
    pub fn from_env() -> Self {
        match std::env::var(Self::ENV_VAR) {
            Ok(v) if v.eq_ignore_ascii_case("production") || v.eq_ignore_ascii_case("prod") => {
                Profile::Production
            }
            _ => Profile::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Profile::Production)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Development => f.write_str("development"),
            Profile::Production => f.write_str("production"),
        }
    }
}
