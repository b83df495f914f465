//! Application configuration.
//!
//! Two secrets are mandatory: the token signing secret and the field
//! encryption key. Both come from the environment and both are fail-fast:
//! a process that cannot sign tokens or encrypt fields must not start,
//! because a missing key discovered mid-request turns into data written
//! plaintext or tokens nobody can verify.
//!
//! Environment variables:
//!
//! | Variable | Required | Meaning |
//! |---|---|---|
//! | `JWT_SECRET` | yes | HS256 signing secret for session tokens |
//! | `ENCRYPTION_KEY` | yes | Field encryption secret |
//! | `TOKEN_LIFETIME_SECS` | no | Session lifetime, default 86400 |
//! | `PBKDF2_ITERATIONS` | no | Credential KDF rounds, default 1000 |

use std::fmt;
use std::time::Duration;

use crate::token::DEFAULT_TOKEN_LIFETIME;

const DEFAULT_PBKDF2_ITERATIONS: u32 = 1000;

/// Validated application configuration.
///
/// Construct with [`AppConfig::from_env`] in deployments or
/// [`AppConfig::builder`] in tests.
#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub encryption_key: String,
    pub token_lifetime: Duration,
    pub pbkdf2_iterations: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Fails if either secret is unset or empty. Optional values fall back
    /// to their defaults when unset; an unparseable optional value is also
    /// an error rather than a silent fallback.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = require_env("JWT_SECRET")?;
        let encryption_key = require_env("ENCRYPTION_KEY")?;

        let token_lifetime = match std::env::var("TOKEN_LIFETIME_SECS") {
            Ok(raw) => Duration::from_secs(parse_env("TOKEN_LIFETIME_SECS", &raw)?),
            Err(_) => DEFAULT_TOKEN_LIFETIME,
        };

        let pbkdf2_iterations = match std::env::var("PBKDF2_ITERATIONS") {
            Ok(raw) => parse_env("PBKDF2_ITERATIONS", &raw)?,
            Err(_) => DEFAULT_PBKDF2_ITERATIONS,
        };

        Ok(Self {
            jwt_secret,
            encryption_key,
            token_lifetime,
            pbkdf2_iterations,
        })
    }

    /// Start building a configuration with explicit secrets.
    pub fn builder(jwt_secret: impl Into<String>, encryption_key: impl Into<String>) -> AppConfigBuilder {
        AppConfigBuilder {
            jwt_secret: jwt_secret.into(),
            encryption_key: encryption_key.into(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("encryption_key", &"[REDACTED]")
            .field("token_lifetime", &self.token_lifetime)
            .field("pbkdf2_iterations", &self.pbkdf2_iterations)
            .finish()
    }
}

/// Builder for [`AppConfig`].
#[derive(Clone)]
pub struct AppConfigBuilder {
    jwt_secret: String,
    encryption_key: String,
    token_lifetime: Duration,
    pbkdf2_iterations: u32,
}

impl AppConfigBuilder {
    pub fn token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    pub fn pbkdf2_iterations(mut self, iterations: u32) -> Self {
        self.pbkdf2_iterations = iterations;
        self
    }

    /// Finish the build, validating that both secrets are non-empty.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.encryption_key.is_empty() {
            return Err(ConfigError::Missing("ENCRYPTION_KEY"));
        }
        Ok(AppConfig {
            jwt_secret: self.jwt_secret,
            encryption_key: self.encryption_key,
            token_lifetime: self.token_lifetime,
            pbkdf2_iterations: self.pbkdf2_iterations,
        })
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse()
        .map_err(|_| ConfigError::Invalid(name, raw.to_string()))
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty
    Missing(&'static str),
    /// A variable is set but unparseable
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "required configuration {} is unset or empty", name),
            Self::Invalid(name, value) => {
                write!(f, "configuration {} has invalid value {:?}", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Tests
// ============================================================================
