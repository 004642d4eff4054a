//! Broker configuration.
//!
//! This module provides the configuration types for the exchange engine:
//! code and token lifetimes, token signing, and the session store sweep.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::token::SigningAlgorithm;

/// Longest accepted lifetime for any code, token or mark.
pub const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Root configuration for the exchange engine.
///
/// # Example (TOML)
///
/// ```toml
/// [broker.session]
/// interactive_code_ttl = "10s"
/// refresh_code_ttl = "60m"
/// access_token_ttl = "15m"
/// revocation_ttl = "61m"
///
/// [broker.signing]
/// algorithm = "HS256"
/// secret = "change-me"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Code, token and revocation lifetimes.
    pub session: SessionPolicy,

    /// Access token signing configuration.
    pub signing: SigningConfig,

    /// Session store maintenance.
    pub store: StoreConfig,
}

/// Lifetimes of everything the exchanger issues.
///
/// The revocation mark must outlive every code that could have been issued
/// before the logout, otherwise a pre-logout code becomes redeemable again
/// once the mark lapses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Lifetime of a code issued by an interactive (browser) login.
    /// It is redeemed right away by the redirect that carries it.
    #[serde(with = "humantime_serde")]
    pub interactive_code_ttl: Duration,

    /// Lifetime of a code issued by an API login or by a refresh.
    #[serde(with = "humantime_serde")]
    pub refresh_code_ttl: Duration,

    /// Lifetime of a signed access token.
    #[serde(with = "humantime_serde")]
    pub access_token_ttl: Duration,

    /// Lifetime of a logout mark.
    #[serde(with = "humantime_serde")]
    pub revocation_ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            interactive_code_ttl: Duration::from_secs(10),
            refresh_code_ttl: Duration::from_secs(60 * 60),
            access_token_ttl: Duration::from_secs(15 * 60),
            revocation_ttl: Duration::from_secs(61 * 60),
        }
    }
}

impl SessionPolicy {
    /// Returns the longest lifetime any code can be issued with.
    #[must_use]
    pub fn longest_code_ttl(&self) -> Duration {
        self.interactive_code_ttl.max(self.refresh_code_ttl)
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm.
    /// Supported: "HS256", "HS384", "HS512"
    pub algorithm: String,

    /// Shared HMAC secret. Required; there is no default.
    pub secret: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            secret: String::new(),
        }
    }
}

/// Session store maintenance configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// How often expired entries are reclaimed.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl BrokerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - Any lifetime or the sweep interval is zero
    /// - Any lifetime exceeds [`MAX_LIFETIME`]
    /// - The revocation lifetime does not exceed the longest code lifetime
    /// - The signing algorithm is not supported
    ///
    /// Returns `ConfigError::Missing` if the signing secret is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.session;

        for (name, value) in [
            ("interactive_code_ttl", session.interactive_code_ttl),
            ("refresh_code_ttl", session.refresh_code_ttl),
            ("access_token_ttl", session.access_token_ttl),
            ("revocation_ttl", session.revocation_ttl),
        ] {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue(format!(
                    "session.{name} must be > 0"
                )));
            }
            if value > MAX_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "session.{name} must not exceed {MAX_LIFETIME:?}"
                )));
            }
        }

        if session.revocation_ttl <= session.longest_code_ttl() {
            return Err(ConfigError::InvalidValue(format!(
                "session.revocation_ttl ({:?}) must be longer than the longest code ttl ({:?})",
                session.revocation_ttl,
                session.longest_code_ttl()
            )));
        }

        if self.signing.algorithm.parse::<SigningAlgorithm>().is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "Invalid signing algorithm: '{}'. Must be HS256, HS384, or HS512",
                self.signing.algorithm
            )));
        }

        if self.signing.secret.is_empty() {
            return Err(ConfigError::Missing("signing.secret".to_string()));
        }

        if self.store.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "store.sweep_interval must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
