//! Identity backend seam.
//!
//! The exchanger never stores users itself. It asks an [`IdentityVerifier`]
//! to check credentials and to resolve user ids back into users.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::password::verify_password;
use crate::types::{User, UserId};

/// Errors raised by an identity backend.
///
/// A wrong password or an unknown username is not an error; verifiers
/// report those as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The backend could not be reached or failed internally.
    #[error("Identity backend unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// A stored credential record cannot be used.
    #[error("Invalid credential record for user '{username}'")]
    InvalidCredentialRecord {
        /// Username whose record is broken.
        username: String,
    },

    /// The configured user directory is inconsistent.
    #[error("Invalid user directory: {message}")]
    InvalidDirectory {
        /// Description of the inconsistency.
        message: String,
    },
}

impl IdentityError {
    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidCredentialRecord` error.
    #[must_use]
    pub fn invalid_credential_record(username: impl Into<String>) -> Self {
        Self::InvalidCredentialRecord {
            username: username.into(),
        }
    }

    /// Creates a new `InvalidDirectory` error.
    #[must_use]
    pub fn invalid_directory(message: impl Into<String>) -> Self {
        Self::InvalidDirectory {
            message: message.into(),
        }
    }
}

/// Verifies credentials and resolves users.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Checks `username` and `password`.
    ///
    /// Returns `Ok(None)` when the user is unknown or the password does not
    /// match.
    async fn verify(&self, username: &str, password: &str) -> Result<Option<User>, IdentityError>;

    /// Resolves a user id into the current user record.
    ///
    /// Returns `Ok(None)` when the user no longer exists.
    async fn lookup(&self, user_id: UserId) -> Result<Option<User>, IdentityError>;
}

/// A user entry in a static directory, as written in configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserRecord {
    /// Unique user id.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Argon2 PHC hash of the password.
    pub password_hash: String,
    /// Permission codes.
    #[serde(default)]
    pub permissions: Vec<i32>,
}

impl UserRecord {
    fn to_user(&self) -> User {
        User::new(self.id, self.username.clone()).with_permissions(self.permissions.clone())
    }
}

/// Identity verifier over a fixed set of users loaded at startup.
#[derive(Debug, Clone)]
pub struct StaticIdentityVerifier {
    by_username: Arc<HashMap<String, UserRecord>>,
    by_id: Arc<HashMap<UserId, String>>,
}

impl StaticIdentityVerifier {
    /// Builds a directory from `records`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidDirectory` if two records share an id
    /// or a username.
    pub fn new(records: Vec<UserRecord>) -> Result<Self, IdentityError> {
        let mut by_username = HashMap::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());

        for record in records {
            if by_id.insert(record.id, record.username.clone()).is_some() {
                return Err(IdentityError::invalid_directory(format!(
                    "duplicate user id {}",
                    record.id
                )));
            }
            let username = record.username.clone();
            if by_username.insert(username.clone(), record).is_some() {
                return Err(IdentityError::invalid_directory(format!(
                    "duplicate username '{username}'"
                )));
            }
        }

        Ok(Self {
            by_username: Arc::new(by_username),
            by_id: Arc::new(by_id),
        })
    }

    /// Returns the number of users in the directory.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.by_username.len()
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, username: &str, password: &str) -> Result<Option<User>, IdentityError> {
        let Some(record) = self.by_username.get(username) else {
            return Ok(None);
        };

        // Argon2 is deliberately slow; keep it off the async workers.
        let hash = record.password_hash.clone();
        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| IdentityError::unavailable(e.to_string()))?
            .map_err(|_| IdentityError::invalid_credential_record(username))?;

        Ok(matches.then(|| record.to_user()))
    }

    async fn lookup(&self, user_id: UserId) -> Result<Option<User>, IdentityError> {
        Ok(self
            .by_id
            .get(&user_id)
            .and_then(|username| self.by_username.get(username))
            .map(UserRecord::to_user))
    }
}
