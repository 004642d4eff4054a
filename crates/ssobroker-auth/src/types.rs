//! Data types shared by the exchange flows.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::token::SignerError;

/// Identifier of a user as assigned by the identity backend.
pub type UserId = i64;

/// A user as resolved by an [`IdentityVerifier`](crate::identity::IdentityVerifier).
///
/// The exchanger only ever reads users; it never creates or modifies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user id.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Permission codes granted to the user, in backend order.
    #[serde(default)]
    pub permissions: Vec<i32>,
}

impl User {
    /// Creates a user without permissions.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            permissions: Vec::new(),
        }
    }

    /// Sets the user's permissions.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Vec<i32>) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Claims carried by a signed access token.
///
/// Built once per issuance and handed to the
/// [`TokenSigner`](crate::token::TokenSigner); never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    /// Id of the user the token was issued to.
    pub user_id: UserId,
    /// Application the token was issued for.
    pub app: String,
    /// Login name of the user.
    pub username: String,
    /// Permission codes of the user.
    pub permissions: Vec<i32>,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

impl TokenClaims {
    /// Builds claims for `user` in `app` that expire `lifetime` from now.
    ///
    /// # Errors
    ///
    /// Returns `SignerError::EncodingError` if the expiry is not a
    /// representable date.
    pub fn for_user(user: &User, app: &str, lifetime: Duration) -> Result<Self, SignerError> {
        let exp = time::Duration::try_from(lifetime)
            .ok()
            .and_then(|lifetime| OffsetDateTime::now_utc().checked_add(lifetime))
            .ok_or_else(|| {
                SignerError::encoding_error(format!("token lifetime {lifetime:?} is out of range"))
            })?
            .unix_timestamp();

        Ok(Self {
            user_id: user.id,
            app: app.to_string(),
            username: user.username.clone(),
            permissions: user.permissions.clone(),
            exp,
        })
    }
}

/// Result of an interactive login: the short-lived code to hand to the
/// application redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCode {
    /// The authenticated user.
    pub user_id: UserId,
    /// Single-use authorization code.
    pub code: String,
}

/// Result of an API login or a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTokens {
    /// Single-use code to present on the next refresh.
    pub refresh_code: String,
    /// Signed access token.
    pub access_token: String,
}
