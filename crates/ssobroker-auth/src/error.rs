//! Exchange error types.
//!
//! Every flow either succeeds, fails with an *expected* outcome the caller
//! reports to the client (bad credentials, spent code, revoked user), or
//! fails because a collaborator broke. The two kinds are kept apart so the
//! transport layer can map them to different responses.

use std::fmt;

use ssobroker_store::StoreError;

use crate::identity::IdentityError;
use crate::token::SignerError;

/// Errors returned by the [`TokenExchanger`](crate::TokenExchanger) flows.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The username or password did not match.
    #[error("Invalid credentials")]
    CredentialsInvalid,

    /// The code was never issued, already redeemed, expired, or belongs to
    /// another application.
    #[error("Invalid or expired code")]
    CodeInvalidOrExpired,

    /// The user logged out after the code was issued.
    #[error("User {user_id} has logged out")]
    UserRevoked {
        /// Id of the revoked user.
        user_id: i64,
    },

    /// The identity backend has no matching user, or the user vanished
    /// after a code was issued.
    #[error("User not found")]
    UserNotFound,

    /// The session store failed.
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),

    /// The identity backend failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// The token signer failed.
    #[error("Token signing error: {0}")]
    Signer(#[from] SignerError),
}

impl ExchangeError {
    /// Returns `true` for outcomes the client caused, as opposed to
    /// infrastructure failures.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::CredentialsInvalid
                | Self::CodeInvalidOrExpired
                | Self::UserRevoked { .. }
                | Self::UserNotFound
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::CredentialsInvalid => ErrorCategory::Authentication,
            Self::CodeInvalidOrExpired => ErrorCategory::Session,
            Self::UserRevoked { .. } => ErrorCategory::Session,
            Self::UserNotFound => ErrorCategory::Authentication,
            Self::Store(_) => ErrorCategory::Infrastructure,
            Self::Identity(_) => ErrorCategory::Infrastructure,
            Self::Signer(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable machine-readable code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CredentialsInvalid => "invalid_credentials",
            Self::CodeInvalidOrExpired => "invalid_code",
            Self::UserRevoked { .. } => "user_logged_out",
            Self::UserNotFound => "user_not_found",
            Self::Store(_) | Self::Identity(_) | Self::Signer(_) => "server_error",
        }
    }
}

/// Categories of exchange errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity verification failed.
    Authentication,
    /// Code or session state rejected the request.
    Session,
    /// Store or identity backend errors.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Session => write!(f, "session"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
