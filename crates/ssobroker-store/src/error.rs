//! Session store error types.

/// Errors that can occur while talking to a session store backend.
///
/// The in-memory backend never produces these; they exist so that a remote
/// backend can report transport failures without the callers having to
/// change shape.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("Session store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// A stored value had an unexpected shape for the requested key.
    #[error("Corrupt session entry for key '{key}'")]
    Corrupt {
        /// The key whose value could not be interpreted.
        key: String,
    },
}

impl StoreError {
    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Corrupt` error.
    #[must_use]
    pub fn corrupt(key: impl Into<String>) -> Self {
        Self::Corrupt { key: key.into() }
    }
}

/// Result type for session store operations.
pub type StoreResult<T> = Result<T, StoreError>;
