//! Time-bounded logout marks.

use std::time::Duration;

use ssobroker_store::{DynSessionStore, SessionValue, StoreError, StoreResult};

use crate::types::UserId;

fn logout_key(user_id: UserId) -> String {
    format!("logout.{user_id}")
}

/// Records which users have logged out recently.
///
/// A mark blocks refreshes for its user until it expires or a later
/// credential login clears it.
#[derive(Clone)]
pub struct RevocationRegistry {
    store: DynSessionStore,
}

impl RevocationRegistry {
    /// Creates a registry over `store`.
    pub fn new(store: DynSessionStore) -> Self {
        Self { store }
    }

    /// Marks `user_id` as logged out for `ttl`. Re-marking extends the mark.
    pub async fn mark_logged_out(&self, user_id: UserId, ttl: Duration) -> StoreResult<()> {
        self.store
            .put(&logout_key(user_id), SessionValue::Flag(true), ttl)
            .await
    }

    /// Returns `true` if an unexpired mark exists for `user_id`.
    ///
    /// A non-flag value under the mark key is reported as `StoreError::Corrupt`.
    pub async fn is_logged_out(&self, user_id: UserId) -> StoreResult<bool> {
        let key = logout_key(user_id);
        match self.store.get(&key).await? {
            Some(value) => value.as_flag().ok_or_else(|| StoreError::corrupt(key)),
            None => Ok(false),
        }
    }

    /// Removes the mark for `user_id`, if any.
    pub async fn clear(&self, user_id: UserId) -> StoreResult<()> {
        self.store.delete(&logout_key(user_id)).await
    }
}

impl std::fmt::Debug for RevocationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationRegistry").finish_non_exhaustive()
    }
}
