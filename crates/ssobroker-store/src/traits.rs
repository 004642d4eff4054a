//! Session store trait and value type.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// A value held by the session store.
///
/// Authorization codes map to the user they were issued for; revocation
/// marks only need a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionValue {
    /// The id of the user a code was issued for.
    UserId(i64),
    /// A boolean marker.
    Flag(bool),
}

impl SessionValue {
    /// Returns the user id if this value holds one.
    #[must_use]
    pub fn as_user_id(&self) -> Option<i64> {
        match self {
            Self::UserId(id) => Some(*id),
            Self::Flag(_) => None,
        }
    }

    /// Returns the flag if this value holds one.
    #[must_use]
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            Self::UserId(_) => None,
        }
    }
}

/// Storage trait for expiring session entries.
///
/// All operations are scoped to a single key. Implementations must make
/// per-key operations linearizable with respect to each other; no ordering
/// is promised across different keys.
///
/// # Implementations
///
/// - [`InMemorySessionStore`](crate::InMemorySessionStore) - process-local,
///   backed by a sharded concurrent map
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// The entry expires `ttl` after the call. A zero `ttl` produces an entry
    /// that is already expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable.
    async fn put(&self, key: &str, value: SessionValue, ttl: Duration) -> StoreResult<()>;

    /// Returns the value under `key`.
    ///
    /// Returns `None` if the key is absent or its deadline has passed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable.
    async fn get(&self, key: &str) -> StoreResult<Option<SessionValue>>;

    /// Removes the entry under `key`.
    ///
    /// Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Atomically reads and removes the entry under `key`.
    ///
    /// Among any number of concurrent `take` calls for the same live key,
    /// exactly one observes the value; the others observe `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable.
    async fn take(&self, key: &str) -> StoreResult<Option<SessionValue>>;

    /// Removes every expired entry.
    ///
    /// # Returns
    ///
    /// Returns the number of entries removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unavailable.
    async fn purge_expired(&self) -> StoreResult<u64>;

    /// Returns the number of physically stored entries, expired or not.
    async fn entry_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(SessionValue::UserId(42).as_user_id(), Some(42));
        assert_eq!(SessionValue::UserId(42).as_flag(), None);
        assert_eq!(SessionValue::Flag(true).as_flag(), Some(true));
        assert_eq!(SessionValue::Flag(true).as_user_id(), None);
    }

    #[test]
    fn test_value_serialization() {
        let json = serde_json::to_string(&SessionValue::UserId(7)).unwrap();
        assert_eq!(json, r#"{"user_id":7}"#);
    }
}
