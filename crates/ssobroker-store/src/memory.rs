use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::StoreResult;
use crate::traits::{SessionStore, SessionValue};

/// Caps deadlines so `now + ttl` cannot overflow the clock.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

#[derive(Debug, Clone, Copy)]
struct StoredEntry {
    value: SessionValue,
    expires_at: Instant,
}

impl StoredEntry {
    fn new(value: SessionValue, ttl: Duration, now: Instant) -> Self {
        Self {
            value,
            expires_at: now + ttl.min(MAX_TTL),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// In-memory session store using a sharded concurrent map.
///
/// Each key lives in exactly one shard and every operation on it holds that
/// shard's lock for its whole duration, which makes per-key operations
/// linearizable. [`take`](SessionStore::take) is a single `remove`, so two
/// racing redemptions of the same key can never both see the value.
///
/// Deadlines use [`tokio::time::Instant`], so a paused test runtime controls
/// expiry.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: DashMap<String, StoredEntry>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, key: &str, value: SessionValue, ttl: Duration) -> StoreResult<()> {
        let entry = StoredEntry::new(value, ttl, Instant::now());
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<SessionValue>> {
        let now = Instant::now();

        // The shard read guard must be released before the lazy purge below.
        let live = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value),
            Some(_) => None,
            None => return Ok(None),
        };

        if live.is_none() {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }

        Ok(live)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> StoreResult<Option<SessionValue>> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .and_then(|(_, entry)| entry.is_live(now).then_some(entry.value)))
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let now = Instant::now();
        let mut purged = 0u64;
        self.entries.retain(|_, entry| {
            let keep = entry.is_live(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }

    async fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    const TEN_SECONDS: Duration = Duration::from_secs(10);
    const EPSILON: Duration = Duration::from_millis(1);

    #[tokio::test(start_paused = true)]
    async fn test_get_before_and_after_deadline() {
        let store = InMemorySessionStore::new();
        assert_ok!(store.put("k", SessionValue::UserId(1), TEN_SECONDS).await);

        tokio::time::advance(TEN_SECONDS - EPSILON).await;
        assert_eq!(store.get("k").await.unwrap(), Some(SessionValue::UserId(1)));

        tokio::time::advance(EPSILON).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_purged_lazily_on_get() {
        let store = InMemorySessionStore::new();
        store
            .put("k", SessionValue::Flag(true), TEN_SECONDS)
            .await
            .unwrap();
        tokio::time::advance(TEN_SECONDS).await;

        assert_eq!(store.entry_count().await, 1);
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_born_expired() {
        let store = InMemorySessionStore::new();
        store
            .put("k", SessionValue::UserId(1), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.take("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_value_and_deadline() {
        let store = InMemorySessionStore::new();
        store
            .put("k", SessionValue::UserId(1), TEN_SECONDS)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        store
            .put("k", SessionValue::UserId(2), TEN_SECONDS)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(store.get("k").await.unwrap(), Some(SessionValue::UserId(2)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = InMemorySessionStore::new();
        store
            .put("k", SessionValue::Flag(true), TEN_SECONDS)
            .await
            .unwrap();

        assert_ok!(store.delete("k").await);
        assert_ok!(store.delete("k").await);
        assert_ok!(store.delete("never-existed").await);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let store = InMemorySessionStore::new();
        store
            .put("k", SessionValue::UserId(9), TEN_SECONDS)
            .await
            .unwrap();

        assert_eq!(store.take("k").await.unwrap(), Some(SessionValue::UserId(9)));
        assert_eq!(store.take("k").await.unwrap(), None);
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_expired_removes_and_reports_absent() {
        let store = InMemorySessionStore::new();
        store
            .put("k", SessionValue::UserId(9), TEN_SECONDS)
            .await
            .unwrap();
        tokio::time::advance(TEN_SECONDS + EPSILON).await;

        assert_eq!(store.take("k").await.unwrap(), None);
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_take_has_exactly_one_winner() {
        let store = Arc::new(InMemorySessionStore::new());
        store
            .put("code.app.race", SessionValue::UserId(5), Duration::from_secs(60))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.take("code.app.race").await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_counts_only_expired() {
        let store = InMemorySessionStore::new();
        store
            .put("short", SessionValue::UserId(1), Duration::from_secs(1))
            .await
            .unwrap();
        store
            .put("long", SessionValue::UserId(2), Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.entry_count().await, 1);
        assert_eq!(store.get("long").await.unwrap(), Some(SessionValue::UserId(2)));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = InMemorySessionStore::new();
        let keys: HashSet<&str> = ["code.a.1", "code.b.1", "logout.1"].into_iter().collect();
        for key in &keys {
            store
                .put(key, SessionValue::Flag(true), TEN_SECONDS)
                .await
                .unwrap();
        }

        store.delete("code.a.1").await.unwrap();
        assert_eq!(store.get("code.b.1").await.unwrap(), Some(SessionValue::Flag(true)));
        assert_eq!(store.get("logout.1").await.unwrap(), Some(SessionValue::Flag(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_does_not_overflow() {
        let store = InMemorySessionStore::new();
        store
            .put("k", SessionValue::UserId(1), Duration::MAX)
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(SessionValue::UserId(1)));
    }
}
