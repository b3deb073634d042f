//! TTL-based cache for ephemeral state.
//!
//! Holds mass-edit sessions between HTTP calls. Entries expire after the
//! configured TTL so an abandoned species selection cannot pin memory in a
//! long-running server process.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// A thread-safe cache with time-to-live expiration.
///
/// Expired entries are invisible to readers but are not removed until
/// `cleanup_expired()` is called.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, TtlEntry<V>>>,
    ttl: Duration,
}

struct TtlEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> TtlEntry<V> {
    fn is_live(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Create a new cache with the specified TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Insert a value, replacing any existing entry and resetting the TTL.
    pub async fn insert(&self, key: K, value: V) {
        let entry = TtlEntry {
            value,
            inserted_at: Instant::now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// Insert a value with an explicit timestamp (tests only).
    #[cfg(test)]
    pub async fn insert_at(&self, key: K, value: V, inserted_at: Instant) {
        let entry = TtlEntry { value, inserted_at };
        self.entries.write().await.insert(key, entry);
    }

    /// Get a copy of a value if it exists and hasn't expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let guard = self.entries.read().await;
        guard
            .get(key)
            .filter(|entry| entry.is_live(self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// Restart the TTL of an entry that is still present, expired or not.
    pub async fn touch(&self, key: &K) {
        if let Some(entry) = self.entries.write().await.get_mut(key) {
            entry.inserted_at = Instant::now();
        }
    }

    /// Remove and return a value if it exists (regardless of expiration).
    pub async fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().await.remove(key).map(|e| e.value)
    }

    /// Remove expired entries except those `pinned` says to keep, and
    /// return the count of removed entries.
    pub async fn cleanup_expired(&self, pinned: impl Fn(&V) -> bool) -> usize {
        let mut guard = self.entries.write().await;
        let before_count = guard.len();
        guard.retain(|_, entry| entry.is_live(self.ttl) || pinned(&entry.value));
        before_count - guard.len()
    }
}
