//! TTL cache for recently-fetched Puppet service data.
//!
//! Each entry carries its own absolute expiration instant. Expired entries
//! are evicted lazily on read and never returned; a bulk sweep bounds
//! growth from keys that are written once and never re-read.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// A cached value with its expiration instant.
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Key-value store where every entry expires a fixed duration after it was
/// written, independent of access patterns.
///
/// Unbounded apart from TTL-based and manual eviction; no LRU, no capacity
/// limit. Values are returned by clone, never by reference into the map.
/// Concurrent misses for the same key are not collapsed into one upstream
/// call; callers needing single-flight must layer it above the cache.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value for a key, or `None` on a miss.
    ///
    /// An entry past its expiration is removed and reported as a miss,
    /// even if no sweep has run yet.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired on the read path; re-check under the write lock since
        // another caller may have re-inserted a fresh value in between.
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Stores a value with the given time-to-live, unconditionally
    /// overwriting any prior entry for the key.
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key, entry);
    }

    /// Returns true if a non-expired entry exists for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries
            .read()
            .get(key)
            .map_or(false, |entry| !entry.is_expired())
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes every entry whose expiration has passed, independent of
    /// access. Intended for a periodic timer or on-demand sweeps.
    pub fn clear_expired(&self) {
        self.entries.write().retain(|_, entry| !entry.is_expired());
    }

    /// Number of stored entries, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
