//! Content-addressed TTL cache
//!
//! Keys are truncated SHA-256 digests of the compact JSON serialization of
//! whatever inputs produced a value. Reads check expiry only; writes evict the
//! oldest entry once the cache is at capacity. Expired entries linger until
//! [`TtlCache::purge_expired`] runs (see [`crate::background::CacheSweeper`]).

use crate::error::Result;
use ahash::AHashMap;
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Hex characters kept from the digest
pub const KEY_LEN: usize = 16;

/// Short content hash of any serializable input
pub fn content_key<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let bytes = serde_json::to_vec(value)?;
    Ok(digest_key(&bytes))
}

/// Short content hash of raw bytes
pub fn digest_key(bytes: &[u8]) -> String {
    let mut hex = format!("{:x}", Sha256::digest(bytes));
    hex.truncate(KEY_LEN);
    hex
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Counters for one cache tier
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub name: String,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Bounded map whose entries expire after a fixed time-to-live
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    capacity: usize,
    entries: RwLock<AHashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, ttl: Duration, capacity: usize) -> Self {
        Self {
            name,
            ttl,
            capacity: capacity.max(1),
            entries: RwLock::new(AHashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live entry
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a value. Last write wins; at capacity the oldest entry is evicted.
    pub fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.write();
        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Return the cached value for `key`, computing and storing it on a miss
    pub fn get_or_try_insert_with<E, F>(&self, key: &str, compute: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key.to_string(), value.clone());
        Ok(value)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name.to_string(),
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_key_is_stable_and_short() {
        let a = content_key(&json!({"a": 1, "b": [1, 2]})).unwrap();
        let b = content_key(&json!({"a": 1, "b": [1, 2]})).unwrap();
        let c = content_key(&json!({"a": 2})).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), KEY_LEN);
    }

    #[test]
    fn test_get_and_insert() {
        let cache: TtlCache<u32> = TtlCache::new("t", Duration::from_secs(60), 8);
        assert_eq!(cache.get("k"), None);
        cache.insert("k".to_string(), 7);
        assert_eq!(cache.get("k"), Some(7));
        cache.insert("k".to_string(), 9);
        assert_eq!(cache.get("k"), Some(9));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_expired_entries_are_misses_until_purged() {
        let cache: TtlCache<u32> = TtlCache::new("t", Duration::ZERO, 8);
        cache.insert("k".to_string(), 1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache: TtlCache<u32> = TtlCache::new("t", Duration::from_secs(60), 2);
        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("b".to_string(), 2);
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("c".to_string(), 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
    }

    #[test]
    fn test_get_or_try_insert_with_computes_once() {
        let cache: TtlCache<String> = TtlCache::new("t", Duration::from_secs(60), 8);
        let mut calls = 0;
        for _ in 0..3 {
            let v: std::result::Result<String, ()> = cache.get_or_try_insert_with("k", || {
                calls += 1;
                Ok("v".to_string())
            });
            assert_eq!(v.unwrap(), "v");
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_failed_compute_is_not_cached() {
        let cache: TtlCache<u32> = TtlCache::new("t", Duration::from_secs(60), 8);
        let r: std::result::Result<u32, &str> = cache.get_or_try_insert_with("k", || Err("boom"));
        assert!(r.is_err());
        assert!(cache.is_empty());
    }
}
