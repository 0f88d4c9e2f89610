//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the core storage engine for CoolKV.
//! It provides a thread-safe, concurrent map from string keys to string
//! values with optional TTL (Time-To-Live).
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, we use multiple shards to reduce contention.
//! 2. **Lazy Expiry**: Keys are checked for expiry on every read, plus background cleanup.
//! 3. **RwLock per shard**: Multiple concurrent readers with exclusive writers.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are distributed across shards using a hash function. Every
//! operation touches exactly one shard lock, and no lock is ever held
//! across an `.await`.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Number of shards for the storage engine.
/// More shards = less lock contention, but more memory overhead.
const NUM_SHARDS: usize = 64;

/// Longest accepted TTL: 100 years, in seconds.
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Validation errors raised by the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The key was empty after trimming
    #[error("key must not be empty")]
    EmptyKey,

    /// The value was empty after trimming
    #[error("value must not be empty")]
    EmptyValue,

    /// The TTL was not a whole number of seconds in `0..=MAX_TTL_SECS`
    #[error("ttl must be a whole number of seconds between 0 and {}", MAX_TTL_SECS)]
    InvalidTtl,
}

/// Parses a TTL given in whole seconds.
///
/// `0` means "never expires" and maps to `None`.
pub fn parse_ttl_seconds(raw: &str) -> Result<Option<Duration>, StoreError> {
    let secs: u64 = raw.trim().parse().map_err(|_| StoreError::InvalidTtl)?;
    if secs > MAX_TTL_SECS {
        return Err(StoreError::InvalidTtl);
    }
    Ok(ttl_from_secs(secs))
}

/// Converts whole seconds into an optional TTL (`0` = no expiry).
pub fn ttl_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The actual value stored
    pub value: String,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry, expiring after `ttl` if one is given.
    ///
    /// A deadline past what `Instant` can represent never expires.
    pub fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    /// Returns the remaining time to live, or None if the entry never expires.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<String, Entry>>,
}

/// The main storage engine for CoolKV.
///
/// This struct is designed to be wrapped in an `Arc` and shared by the TCP
/// server, the HTTP gateway, and the expiry sweeper. All operations are
/// thread-safe and atomic with respect to a single key.
///
/// # Example
///
/// ```
/// use coolkv::storage::StorageEngine;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set("name", "cool", None).unwrap();
/// assert_eq!(engine.get("name"), Some("cool".to_string()));
///
/// engine.set("session", "abc123", Some(Duration::from_secs(60))).unwrap();
/// assert!(engine.exists("session"));
/// ```
pub struct StorageEngine {
    /// Sharded storage for reduced lock contention
    shards: Vec<Shard>,

    /// Number of physically stored entries (may include expired, unreaped ones)
    key_count: AtomicU64,

    get_count: AtomicU64,
    set_count: AtomicU64,
    del_count: AtomicU64,

    /// Number of expired keys removed, lazily or by the sweeper
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates a new, empty storage engine.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &str) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    fn record_expired(&self, count: u64) {
        self.key_count.fetch_sub(count, Ordering::Relaxed);
        self.expired_count.fetch_add(count, Ordering::Relaxed);
    }

    /// Sets a key-value pair, optionally expiring after `ttl`.
    ///
    /// Key and value are trimmed and must not be empty. A `ttl` of `None` or
    /// zero means the entry never expires. An existing entry is overwritten,
    /// value and expiry both.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if a live key was updated.
    pub fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        if value.is_empty() {
            return Err(StoreError::EmptyValue);
        }
        let ttl = ttl.filter(|ttl| !ttl.is_zero());
        if ttl.is_some_and(|ttl| ttl > Duration::from_secs(MAX_TTL_SECS)) {
            return Err(StoreError::InvalidTtl);
        }

        self.set_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);
        let mut data = shard.data.write();

        let previous = data.insert(key.to_string(), Entry::new(value.to_string(), ttl));
        let is_new = match previous {
            None => {
                self.key_count.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(old) if old.is_expired() => {
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(_) => false,
        };

        Ok(is_new)
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired, whether or not
    /// the sweeper has already run. Expired entries found here are removed.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Gets the full entry for a key (including metadata).
    pub fn get_entry(&self, key: &str) -> Option<Entry> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let key = key.trim();
        let shard = self.get_shard(key);

        // Fast path under the read lock
        {
            let data = shard.data.read();
            match data.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Key exists but is expired - need the write lock to remove it
        let mut data = shard.data.write();
        match data.get(key) {
            Some(entry) if entry.is_expired() => {
                data.remove(key);
                self.record_expired(1);
                None
            }
            // Race: another writer refreshed the key in between
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    /// Deletes a key from the store.
    ///
    /// # Returns
    ///
    /// Returns `true` if a live key was deleted, `false` if it didn't exist
    /// or had already expired.
    pub fn delete(&self, key: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let key = key.trim();
        let shard = self.get_shard(key);
        let mut data = shard.data.write();

        match data.remove(key) {
            Some(entry) if entry.is_expired() => {
                self.record_expired(1);
                false
            }
            Some(_) => {
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Checks if a key exists and has not expired.
    pub fn exists(&self, key: &str) -> bool {
        let key = key.trim();
        let data = self.get_shard(key).data.read();
        data.get(key).is_some_and(|entry| !entry.is_expired())
    }

    /// Gets the remaining TTL of a live key.
    ///
    /// # Returns
    ///
    /// - `Some(Some(remaining))` if the key exists and has an expiry
    /// - `Some(None)` if the key exists but never expires
    /// - `None` if the key doesn't exist
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let key = key.trim();
        let data = self.get_shard(key).data.read();
        data.get(key)
            .filter(|entry| !entry.is_expired())
            .map(Entry::remaining_ttl)
    }

    /// Returns every live key, sorted.
    ///
    /// Expired entries are filtered out here regardless of sweeper cadence.
    pub fn list_keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys = Vec::new();

        for shard in &self.shards {
            let data = shard.data.read();
            keys.extend(
                data.iter()
                    .filter(|(_, entry)| !entry.is_expired_at(now))
                    .map(|(key, _)| key.clone()),
            );
        }

        keys.sort_unstable();
        keys
    }

    /// Counts the live keys without collecting them.
    pub fn live_len(&self) -> u64 {
        let now = Instant::now();
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .data
                    .read()
                    .values()
                    .filter(|entry| !entry.is_expired_at(now))
                    .count() as u64
            })
            .sum()
    }

    /// Returns the number of physically stored entries.
    ///
    /// This may include expired entries the sweeper hasn't removed yet.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// Returns true if nothing is physically stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Removes expired keys from all shards.
    ///
    /// Shards are processed one at a time. Candidates are collected under the
    /// read lock, then removed under a short write lock, re-checking expiry
    /// so a concurrent `set` that refreshed the key is kept.
    ///
    /// # Returns
    ///
    /// Returns the number of keys that were removed.
    pub fn cleanup_expired(&self) -> u64 {
        let mut cleaned = 0u64;

        for shard in &self.shards {
            let now = Instant::now();
            let candidates: Vec<String> = {
                let data = shard.data.read();
                data.iter()
                    .filter(|(_, entry)| entry.is_expired_at(now))
                    .map(|(key, _)| key.clone())
                    .collect()
            };

            if candidates.is_empty() {
                continue;
            }

            let mut data = shard.data.write();
            for key in candidates {
                if data.get(&key).is_some_and(|entry| entry.is_expired_at(now)) {
                    data.remove(&key);
                    cleaned += 1;
                }
            }
        }

        if cleaned > 0 {
            self.record_expired(cleaned);
        }

        cleaned
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of entries physically stored
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total DELETE operations
    pub del_ops: u64,
    /// Total expired keys cleaned up
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_and_get() {
        let engine = StorageEngine::new();

        engine.set("key", "value", None).unwrap();
        assert_eq!(engine.get("key"), Some("value".to_string()));
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get("nonexistent"), None);
    }

    #[test]
    fn test_set_reports_new_keys() {
        let engine = StorageEngine::new();

        assert_eq!(engine.set("key", "v1", None), Ok(true));
        assert_eq!(engine.set("key", "v2", None), Ok(false));
        assert_eq!(engine.get("key"), Some("v2".to_string()));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_set_trims_and_validates() {
        let engine = StorageEngine::new();

        assert_eq!(engine.set("   ", "value", None), Err(StoreError::EmptyKey));
        assert_eq!(engine.set("key", " \t", None), Err(StoreError::EmptyValue));

        engine.set("  padded ", " value  ", None).unwrap();
        assert_eq!(engine.get("padded"), Some("value".to_string()));
        assert!(!engine.is_empty());
    }

    #[test]
    fn test_delete() {
        let engine = StorageEngine::new();

        engine.set("key", "value", None).unwrap();
        assert!(engine.delete("key"));
        assert_eq!(engine.get("key"), None);
        assert!(!engine.delete("key")); // Already deleted
        assert!(engine.is_empty());
    }

    #[test]
    fn test_exists() {
        let engine = StorageEngine::new();

        assert!(!engine.exists("key"));
        engine.set("key", "value", None).unwrap();
        assert!(engine.exists("key"));
    }

    #[test]
    fn test_expiry() {
        let engine = StorageEngine::new();

        engine
            .set("key", "value", Some(Duration::from_millis(50)))
            .unwrap();

        // Key should exist immediately
        assert_eq!(engine.get("key"), Some("value".to_string()));

        std::thread::sleep(Duration::from_millis(100));

        // Gone on read, and physically removed by the read
        assert_eq!(engine.get("key"), None);
        assert_eq!(engine.len(), 0);
        assert_eq!(engine.stats().expired, 1);
    }

    #[test]
    fn test_zero_ttl_never_expires() {
        let engine = StorageEngine::new();

        engine.set("zero", "value", Some(Duration::ZERO)).unwrap();
        engine.set("none", "value", None).unwrap();

        assert_eq!(engine.ttl("zero"), Some(None));
        assert_eq!(engine.ttl("none"), Some(None));
        assert_eq!(engine.get_entry("zero").unwrap().expires_at, None);
    }

    #[test]
    fn test_overwrite_replaces_expiry() {
        let engine = StorageEngine::new();

        engine
            .set("key", "short", Some(Duration::from_millis(30)))
            .unwrap();
        engine.set("key", "forever", None).unwrap();

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(engine.get("key"), Some("forever".to_string()));
    }

    #[test]
    fn test_set_over_expired_counts_as_new() {
        let engine = StorageEngine::new();

        engine
            .set("key", "old", Some(Duration::from_millis(10)))
            .unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(engine.set("key", "new", None), Ok(true));
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.get("key"), Some("new".to_string()));
    }

    #[test]
    fn test_delete_expired_returns_false() {
        let engine = StorageEngine::new();

        engine
            .set("key", "value", Some(Duration::from_millis(10)))
            .unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert!(!engine.delete("key"));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_ttl_remaining() {
        let engine = StorageEngine::new();

        engine
            .set("key", "value", Some(Duration::from_secs(10)))
            .unwrap();

        let remaining = engine.ttl("key").unwrap().unwrap();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining > Duration::from_secs(9));
        assert_eq!(engine.ttl("missing"), None);
    }

    #[test]
    fn test_list_keys_filters_expired() {
        let engine = StorageEngine::new();

        engine.set("b", "1", None).unwrap();
        engine.set("a", "2", None).unwrap();
        engine
            .set("temp", "3", Some(Duration::from_millis(20)))
            .unwrap();

        assert_eq!(engine.list_keys(), vec!["a", "b", "temp"]);

        std::thread::sleep(Duration::from_millis(50));

        // No sweeper has run, the entry is still physically present
        assert_eq!(engine.len(), 3);
        assert_eq!(engine.list_keys(), vec!["a", "b"]);
        assert_eq!(engine.live_len(), 2);
    }

    #[test]
    fn test_cleanup_expired() {
        let engine = StorageEngine::new();

        for i in 0..10 {
            engine
                .set(&format!("key{}", i), "value", Some(Duration::from_millis(10)))
                .unwrap();
        }
        engine.set("persistent", "value", None).unwrap();

        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(engine.cleanup_expired(), 10);
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.stats().expired, 10);
        assert_eq!(engine.cleanup_expired(), 0);
    }

    #[test]
    fn test_parse_ttl_seconds() {
        assert_eq!(parse_ttl_seconds("10"), Ok(Some(Duration::from_secs(10))));
        assert_eq!(parse_ttl_seconds("0"), Ok(None));
        assert_eq!(parse_ttl_seconds("-5"), Err(StoreError::InvalidTtl));
        assert_eq!(parse_ttl_seconds("soon"), Err(StoreError::InvalidTtl));
        assert_eq!(parse_ttl_seconds("1.5"), Err(StoreError::InvalidTtl));
        assert_eq!(
            parse_ttl_seconds(&MAX_TTL_SECS.to_string()),
            Ok(Some(Duration::from_secs(MAX_TTL_SECS)))
        );
        assert_eq!(
            parse_ttl_seconds("18446744073709551615"),
            Err(StoreError::InvalidTtl)
        );
    }

    #[test]
    fn test_set_rejects_ttl_past_cap() {
        let engine = StorageEngine::new();

        let too_long = Duration::from_secs(u64::MAX);
        assert_eq!(
            engine.set("k", "v", Some(too_long)),
            Err(StoreError::InvalidTtl)
        );
        assert!(engine.is_empty());

        let at_cap = Duration::from_secs(MAX_TTL_SECS);
        assert_eq!(engine.set("k", "v", Some(at_cap)), Ok(true));
        assert!(engine.ttl("k").unwrap().unwrap() > Duration::from_secs(MAX_TTL_SECS - 60));
    }

    #[test]
    fn test_entry_with_unrepresentable_deadline_never_expires() {
        let entry = Entry::new("v".to_string(), Some(Duration::MAX));
        assert_eq!(entry.expires_at, None);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_stats() {
        let engine = StorageEngine::new();

        engine.set("a", "1", None).unwrap();
        engine.set("b", "2", None).unwrap();
        engine.get("a");
        engine.get("missing");
        engine.delete("b");

        let stats = engine.stats();
        assert_eq!(stats.keys, 1);
        assert_eq!(stats.set_ops, 2);
        assert_eq!(stats.get_ops, 2);
        assert_eq!(stats.del_ops, 1);
    }

    #[test]
    fn test_concurrent_writes_same_key() {
        let engine = Arc::new(StorageEngine::new());

        let handles: Vec<_> = ["v1", "v2"]
            .into_iter()
            .map(|value| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        engine.set("shared", value, None).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let value = engine.get("shared").unwrap();
        assert!(value == "v1" || value == "v2");
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_concurrent_distinct_keys() {
        let engine = Arc::new(StorageEngine::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        engine
                            .set(&format!("t{}-k{}", t, i), "value", None)
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 800);
        assert_eq!(engine.list_keys().len(), 800);
    }
}
