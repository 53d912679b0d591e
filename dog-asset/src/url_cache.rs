use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::StorageKey;

/// A signed URL remembered for a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: StorageKey,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Valid only while `expires_at` is strictly in the future
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Session-scoped map of storage key to signed URL.
///
/// Shared by every consumer of a resolver. Writes are last-write-wins per key;
/// a reader racing a writer sees either value, both of which are usable.
#[derive(Debug, Default)]
pub struct SignedUrlCache {
    entries: RwLock<HashMap<StorageKey, CacheEntry>>,
}

impl SignedUrlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unexpired entry for `key`
    pub fn get(&self, key: &StorageKey) -> Option<CacheEntry> {
        self.get_at(key, Utc::now())
    }

    /// Unexpired entry for `key` as of `now`
    pub fn get_at(&self, key: &StorageKey, now: DateTime<Utc>) -> Option<CacheEntry> {
        self.entries
            .read()
            .get(key)
            .filter(|entry| entry.is_valid_at(now))
            .cloned()
    }

    /// Remember `url` for `ttl` from now
    pub fn insert(&self, key: StorageKey, url: String, ttl: Duration) -> CacheEntry {
        self.insert_at(key, url, ttl, Utc::now())
    }

    /// Remember `url` for `ttl` starting at `now`
    pub fn insert_at(&self, key: StorageKey, url: String, ttl: Duration, now: DateTime<Utc>) -> CacheEntry {
        // Lifetimes past chrono's range saturate at the latest representable instant.
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = CacheEntry {
            key: key.clone(),
            url,
            expires_at,
        };
        self.entries.write().insert(key, entry.clone());
        entry
    }

    /// Forget a key
    pub fn invalidate(&self, key: &StorageKey) -> Option<CacheEntry> {
        self.entries.write().remove(key)
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid_at(now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
