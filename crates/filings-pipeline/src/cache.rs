//! Caching layer for upstream documents to reduce API calls
//!
//! Entries live in a size-bounded [`SizedCache`] (least recently used entries are
//! evicted first) and carry their own expiry instant taken from the injected
//! [`Clock`], so TTL behaviour is testable without sleeping.

use cached::{Cached, SizedCache};
use chrono::{DateTime, TimeDelta, Utc};
use filings_utils::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cache key for upstream requests
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// API endpoint or operation type
    pub endpoint: String,
    /// Entity identifier, empty for entity-independent documents
    pub identifier: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(endpoint: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            identifier: identifier.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    expires_at: DateTime<Utc>,
}

/// TTL cache for raw upstream JSON documents
///
/// Mutation goes through `&mut self`: the cache is owned by a single client and
/// never shared between callers.
pub struct ResponseCache {
    store: SizedCache<CacheKey, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` entries for `ttl` each
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: SizedCache::with_size(capacity.max(1)),
            ttl,
            clock,
        }
    }

    /// Get a live value from the cache; expired entries are dropped on access
    pub fn get(&mut self, key: &CacheKey) -> Option<serde_json::Value> {
        let now = self.clock.now();
        let expired = match self.store.cache_get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            tracing::debug!("Cache entry expired for key: {:?}", key);
            let _ = self.store.cache_remove(key);
        }
        None
    }

    /// Insert a value with the cache-wide TTL
    pub fn insert(&mut self, key: CacheKey, value: serde_json::Value) {
        let ttl = self.ttl;
        self.insert_with_ttl(key, value, ttl);
    }

    /// Insert a value that expires `ttl` after now
    pub fn insert_with_ttl(&mut self, key: CacheKey, value: serde_json::Value, ttl: Duration) {
        let delta = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let _ = self.store.cache_set(key, CacheEntry { value, expires_at });
    }

    /// Invalidate a specific cache entry
    pub fn invalidate(&mut self, key: &CacheKey) {
        let _ = self.store.cache_remove(key);
    }

    /// Clear all cached entries
    pub fn clear(&mut self) {
        self.store.cache_clear();
    }

    /// Number of stored entries, including expired ones not yet accessed
    pub fn len(&self) -> usize {
        self.store.cache_size()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
