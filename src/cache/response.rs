//! Bounded response cache with TTL expiry and insertion-order eviction.
//!
//! [`ResponseCache`] stores model responses keyed on a string derived from
//! the request shape (see [`CacheKey`](super::CacheKey)).
//!
//! # Eviction
//!
//! Eviction is FIFO: when the cache is full, the entry *inserted* earliest
//! is dropped, regardless of how recently it was read. Re-inserting an
//! existing key moves it to the back of the queue and refreshes its
//! timestamp. Reads never reorder entries.
//!
//! # Expiry
//!
//! Expiry is lazy. An entry older than the TTL is removed when a `get`
//! touches it; nothing sweeps the cache in the background. Expired entries
//! therefore still occupy capacity until read or evicted.
//!
//! Timestamps come from [`tokio::time::Instant`] so tests can pause and
//! advance time instead of sleeping.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;

use crate::types::{AiResponse, ArchitectureReview};

/// Configuration for the response cache.
///
/// ```rust
/// # use assay::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(600));
/// assert_eq!(config.max_entries, 500);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 100.
    pub max_entries: usize,
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Cached value for the orchestrator, one variant per response shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedResponse {
    /// Raw text from the simple-suggestion path.
    Text(String),
    Response(AiResponse),
    Review(ArchitectureReview),
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// In-memory cache with a hard entry bound, lazy TTL expiry and FIFO
/// eviction.
///
/// Operations take `&self`; the map sits behind a mutex that is never held
/// across an `.await`, so each call is atomic with respect to other tasks.
pub struct ResponseCache<V = CachedResponse> {
    config: CacheConfig,
    entries: Mutex<IndexMap<String, Entry<V>>>,
}

impl<V: Clone> ResponseCache<V> {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Look up a live entry.
    ///
    /// Returns `None` on a miss. An entry older than the TTL is removed and
    /// reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.lock();
        let expired = {
            let entry = entries.get(key)?;
            Instant::now().duration_since(entry.inserted_at) > self.config.ttl
        };
        if expired {
            entries.shift_remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert (or refresh) an entry, evicting the oldest-inserted entry if
    /// the cache is full.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        if self.config.max_entries == 0 {
            return;
        }
        let key = key.into();
        let mut entries = self.lock();

        // Delete-then-insert so a refreshed key moves to the back.
        entries.shift_remove(&key);
        while entries.len() >= self.config.max_entries {
            entries.shift_remove_index(0);
        }
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry immediately.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, including expired ones not yet touched.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` is stored, without checking or applying expiry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
