/// Result cache for extracted schema contexts
///
/// Memoizes [`DynamicSchemaResult`]s by normalized query text so repeated
/// questions skip term extraction and all graph-store round trips.
///
/// # Expiry
///
/// Entries expire `ttl` after insertion. Expiry is lazy: an expired entry is
/// dropped by the lookup that finds it, there is no background sweeper. When
/// `max_entries` is reached the oldest entry is evicted.
///
/// Time is read from `tokio::time::Instant` so tests can drive expiry with a
/// paused clock.
///
/// # Configuration
///
/// Set through [`crate::config::ExtractorConfig`] (`cache_enabled`,
/// `cache_ttl_secs`, `cache_max_entries`).
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::term_extractor::normalize_text;
use super::types::DynamicSchemaResult;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

/// Key for cache lookup
///
/// Two queries share an entry when they are equal after trimming,
/// lower-casing, dropping punctuation and collapsing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResultCacheKey {
    pub normalized_query: String,
}

impl ResultCacheKey {
    pub fn new(query_text: &str) -> Self {
        ResultCacheKey {
            normalized_query: normalize_text(query_text),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: DynamicSchemaResult,
    inserted_at: Instant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultCacheConfig {
    pub enabled: bool,
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        ResultCacheConfig {
            enabled: true,
            ttl: DEFAULT_CACHE_TTL,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

pub struct ResultCache {
    entries: Mutex<HashMap<ResultCacheKey, CacheEntry>>,
    config: ResultCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    pub fn new(config: ResultCacheConfig) -> Self {
        ResultCache {
            entries: Mutex::new(HashMap::new()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ResultCacheConfig::default())
    }

    pub fn config(&self) -> &ResultCacheConfig {
        &self.config
    }

    /// Cached result for `key`, if present and younger than the TTL
    pub fn get(&self, key: &ResultCacheKey) -> Option<DynamicSchemaResult> {
        if !self.config.enabled {
            return None;
        }

        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.config.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.result.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            log::debug!("Cache entry for '{}' expired", key.normalized_query);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `result`, replacing any entry for the same key
    pub fn put(&self, key: ResultCacheKey, result: DynamicSchemaResult) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }

        let mut entries = self.lock();
        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            self.evict_oldest(&mut entries);
        }

        entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }

    fn evict_oldest(&self, entries: &mut HashMap<ResultCacheKey, CacheEntry>) {
        if let Some(key) = entries
            .iter()
            .min_by_key(|(_, entry)| entry.inserted_at)
            .map(|(key, _)| key.clone())
        {
            entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drop every entry. Metrics are kept.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len(),
            max_entries: self.config.max_entries,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResultCacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
