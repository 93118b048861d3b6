//! Shared query cache for the Citrine wallet SDK.
//!
//! A TTL + LRU cache with pattern-based bulk invalidation, used by the
//! transaction history service (and any other subsystem that wants to avoid
//! recomputation). Values are cloned out on hit; entries expire after a
//! configured TTL regardless of access pattern, and the least-recently-used
//! entry is evicted once the entry cap is reached.
//!
//! There is no automatic memory reclamation: callers under memory pressure
//! invoke [`QueryCache::shed`] explicitly, and the cache degrades gracefully
//! to pure TTL/LRU behavior when nobody does.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid key pattern: {0}")]
    InvalidPattern(String),
}

/// Key pattern for bulk invalidation.
#[derive(Debug, Clone)]
pub enum KeyPattern {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Regex(String),
}

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time after which an entry is stale regardless of access pattern.
    pub ttl: Duration,
    /// Entry-count cap; the LRU entry is evicted when full.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl: Duration::from_secs(30),
            max_entries: 256,
        }
    }
}

/// Hit/miss counters, readable at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// String-keyed TTL + LRU cache.
pub struct QueryCache<V> {
    entries: LruCache<String, Entry<V>>,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        QueryCache {
            entries: LruCache::new(cap),
            ttl: config.ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a key, promoting it in LRU order. Expired entries are
    /// dropped on the spot and count as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.stored_at.elapsed() >= self.ttl,
            None => {
                self.misses += 1;
                return None;
            }
        };
        if expired {
            self.entries.pop(key);
            self.misses += 1;
            return None;
        }
        self.hits += 1;
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Store a value, evicting the LRU entry if the cap is reached.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.entries.push(
            key.into(),
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.pop(key).map(|e| e.value)
    }

    /// Look up a key, invoking `fetch` and storing its result on a miss.
    ///
    /// Concurrent misses for the same key are not deduplicated here;
    /// callers that need request collapsing layer it on top.
    pub fn get_or_fetch<E>(
        &mut self,
        key: &str,
        fetch: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = fetch()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every entry whose key matches the pattern. Returns the number
    /// of entries removed. An invalid regex fails before any key is scanned.
    pub fn invalidate(&mut self, pattern: &KeyPattern) -> Result<usize, CacheError> {
        if let KeyPattern::Exact(key) = pattern {
            return Ok(usize::from(self.entries.pop(key).is_some()));
        }
        let compiled = match pattern {
            KeyPattern::Regex(src) => Some(
                regex::Regex::new(src)
                    .map_err(|e| CacheError::InvalidPattern(e.to_string()))?,
            ),
            _ => None,
        };
        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, _)| match pattern {
                KeyPattern::Exact(_) => unreachable!(),
                KeyPattern::Prefix(p) => key.starts_with(p.as_str()),
                KeyPattern::Suffix(s) => key.ends_with(s.as_str()),
                KeyPattern::Contains(c) => key.contains(c.as_str()),
                KeyPattern::Regex(_) => compiled.as_ref().is_some_and(|re| re.is_match(key)),
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            self.entries.pop(key);
        }
        Ok(matching.len())
    }

    /// Remove entries past their TTL. Safe to run concurrently with normal
    /// use: it only removes entries already independently expired.
    pub fn purge_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.stored_at.elapsed() >= self.ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        if !expired.is_empty() {
            log::debug!("purged {} expired cache entries", expired.len());
        }
        expired.len()
    }

    /// Memory-pressure hook: evict `fraction` of the cache from the LRU
    /// tail (at least one entry when non-empty and fraction > 0).
    pub fn shed(&mut self, fraction: f64) -> usize {
        if self.entries.is_empty() || fraction <= 0.0 {
            return 0;
        }
        let count = ((self.entries.len() as f64 * fraction.min(1.0)).ceil() as usize)
            .min(self.entries.len());
        for _ in 0..count {
            self.entries.pop_lru();
        }
        log::debug!("shed {count} cache entries under memory pressure");
        count
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            len: self.entries.len(),
        }
    }
}
