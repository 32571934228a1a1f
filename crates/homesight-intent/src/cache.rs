//! Classification cache.
//!
//! TTL-bounded map keyed by the normalised message plus a hash of the
//! conversation context. Expired entries are evicted lazily on read and
//! when the map is full.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use crate::types::{CacheStats, IntentClassification};

/// Maximum number of cached entries.
const MAX_CACHE_SIZE: usize = 256;

/// Cache key: normalised message + context hash.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub(crate) struct CacheKey {
    message: String,
    context_hash: u64,
}

impl CacheKey {
    pub(crate) fn new(normalized_message: &str, context: Option<&[String]>) -> Self {
        let context_hash = match context {
            Some(context) if !context.is_empty() => {
                let mut hasher = DefaultHasher::new();
                for line in context {
                    line.hash(&mut hasher);
                }
                hasher.finish()
            }
            _ => 0,
        };
        Self {
            message: normalized_message.to_string(),
            context_hash,
        }
    }
}

struct CacheEntry {
    classification: IntentClassification,
    cached_at: Instant,
}

/// TTL cache over classifications.
pub(crate) struct ClassificationCache {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    max_size: usize,
    hits: u64,
    misses: u64,
}

impl ClassificationCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_size: MAX_CACHE_SIZE,
            hits: 0,
            misses: 0,
        }
    }

    pub(crate) fn get(&mut self, key: &CacheKey) -> Option<IntentClassification> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.cached_at.elapsed() >= self.ttl,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }

        match self.entries.get(key) {
            Some(entry) => {
                self.hits += 1;
                Some(entry.classification.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, key: CacheKey, classification: IntentClassification) {
        if self.entries.len() >= self.max_size {
            self.evict_stale();
            // Still full after eviction: drop the write rather than grow
            // without bound.
            if self.entries.len() >= self.max_size {
                return;
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                classification,
                cached_at: Instant::now(),
            },
        );
    }

    fn evict_stale(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.cached_at.elapsed() < ttl);
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.entries.len(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
