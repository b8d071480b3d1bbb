//! Bounded LRU cache of resolved answers.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use serde::Serialize;

use crate::query::service::Lookup;

/// Cache counters and occupancy, as reported by `/cache/stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
    /// Fraction of lookups answered from the cache, 0.0 to 1.0
    pub hit_rate: f64,
}

impl CacheStats {
    /// Stats reported when caching is off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            hits: 0,
            misses: 0,
            size: 0,
            capacity: 0,
            hit_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedAnswer {
    generation: u64,
    lookup: Lookup,
}

/// Maps normalized addresses to answers, including not-found.
///
/// Each entry remembers the generation of the handle that produced it; a
/// lookup under a different generation is a miss.
#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<LruCache<String, CachedAnswer>>,
    capacity: NonZeroUsize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached answer for `key` if it was produced by `generation`,
    /// marking it most recently used. Counts a hit or a miss.
    pub fn lookup(&self, key: &str, generation: u64) -> Option<Lookup> {
        let found = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .get(key)
                .filter(|cached| cached.generation == generation)
                .map(|cached| cached.lookup.clone())
        };
        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Stores an answer, evicting the least recently used entry when full.
    pub fn insert(&self, key: String, generation: u64, lookup: Lookup) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(key, CachedAnswer { generation, lookup });
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            enabled: true,
            hits,
            misses,
            size: self.len(),
            capacity: self.capacity.get(),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}
