//! Size-weighted LRU memory cache for decoded images
//!
//! Entries are weighted by their decoded byte size in KiB. Capacity is fixed
//! when the cache is built, normally from the runtime's memory limit, and an
//! insertion evicts least-recently-used entries until the total weight fits.

use lru::LruCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use sysinfo::System;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::decode::DecodedImage;
use crate::locator::Locator;
use crate::utils::human_format::format_kib;

/// Used when the platform reports no memory figure at all
const FALLBACK_MAX_MEMORY_BYTES: u64 = 512 * 1024 * 1024;

/// Point-in-time cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub weight_kib: u64,
    pub capacity_kib: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheState {
    entries: LruCache<Locator, Arc<DecodedImage>>,
    weight_kib: u64,
}

/// Thread-safe weighted LRU cache keyed by locator
pub struct MemoryCache {
    state: Mutex<CacheState>,
    capacity_kib: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity_kib` KiB of pixel data
    pub fn with_capacity_kib(capacity_kib: u64) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                weight_kib: 0,
            }),
            capacity_kib: capacity_kib.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cache sized from configuration: the explicit capacity if
    /// set, otherwise `max_memory / heap_fraction`
    pub fn from_config(config: &CacheConfig) -> Self {
        let capacity_kib = config
            .capacity_kib
            .unwrap_or_else(|| capacity_for_memory(detect_max_memory_bytes(), config.heap_fraction));
        info!(
            "Image cache capacity: {} (1/{} of runtime memory{})",
            format_kib(capacity_kib),
            config.heap_fraction,
            if config.capacity_kib.is_some() {
                ", overridden"
            } else {
                ""
            }
        );
        Self::with_capacity_kib(capacity_kib)
    }

    /// Look up an entry and promote it to most-recently-used
    pub fn get(&self, locator: &str) -> Option<Arc<DecodedImage>> {
        let found = self.lock().entries.get(locator).cloned();
        match found {
            Some(image) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(image)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Check for an entry without touching recency or statistics
    pub fn contains(&self, locator: &str) -> bool {
        self.lock().entries.contains(locator)
    }

    /// Insert or replace an entry, then evict LRU entries until the total
    /// weight fits. An entry heavier than the whole cache is rejected up
    /// front without evicting anything else.
    pub fn put(&self, locator: Locator, image: Arc<DecodedImage>) {
        let weight = weight_kib(&image);
        let mut state = self.lock();

        if weight > self.capacity_kib {
            // Drop any older value under this key rather than keep it stale
            if let Some(previous) = state.entries.pop(locator.as_str()) {
                state.weight_kib -= weight_kib(&previous);
            }
            debug!(
                "Not caching {}: {} KiB exceeds capacity {} KiB",
                locator, weight, self.capacity_kib
            );
            return;
        }

        if let Some(previous) = state.entries.put(locator, image) {
            state.weight_kib -= weight_kib(&previous);
        }
        state.weight_kib += weight;

        while state.weight_kib > self.capacity_kib {
            match state.entries.pop_lru() {
                Some((evicted, image)) => {
                    state.weight_kib -= weight_kib(&image);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!("Evicted {} from image cache", evicted);
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current total weight in KiB
    pub fn weight_kib(&self) -> u64 {
        self.lock().weight_kib
    }

    pub fn capacity_kib(&self) -> u64 {
        self.capacity_kib
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            weight_kib: state.weight_kib,
            capacity_kib: self.capacity_kib,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every mutation leaves the state consistent, so a poisoned lock is still usable
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Entry weight: decoded byte size in KiB, rounded up
pub fn weight_kib(image: &DecodedImage) -> u64 {
    (image.byte_size() as u64).div_ceil(1024)
}

/// Cache capacity in KiB for a memory limit in bytes
pub fn capacity_for_memory(max_memory_bytes: u64, heap_fraction: u64) -> u64 {
    (max_memory_bytes / 1024 / heap_fraction.max(1)).max(1)
}

/// Runtime memory limit: the cgroup limit when one applies, otherwise total
/// system memory
pub fn detect_max_memory_bytes() -> u64 {
    let mut system = System::new();
    system.refresh_memory();

    let cgroup_limit = system
        .cgroup_limits()
        .map(|limits| limits.total_memory)
        .filter(|bytes| *bytes > 0);
    let total = cgroup_limit.unwrap_or_else(|| system.total_memory());

    if total == 0 {
        FALLBACK_MAX_MEMORY_BYTES
    } else {
        total
    }
}
