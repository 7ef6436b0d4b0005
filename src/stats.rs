//! Loader counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared between the entry point, worker tasks and the
/// delivery loop
#[derive(Debug, Default)]
pub struct LoadCounters {
    requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    paused_skips: AtomicU64,
    scheduled: AtomicU64,
    decoded: AtomicU64,
    failed: AtomicU64,
    applied: AtomicU64,
    discarded: AtomicU64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl LoadCounters {
    counter! {
        record_request => requests,
        record_cache_hit => cache_hits,
        record_cache_miss => cache_misses,
        record_paused_skip => paused_skips,
        record_scheduled => scheduled,
        record_decoded => decoded,
        record_failed => failed,
        record_applied => applied,
        record_discarded => discarded,
    }

    pub fn snapshot(&self) -> LoaderStats {
        LoaderStats {
            requests: self.requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            paused_skips: self.paused_skips.load(Ordering::Relaxed),
            scheduled: self.scheduled.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LoadCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    /// `load_into` calls that carried a locator
    pub requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Misses that scheduled nothing because the loader was paused
    pub paused_skips: u64,
    pub scheduled: u64,
    pub decoded: u64,
    pub failed: u64,
    /// Background results shown on their target
    pub applied: u64,
    /// Background results dropped because the target moved on or was dropped
    pub discarded: u64,
}

impl LoaderStats {
    /// Scheduled tasks that have not finished yet
    pub fn outstanding(&self) -> u64 {
        self.scheduled.saturating_sub(self.decoded + self.failed)
    }
}
