//! Simulation statistics
//!
//! Counters are increment-only from the translation layer's point of view;
//! the driver reads them through [`Stats::snapshot`].

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live statistics counters
#[derive(Debug, Default)]
pub struct Stats {
    /// Host reads resolved by the FTL (plus merge copy reads)
    pub ftl_reads: AtomicU64,
    /// Host writes placed by the FTL (plus merge copy writes)
    pub ftl_writes: AtomicU64,
    /// Host trims handled by the FTL
    pub ftl_trims: AtomicU64,
    /// Mapping lookups performed in controller memory
    pub memory_reads: AtomicU64,
    /// Simulated mapping-table reads charged
    pub map_reads: AtomicU64,
    /// Simulated mapping-table writes charged
    pub map_writes: AtomicU64,
    /// Log blocks promoted in place to data blocks
    pub log_merge_switch: AtomicU64,
    /// Log blocks consolidated by a full copy merge
    pub log_merge_full: AtomicU64,
    /// Log blocks merged early because the log map was at capacity
    pub log_evictions: AtomicU64,
    /// Page reads issued to flash
    pub flash_reads: AtomicU64,
    /// Page programs issued to flash
    pub flash_writes: AtomicU64,
    /// Block erases performed
    pub flash_erases: AtomicU64,
    /// Blocks erased eagerly because trim emptied them
    pub eager_reclaims: AtomicU64,
    /// Blocks whose role changed to data
    pub blocks_promoted: AtomicU64,
}

/// Bump a counter by one
#[inline]
pub fn incr(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Stats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            ftl_reads: load(&self.ftl_reads),
            ftl_writes: load(&self.ftl_writes),
            ftl_trims: load(&self.ftl_trims),
            memory_reads: load(&self.memory_reads),
            map_reads: load(&self.map_reads),
            map_writes: load(&self.map_writes),
            log_merge_switch: load(&self.log_merge_switch),
            log_merge_full: load(&self.log_merge_full),
            log_evictions: load(&self.log_evictions),
            flash_reads: load(&self.flash_reads),
            flash_writes: load(&self.flash_writes),
            flash_erases: load(&self.flash_erases),
            eager_reclaims: load(&self.eager_reclaims),
            blocks_promoted: load(&self.blocks_promoted),
        }
    }
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub ftl_reads: u64,
    pub ftl_writes: u64,
    pub ftl_trims: u64,
    pub memory_reads: u64,
    pub map_reads: u64,
    pub map_writes: u64,
    pub log_merge_switch: u64,
    pub log_merge_full: u64,
    pub log_evictions: u64,
    pub flash_reads: u64,
    pub flash_writes: u64,
    pub flash_erases: u64,
    pub eager_reclaims: u64,
    pub blocks_promoted: u64,
}

impl StatsSnapshot {
    /// Flash page programs per host write (0.0 when nothing was written)
    #[must_use]
    pub fn write_amplification(&self, host_writes: u64) -> f64 {
        if host_writes == 0 {
            return 0.0;
        }
        self.flash_writes as f64 / host_writes as f64
    }

    /// Total merges of either flavour
    #[must_use]
    pub const fn merges(&self) -> u64 {
        self.log_merge_switch + self.log_merge_full
    }
}
