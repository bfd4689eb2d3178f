//! All gauges use `Relaxed` ordering. Individual values are eventually
//! consistent and cross-gauge snapshots may transiently disagree (e.g. a
//! pool's blocks may be counted before the pool itself). Acceptable for
//! diagnostic display; do NOT use these values for allocation decisions.

use std::sync::atomic::{AtomicIsize, Ordering};

/// Diagnostic-only gauge counter.
///
/// Under contention, subtract-before-add races are tolerated and the raw
/// value may transiently dip below zero. Readers go through `get()`, which
/// clamps negatives to zero.
pub(crate) struct Counter(AtomicIsize);

impl Counter {
    pub(crate) const fn new() -> Self {
        Self(AtomicIsize::new(0))
    }

    #[inline]
    fn delta(val: usize) -> isize {
        // Diagnostic counters only: clamp absurd deltas instead of panicking.
        std::cmp::min(val, isize::MAX as usize).cast_signed()
    }

    #[inline]
    pub(crate) fn add(&self, val: usize) {
        self.0.fetch_add(Self::delta(val), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn sub(&self, val: usize) {
        self.0.fetch_sub(Self::delta(val), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed).max(0).cast_unsigned()
    }
}

// Pools currently alive in the process
pub(crate) static POOLS_LIVE: Counter = Counter::new();
// Blocks across every live pool's chain
pub(crate) static BLOCKS_LIVE: Counter = Counter::new();
// Bytes held by those blocks
pub(crate) static BLOCK_BYTES: Counter = Counter::new();
// Live (non-vacant) large allocations across every pool.
// Bytes are not tracked: freeing a large allocation carries no size.
pub(crate) static LARGE_LIVE: Counter = Counter::new();

/// Point-in-time snapshot of the process-wide pool gauges.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub pools_live: usize,
    pub blocks_live: usize,
    pub block_bytes: usize,
    pub large_live: usize,
}

/// Read every gauge once. See the module doc for consistency caveats.
#[must_use]
pub fn snapshot() -> PoolStats {
    PoolStats {
        pools_live: POOLS_LIVE.get(),
        blocks_live: BLOCKS_LIVE.get(),
        block_bytes: BLOCK_BYTES.get(),
        large_live: LARGE_LIVE.get(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_clamps_negative() {
        let c = Counter::new();
        c.sub(10);
        assert_eq!(c.get(), 0);
        c.add(25);
        // The raw value went -10 then +25.
        assert_eq!(c.get(), 15);
    }

    #[test]
    fn test_counter_add_sub() {
        let c = Counter::new();
        c.add(100);
        c.sub(40);
        assert_eq!(c.get(), 60);
    }
}
