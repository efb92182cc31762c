//! Reclaim effectiveness tracking.
//!
//! Two consecutive low-efficiency reclaim batches put reclaim into a cooldown
//! that skips the next [`SWAP_EFF_WIN`] eligible passes.

use std::sync::atomic::{AtomicU32, Ordering};

/// Window size and cooldown length.
pub const SWAP_EFF_WIN: u32 = 2;

/// Efficiency (percent of scanned pages actually reclaimed) below which a batch counts as wasted.
pub const SWAP_OPT_EFF: u64 = 50;

#[derive(Debug, Default)]
pub struct ReclaimTracker {
    window: AtomicU32,
    cooldown: AtomicU32,
}

impl ReclaimTracker {
    pub fn new() -> Self {
        Default::default()
    }

    /// Consumes one cooldown slot. Returns `true` when reclaim must be skipped.
    pub fn should_skip_reclaim(&self) -> bool {
        self.cooldown
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1))
            .is_ok()
    }

    /// Feeds the efficiency of one batch. Returns `true` when it started a cooldown.
    ///
    /// Efficient batches leave the window untouched; only starting a cooldown
    /// resets it.
    pub fn record_efficiency(&self, efficiency: u64) -> bool {
        if efficiency >= SWAP_OPT_EFF {
            return false;
        }

        let reached = self.window.fetch_add(1, Ordering::AcqRel) + 1 >= SWAP_EFF_WIN;
        if reached {
            self.window.store(0, Ordering::Release);
            self.cooldown.store(SWAP_EFF_WIN, Ordering::Release);
        }
        reached
    }

    pub fn window(&self) -> u32 {
        self.window.load(Ordering::Acquire)
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown.load(Ordering::Acquire)
    }
}
