//! Memory state classification.
//!
//! Reduces the live active-file and free-swap counters into a three-level
//! pressure state. The result is never cached: callers re-classify whenever
//! they need a fresh answer, so this stays allocation-free and O(1).

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::lmk::host::{MemoryCounters, MemorySample};
use crate::tunables::Tunables;

/// Low-memory level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureState {
    /// No low-memory scenario detected.
    None,
    /// Swap below `free_swap_limit` (or, without a swap limit, file pages
    /// below `free_file_limit`).
    Normal,
    /// `Normal`, plus file pages below `free_file_limit` and swap exhausted.
    Critical,
}

impl fmt::Display for PressureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PressureState::None => "none",
            PressureState::Normal => "normal",
            PressureState::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Classifies a counter sample against the configured thresholds.
pub fn classify_sample(sample: MemorySample, tunables: &Tunables) -> PressureState {
    let swap_limit_kb = tunables.free_swap_limit_kb();

    let swap_low = sample.free_swap_kb < swap_limit_kb;
    let file_low = sample.active_file_pages < tunables.free_file_limit;

    let normal = if swap_limit_kb > 0 { swap_low } else { file_low };
    // Without a swap limit the file condition is already part of `normal`.
    let critical = normal && file_low && sample.free_swap_kb == 0;

    if critical {
        PressureState::Critical
    } else if normal {
        PressureState::Normal
    } else {
        PressureState::None
    }
}

/// Reads the counters and classifies them.
pub fn classify<M: MemoryCounters + ?Sized>(counters: &M, tunables: &Tunables) -> PressureState {
    let sample = counters.sample();
    let state = classify_sample(sample, tunables);

    debug!(
        file_pgs = sample.active_file_pages,
        swap_kb = sample.free_swap_kb,
        lowmem = %state,
        "classified memory state"
    );

    state
}
