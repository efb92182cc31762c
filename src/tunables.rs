//! Runtime-tunable policy knobs.
//!
//! Tunables are read at the start of every decision pass and on every trigger
//! call, so storing a new value takes effect on the next pass without a restart.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::error::LmkError;

/// Policy thresholds for the trigger, classifier and kill engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tunables {
    /// Pressure magnitude (0-100) at or above which a decision pass is scheduled (default: 90)
    #[serde(default = "default_pressure_max")]
    pub pressure_max: u64,

    /// Adjustment score below which processes are only killed under critical
    /// pressure (default: 300)
    #[serde(default = "default_min_adj")]
    pub min_adj: i16,

    /// Active file-backed pages below which file pressure is reported (default: 20000)
    ///
    /// Too low causes lags before anything is killed, too high makes killing
    /// more aggressive.
    #[serde(default = "default_free_file_limit")]
    pub free_file_limit: u64,

    /// Free swap in MiB below which swap pressure is reported (default: 20)
    #[serde(default = "default_free_swap_limit")]
    pub free_swap_limit: u64,

    /// Keep only the heaviest process of each supplementary group as kill candidate (default: true)
    #[serde(default = "default_kill_heaviest_gid")]
    pub kill_heaviest_gid: bool,
}

fn default_pressure_max() -> u64 {
    90
}
fn default_min_adj() -> i16 {
    300
}
fn default_free_file_limit() -> u64 {
    20000
}
fn default_free_swap_limit() -> u64 {
    20
}
fn default_kill_heaviest_gid() -> bool {
    true
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            pressure_max: default_pressure_max(),
            min_adj: default_min_adj(),
            free_file_limit: default_free_file_limit(),
            free_swap_limit: default_free_swap_limit(),
            kill_heaviest_gid: default_kill_heaviest_gid(),
        }
    }
}

impl Tunables {
    /// Free swap limit converted to KiB, the unit swap counters are read in.
    pub fn free_swap_limit_kb(&self) -> u64 {
        self.free_swap_limit.saturating_mul(1024)
    }

    pub fn validate(&self) -> Result<(), LmkError> {
        if self.pressure_max > 100 {
            return Err(LmkError::Config(format!(
                "pressure_max must be within 0..=100, got {}",
                self.pressure_max
            )));
        }
        if !(-1000..=1000).contains(&self.min_adj) {
            return Err(LmkError::Config(format!(
                "min_adj must be within -1000..=1000, got {}",
                self.min_adj
            )));
        }
        Ok(())
    }
}

/// Hot-reloadable tunables shared between the trigger path and the worker.
#[derive(Debug, Default)]
pub struct SharedTunables {
    inner: RwLock<Tunables>,
}

impl SharedTunables {
    pub fn new(tunables: Tunables) -> Self {
        Self {
            inner: RwLock::new(tunables),
        }
    }

    /// Returns a copy of the current values.
    pub fn get(&self) -> Tunables {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Replaces all values, returning the previous ones.
    pub fn set(&self, tunables: Tunables) -> Tunables {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, tunables)
    }
}
