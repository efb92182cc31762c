//! Host services consumed by the decision engine.
//!
//! The engine never touches `/proc`, signals or the kernel's reclaim interface
//! directly. Everything it needs from the running system goes through the
//! traits below, so a pass can be driven against a live Linux host
//! ([`crate::process::ProcTable`], [`crate::system::ProcMemInfo`]) or against
//! scripted fakes in tests.

use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::sync::Arc;

use crate::error::LmkError;

/// Pinned handle to a target process.
///
/// When the host could open a pidfd the handle refers to exactly the process
/// that was snapshotted, even if its pid is recycled later. Clones share the
/// descriptor; it is closed when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct ProcessRef {
    pid: i32,
    pidfd: Option<Arc<OwnedFd>>,
}

impl ProcessRef {
    /// Handle addressed by pid only.
    pub fn new(pid: i32) -> Self {
        Self { pid, pidfd: None }
    }

    pub fn with_pidfd(pid: i32, pidfd: OwnedFd) -> Self {
        Self {
            pid,
            pidfd: Some(Arc::new(pidfd)),
        }
    }

    pub fn pid(&self) -> i32 {
        self.pid
    }

    pub fn pidfd(&self) -> Option<BorrowedFd<'_>> {
        self.pidfd.as_ref().map(|fd| fd.as_fd())
    }

    /// Number of live clones of this handle, counting `self`.
    pub fn pin_count(&self) -> usize {
        self.pidfd.as_ref().map(Arc::strong_count).unwrap_or(1)
    }
}

/// Lifecycle flags of a process as seen in the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFlags {
    /// Group-wide exit or core dump in progress.
    pub group_exiting: bool,
    /// The main thread is exiting.
    pub exiting: bool,
    /// The process has a single thread.
    pub single_threaded: bool,
    /// Kernel-internal helper.
    pub kernel_thread: bool,
    /// A thread already has a kill pending from an earlier termination.
    pub kill_pending: bool,
}

/// One live process in a table snapshot.
#[derive(Debug, Clone)]
pub struct ProcessEntry {
    pub process: ProcessRef,
    pub name: String,
    pub flags: TaskFlags,
}

/// Attributes read from the memory-owning thread of a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessAttributes {
    pub adjustment_score: i16,
    /// Resident anonymous memory in pages.
    pub anon_pages: u64,
    /// Last supplementary group id, if the process has any.
    pub last_group: Option<u32>,
    /// Monotonic lifetime resource usage.
    pub accumulated_usage: u64,
}

/// Result of a single best-effort reclaim call, in pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclaimOutcome {
    pub scanned: u64,
    pub reclaimed: u64,
}

/// Live process table plus the per-process actions the engine may take.
pub trait ProcessTable {
    /// Consistent-enough traversal of live processes. Processes may appear or
    /// vanish while it runs. Entries need not be pinned yet.
    fn snapshot(&self) -> Vec<ProcessEntry>;

    /// Pins an accepted entry for the rest of the pass. Called at most once per
    /// candidate, so pinned handles stay bounded by the candidate capacity.
    fn pin(&self, entry: &ProcessEntry) -> ProcessRef {
        entry.process.clone()
    }

    /// Reads attributes from the memory-owning thread. `None` when the process
    /// has no memory descriptor or is gone.
    fn attributes(&self, entry: &ProcessEntry) -> Option<ProcessAttributes>;

    /// Shrinks the anonymous memory of `process` by roughly `target_pages`.
    fn reclaim_anon(&self, process: &ProcessRef, target_pages: u64) -> ReclaimOutcome;

    /// Forced, uncatchable termination. A process that is already gone is not an error.
    fn terminate(&self, process: &ProcessRef) -> Result<(), LmkError>;
}

/// One reading of the counters the classifier needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySample {
    pub active_file_pages: u64,
    pub free_swap_kb: u64,
}

/// Live system memory counters.
pub trait MemoryCounters {
    fn active_file_pages(&self) -> u64;

    fn free_swap_kb(&self) -> u64;

    /// Both counters at once; hosts that read them from one source override this.
    fn sample(&self) -> MemorySample {
        MemorySample {
            active_file_pages: self.active_file_pages(),
            free_swap_kb: self.free_swap_kb(),
        }
    }
}

/// Source of the pressure magnitude fed to the trigger.
pub trait PressureSource {
    /// Current pressure on a 0-100 scale.
    fn read_pressure(&self) -> Result<u64, LmkError>;
}
