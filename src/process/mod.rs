//! Linux process access for the decision engine.
//!
//! This module provides:
//! - `scanner`: Process discovery and the `/proc`-backed process table
//! - `stat`: Parsing of /proc/<pid>/stat (flags, threads, CPU ticks)
//! - `status`: Parsing of /proc/<pid>/status and oom_score_adj
//! - `memory`: Anonymous mappings and `process_madvise` page-out
//! - `signal`: pidfd pinning and forced termination

pub mod memory;
pub mod scanner;
pub mod signal;
pub mod stat;
pub mod status;

// Re-export commonly used types
pub use scanner::{collect_proc_entries, ProcEntry, ProcTable};
pub use stat::{parse_stat, ProcStat};
pub use status::{parse_status, ProcStatus};
