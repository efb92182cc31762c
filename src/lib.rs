//! prlmk - Proactive Low-Memory Killer Library
//!
//! This library provides the decision engine that reacts to memory pressure by
//! either reclaiming anonymous memory from the heaviest processes (mild pressure)
//! or terminating processes in a policy-defined order (severe pressure).
//!
//! # Features
//!
//! - **Pressure Classification**: Reduce live memory counters to `None` / `Normal` / `Critical`
//! - **Bounded Candidate Snapshot**: At most 128 value-typed candidates per decision pass
//! - **Adaptive Reclaim**: Efficiency-driven cooldown that backs off wasted reclaim work
//! - **Group-Aware Killing**: Keep only the heaviest process per shared group
//! - **Escalation**: Last-resort termination of protected processes under critical pressure
//! - **Linux Host**: `/proc` process table, meminfo counters, PSI pressure, pidfd signals
//!
//! # Usage
//!
//! ```rust,no_run
//! use prlmk::lmk::{run_pass, LmkContext};
//! use prlmk::process::ProcTable;
//! use prlmk::system::ProcMemInfo;
//! use prlmk::Tunables;
//!
//! let ctx = LmkContext::new(Tunables::default());
//! let table = ProcTable::new("/proc");
//! let counters = ProcMemInfo::new("/proc/meminfo");
//!
//! let outcome = run_pass(&table, &counters, &ctx);
//! println!("pass outcome: {:?}", outcome);
//! ```

pub mod error;
pub mod lmk;
pub mod process;
pub mod stats;
pub mod system;
pub mod tunables;

// Re-export main types for convenience
pub use error::LmkError;
pub use lmk::{LmkContext, PassOutcome, PressureState};
pub use stats::LmkStats;
pub use tunables::{SharedTunables, Tunables};
