//! Low-memory decision engine.
//!
//! This module provides:
//! - `host`: Traits for the process table, memory counters and pressure source
//! - `candidate`: Candidate records, the bounded candidate set and selection
//! - `collector`: Process snapshot collection
//! - `pressure`: Memory state classification
//! - `group`: Heaviest-per-group deduplication
//! - `reclaim`: Proactive anonymous reclaim with adaptive cooldown
//! - `kill`: Ordered termination with escalation
//! - `tracker`: Reclaim effectiveness tracking
//! - `trigger`: Debounced pass scheduling
//! - `engine`: The decision pass driver

pub mod candidate;
pub mod collector;
pub mod engine;
pub mod group;
pub mod host;
pub mod kill;
pub mod pressure;
pub mod reclaim;
pub mod tracker;
pub mod trigger;

// Re-export commonly used types
pub use candidate::{Candidate, CandidateSet, MAX_CANDIDATES, PROTECTED_SCORES};
pub use engine::{run_pass, LmkContext, PassOutcome};
pub use host::{
    MemoryCounters, MemorySample, PressureSource, ProcessAttributes, ProcessEntry, ProcessRef,
    ProcessTable, ReclaimOutcome, TaskFlags,
};
pub use kill::KillReport;
pub use pressure::{classify, PressureState};
pub use reclaim::ReclaimReport;
pub use tracker::ReclaimTracker;
pub use trigger::{PassGuard, PassQueue, PassTrigger};
