//! Kill engine.
//!
//! Walks the candidates from the lightest resource consumer to the heaviest,
//! re-classifying memory before every step, and terminates until pressure is
//! gone. Protected processes are deferred and only killed by the escalation
//! path when nothing else was killed and pressure is still critical.

use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::lmk::candidate::{
    is_protected, sort_desc_by_key, Candidate, CandidateSet, FOREGROUND_SCORE,
};
use crate::lmk::group::mark_group_duplicates;
use crate::lmk::host::{MemoryCounters, ProcessTable};
use crate::lmk::pressure::{classify, PressureState};
use crate::stats::LmkStats;
use crate::tunables::Tunables;

/// Default pause after each kill, letting the freed memory show up in the counters.
pub const KILL_SETTLE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KillReport {
    /// Terminations in the main walk.
    pub killed: usize,
    /// Terminations of deferred protected processes.
    pub escalated: usize,
    /// Candidates ignored by the group deduplicator.
    pub group_ignored: usize,
    /// The walk stopped because pressure went away, or escalation stopped
    /// because pressure fell below critical.
    pub relieved: bool,
}

/// Everything the kill walk needs besides the candidates.
pub struct KillParams<'a> {
    pub tunables: &'a Tunables,
    pub settle: Duration,
    pub stats: &'a LmkStats,
}

/// Collapses groups unless grouping is off or pressure is already critical.
fn filter_by_group<M: MemoryCounters + ?Sized>(
    counters: &M,
    set: &mut CandidateSet,
    tunables: &Tunables,
) -> usize {
    if !tunables.kill_heaviest_gid || classify(counters, tunables) == PressureState::Critical {
        return 0;
    }
    mark_group_duplicates(set.as_mut_slice())
}

fn kill<T: ProcessTable + ?Sized>(
    table: &T,
    candidate: &Candidate,
    params: &KillParams<'_>,
    escalated: bool,
) -> bool {
    debug!(
        comm = %candidate.name,
        pid = candidate.pid,
        adj = candidate.adjustment_score,
        acc_usage = candidate.accumulated_usage,
        escalated,
        "killed"
    );

    if let Err(e) = table.terminate(&candidate.process) {
        warn!("Failed to kill {} ({}): {}", candidate.name, candidate.pid, e);
        params.stats.record_kill_failure();
        return false;
    }
    params.stats.record_kill(escalated);

    if !params.settle.is_zero() {
        thread::sleep(params.settle);
    }
    true
}

/// Runs the kill walk and, if needed, the escalation.
pub fn run<T, M>(
    table: &T,
    counters: &M,
    set: &mut CandidateSet,
    params: &KillParams<'_>,
) -> KillReport
where
    T: ProcessTable + ?Sized,
    M: MemoryCounters + ?Sized,
{
    let tunables = params.tunables;
    let mut report = KillReport {
        group_ignored: filter_by_group(counters, set, tunables),
        ..Default::default()
    };
    params.stats.record_groups_collapsed(report.group_ignored as u64);

    let candidates = set.as_mut_slice();
    sort_desc_by_key(candidates, |c| c.accumulated_usage);

    let mut services: Vec<usize> = Vec::new();
    let mut foreground: Vec<usize> = Vec::new();

    // Lowest accumulated usage first.
    for idx in (0..candidates.len()).rev() {
        let state = classify(counters, tunables);
        if state == PressureState::None {
            report.relieved = true;
            return report;
        }

        let candidate = &candidates[idx];
        if candidate.ignore {
            continue;
        }

        if candidate.adjustment_score < tunables.min_adj && state != PressureState::Critical {
            continue;
        }

        if is_protected(candidate.adjustment_score) {
            if candidate.adjustment_score == FOREGROUND_SCORE {
                foreground.push(idx);
            } else {
                services.push(idx);
            }
            continue;
        }

        if kill(table, candidate, params, false) {
            report.killed += 1;
        }
    }

    if report.killed > 0 || classify(counters, tunables) != PressureState::Critical {
        return report;
    }

    // Nothing relieved critical pressure: services first, then foreground.
    while let Some(idx) = services.pop().or_else(|| foreground.pop()) {
        if classify(counters, tunables) < PressureState::Critical {
            report.relieved = true;
            break;
        }
        if kill(table, &candidates[idx], params, true) {
            report.escalated += 1;
        }
    }

    report
}
