//! Decision pass driver.
//!
//! One pass: collect candidates, classify, then either reclaim (no pressure)
//! or kill (normal or critical pressure). All state that outlives a pass lives
//! in [`LmkContext`], which the caller owns and injects.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use crate::lmk::collector::collect;
use crate::lmk::host::{MemoryCounters, ProcessTable};
use crate::lmk::kill::{self, KillParams, KillReport, KILL_SETTLE};
use crate::lmk::pressure::{classify, PressureState};
use crate::lmk::reclaim::{self, ReclaimReport};
use crate::lmk::tracker::ReclaimTracker;
use crate::stats::LmkStats;
use crate::tunables::{SharedTunables, Tunables};

/// State shared across passes.
pub struct LmkContext {
    pub tunables: Arc<SharedTunables>,
    pub tracker: ReclaimTracker,
    pub stats: Arc<LmkStats>,
    /// Pause after each kill.
    pub kill_settle: Duration,
}

impl LmkContext {
    pub fn new(tunables: Tunables) -> Self {
        Self::with_shared(Arc::new(SharedTunables::new(tunables)), Arc::new(LmkStats::new()))
    }

    pub fn with_shared(tunables: Arc<SharedTunables>, stats: Arc<LmkStats>) -> Self {
        Self {
            tunables,
            tracker: ReclaimTracker::new(),
            stats,
            kill_settle: KILL_SETTLE,
        }
    }

    pub fn kill_settle(mut self, settle: Duration) -> Self {
        self.kill_settle = settle;
        self
    }
}

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// No candidates, or none with anonymous memory.
    NoCandidates,
    Reclaim(ReclaimReport),
    Kill {
        state: PressureState,
        report: KillReport,
    },
}

/// Runs one complete decision pass.
#[instrument(skip_all)]
pub fn run_pass<T, M>(table: &T, counters: &M, ctx: &LmkContext) -> PassOutcome
where
    T: ProcessTable + ?Sized,
    M: MemoryCounters + ?Sized,
{
    let start = Instant::now();
    // One consistent view of the knobs for the whole pass.
    let tunables = ctx.tunables.get();

    let mut set = collect(table, &tunables);
    if set.is_degenerate() {
        debug!(candidates = set.len(), "no reclaimable candidates, pass ends");
        ctx.stats.record_empty_pass();
        return PassOutcome::NoCandidates;
    }

    let candidates = set.len();
    let state = classify(counters, &tunables);

    let outcome = if state == PressureState::None {
        PassOutcome::Reclaim(reclaim::run(table, &mut set, &ctx.tracker, &ctx.stats))
    } else {
        ctx.stats.record_kill_pass();
        let params = KillParams {
            tunables: &tunables,
            settle: ctx.kill_settle,
            stats: &ctx.stats,
        };
        PassOutcome::Kill {
            state,
            report: kill::run(table, counters, &mut set, &params),
        }
    };

    // Dropping the set here releases every pinned process handle.
    drop(set);

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    ctx.stats.record_pass(candidates, elapsed_ms);

    match &outcome {
        PassOutcome::Kill { state, report } => info!(
            "Pass done: lowmem={} candidates={} killed={} escalated={} group_ignored={} in {:.1}ms",
            state, candidates, report.killed, report.escalated, report.group_ignored, elapsed_ms
        ),
        PassOutcome::Reclaim(report) if !report.skipped => debug!(
            candidates,
            calls = report.calls,
            scanned = report.scanned,
            reclaimed = report.reclaimed,
            "reclaim pass done"
        ),
        _ => {}
    }

    outcome
}
