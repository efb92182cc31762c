//! Proactive anonymous-memory reclaim.
//!
//! Runs only while no low-memory state is reported. Shrinks the heaviest
//! candidates of a bounded batch in proportion to their share of the pass-wide
//! anonymous total, then feeds the batch efficiency into the tracker.

use tracing::debug;

use crate::lmk::candidate::{is_protected, sort_desc_by_key, CandidateSet};
use crate::lmk::host::ProcessTable;
use crate::lmk::tracker::ReclaimTracker;
use crate::stats::LmkStats;

/// Candidates considered per reclaim batch.
pub const MAX_RECLAIM_BATCH: usize = 32;

/// Pages distributed across a batch, before the proportional split.
pub const PER_BATCH_UNIT: u64 = 32 * 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclaimReport {
    /// Reclaim was skipped because of an active cooldown.
    pub skipped: bool,
    pub calls: u64,
    pub scanned: u64,
    pub reclaimed: u64,
    /// `reclaimed * 100 / scanned`, absent when nothing was scanned.
    pub efficiency: Option<u64>,
    pub cooldown_started: bool,
}

/// Pages to ask from one candidate.
///
/// The divisor is the total across all candidates, not just the batch, so
/// reclaim gets gentler as the number of candidates grows.
pub fn reclaim_target(anon_size: u64, total_anon: u64) -> u64 {
    if total_anon == 0 {
        return 0;
    }
    anon_size.saturating_mul(PER_BATCH_UNIT) / total_anon
}

/// Runs one reclaim batch, honouring the cooldown gate.
pub fn run<T: ProcessTable + ?Sized>(
    table: &T,
    set: &mut CandidateSet,
    tracker: &ReclaimTracker,
    stats: &LmkStats,
) -> ReclaimReport {
    if tracker.should_skip_reclaim() {
        debug!(cooldown_left = tracker.cooldown(), "reclaim in cooldown, skipping pass");
        stats.record_reclaim_skip();
        return ReclaimReport {
            skipped: true,
            ..Default::default()
        };
    }

    let total_anon = set.total_anon();
    let limit = set.len().min(MAX_RECLAIM_BATCH);
    let batch = &mut set.as_mut_slice()[..limit];

    // Heaviest first.
    sort_desc_by_key(batch, |c| c.anon_size);

    let mut report = ReclaimReport::default();
    for candidate in batch.iter() {
        if candidate.anon_size == 0 || is_protected(candidate.adjustment_score) {
            continue;
        }

        let target = reclaim_target(candidate.anon_size, total_anon);
        let outcome = table.reclaim_anon(&candidate.process, target);

        debug!(
            comm = %candidate.name,
            pid = candidate.pid,
            target,
            scanned = outcome.scanned,
            reclaimed = outcome.reclaimed,
            "reclaimed anon pages"
        );

        report.calls += 1;
        report.scanned += outcome.scanned;
        report.reclaimed += outcome.reclaimed;
    }

    stats.record_reclaim(report.calls, report.scanned, report.reclaimed);

    if report.scanned > 0 {
        let efficiency = report.reclaimed * 100 / report.scanned;
        report.efficiency = Some(efficiency);
        report.cooldown_started = tracker.record_efficiency(efficiency);
        stats.record_efficiency(efficiency, report.cooldown_started);

        if report.cooldown_started {
            debug!(efficiency, "reclaim inefficient twice, starting cooldown");
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LmkError;
    use crate::lmk::candidate::tests::candidate;
    use crate::lmk::host::{ProcessAttributes, ProcessEntry, ProcessRef, ReclaimOutcome};
    use crate::lmk::tracker::SWAP_OPT_EFF;
    use std::cell::RefCell;

    /// Reclaims a fixed percentage of every request and records the calls.
    struct Reclaimer {
        percent: u64,
        calls: RefCell<Vec<(i32, u64)>>,
    }

    impl Reclaimer {
        fn new(percent: u64) -> Self {
            Self {
                percent,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ProcessTable for Reclaimer {
        fn snapshot(&self) -> Vec<ProcessEntry> {
            Vec::new()
        }

        fn attributes(&self, _entry: &ProcessEntry) -> Option<ProcessAttributes> {
            None
        }

        fn reclaim_anon(&self, process: &ProcessRef, target: u64) -> ReclaimOutcome {
            self.calls.borrow_mut().push((process.pid(), target));
            ReclaimOutcome {
                scanned: target,
                reclaimed: target * self.percent / 100,
            }
        }

        fn terminate(&self, _process: &ProcessRef) -> Result<(), LmkError> {
            Ok(())
        }
    }

    fn set_of(items: Vec<crate::lmk::candidate::Candidate>) -> CandidateSet {
        let mut set = CandidateSet::new();
        for c in items {
            set.push(c);
        }
        set
    }

    #[test]
    fn test_target_uses_pass_wide_total() {
        assert_eq!(reclaim_target(512, 1024), 512);
        assert_eq!(reclaim_target(100, 100), PER_BATCH_UNIT);
        assert_eq!(reclaim_target(1, 0), 0);
    }

    #[test]
    fn test_heaviest_first_and_protected_skipped() {
        let table = Reclaimer::new(100);
        let tracker = ReclaimTracker::new();
        let stats = LmkStats::new();
        let mut set = set_of(vec![
            candidate(1, 900, 100, 0, 0),
            candidate(2, 0, 900, 0, 0),
            candidate(3, 900, 300, 0, 0),
            candidate(4, 900, 0, 0, 0),
            candidate(5, 200, 50, 0, 0),
            candidate(6, 700, 674, 0, 0),
        ]);
        assert_eq!(set.total_anon(), 2024);

        let report = run(&table, &mut set, &tracker, &stats);
        assert!(!report.skipped);

        let calls = table.calls.borrow();
        let pids: Vec<i32> = calls.iter().map(|(pid, _)| *pid).collect();
        assert_eq!(pids, vec![6, 3, 1]);
        assert_eq!(calls[0].1, 674 * 1024 / 2024);
        assert_eq!(report.calls, 3);
        assert_eq!(report.efficiency, Some(100));
    }

    #[test]
    fn test_batch_is_bounded() {
        let table = Reclaimer::new(100);
        let tracker = ReclaimTracker::new();
        let stats = LmkStats::new();
        let mut set = set_of((0..100).map(|pid| candidate(pid, 900, 10, 0, 0)).collect());

        let report = run(&table, &mut set, &tracker, &stats);
        assert_eq!(report.calls, MAX_RECLAIM_BATCH as u64);
    }

    #[test]
    fn test_cooldown_after_two_inefficient_batches() {
        let table = Reclaimer::new(10);
        let tracker = ReclaimTracker::new();
        let stats = LmkStats::new();
        let make = || set_of(vec![candidate(1, 900, 500, 0, 0), candidate(2, 900, 500, 0, 0)]);

        let first = run(&table, &mut make(), &tracker, &stats);
        assert!(first.efficiency.unwrap() < SWAP_OPT_EFF);
        assert!(!first.cooldown_started);

        let second = run(&table, &mut make(), &tracker, &stats);
        assert!(second.cooldown_started);
        assert_eq!(tracker.cooldown(), 2);

        let calls_before = table.calls.borrow().len();
        let third = run(&table, &mut make(), &tracker, &stats);
        assert!(third.skipped);
        assert_eq!(table.calls.borrow().len(), calls_before);
        assert_eq!(tracker.cooldown(), 1);
    }

    #[test]
    fn test_zero_scan_leaves_tracker_alone() {
        let table = Reclaimer::new(0);
        let tracker = ReclaimTracker::new();
        let stats = LmkStats::new();
        // only protected candidates: nothing is scanned
        let mut set = set_of(vec![candidate(1, 0, 500, 0, 0), candidate(2, 50, 500, 0, 0)]);

        let report = run(&table, &mut set, &tracker, &stats);
        assert_eq!(report.calls, 0);
        assert_eq!(report.efficiency, None);
        assert_eq!(tracker.window(), 0);
    }
}
