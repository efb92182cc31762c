//! Integration tests for the decision pass driver.
//!
//! These tests drive complete passes through the public API against a
//! scripted host whose memory counters react to kills, and verify reclaim
//! cooldown across passes, kill ordering, escalation and handle release.

use prlmk::lmk::host::{
    MemoryCounters, MemorySample, ProcessAttributes, ProcessEntry, ProcessRef, ProcessTable,
    ReclaimOutcome, TaskFlags,
};
use prlmk::lmk::{run_pass, LmkContext, PassOutcome};
use prlmk::{LmkError, PressureState, Tunables};
use std::cell::{Cell, RefCell};
use std::fs::File;
use std::os::fd::OwnedFd;
use std::sync::atomic::Ordering;
use std::time::Duration;

struct FakeProc {
    pid: i32,
    adj: i16,
    anon: u64,
    gid: u32,
    usage: u64,
    flags: TaskFlags,
}

fn proc(pid: i32, adj: i16, anon: u64, gid: u32, usage: u64) -> FakeProc {
    FakeProc {
        pid,
        adj,
        anon,
        gid,
        usage,
        flags: TaskFlags {
            single_threaded: true,
            ..Default::default()
        },
    }
}

/// Host whose free swap grows by `relief_kb` with every kill.
struct FakeHost {
    procs: Vec<FakeProc>,
    refs: Vec<ProcessRef>,
    active_file_pages: Cell<u64>,
    free_swap_kb: Cell<u64>,
    relief_kb: u64,
    reclaim_percent: u64,
    killed: RefCell<Vec<i32>>,
    reclaimed: RefCell<Vec<(i32, u64)>>,
}

impl FakeHost {
    fn new(procs: Vec<FakeProc>, active_file_pages: u64, free_swap_kb: u64) -> Self {
        let refs = procs
            .iter()
            .map(|p| {
                let fd: OwnedFd = File::open("/dev/null").expect("open /dev/null").into();
                ProcessRef::with_pidfd(p.pid, fd)
            })
            .collect();
        Self {
            procs,
            refs,
            active_file_pages: Cell::new(active_file_pages),
            free_swap_kb: Cell::new(free_swap_kb),
            relief_kb: 0,
            reclaim_percent: 100,
            killed: RefCell::new(Vec::new()),
            reclaimed: RefCell::new(Vec::new()),
        }
    }

    fn relief_kb(mut self, kb: u64) -> Self {
        self.relief_kb = kb;
        self
    }

    fn reclaim_percent(mut self, percent: u64) -> Self {
        self.reclaim_percent = percent;
        self
    }
}

impl MemoryCounters for FakeHost {
    fn active_file_pages(&self) -> u64 {
        self.active_file_pages.get()
    }

    fn free_swap_kb(&self) -> u64 {
        self.free_swap_kb.get()
    }
}

impl ProcessTable for FakeHost {
    fn snapshot(&self) -> Vec<ProcessEntry> {
        self.procs
            .iter()
            .zip(&self.refs)
            .map(|(p, r)| ProcessEntry {
                process: r.clone(),
                name: format!("proc{}", p.pid),
                flags: p.flags,
            })
            .collect()
    }

    fn attributes(&self, entry: &ProcessEntry) -> Option<ProcessAttributes> {
        let p = self.procs.iter().find(|p| p.pid == entry.process.pid())?;
        Some(ProcessAttributes {
            adjustment_score: p.adj,
            anon_pages: p.anon,
            last_group: Some(p.gid),
            accumulated_usage: p.usage,
        })
    }

    fn reclaim_anon(&self, process: &ProcessRef, target_pages: u64) -> ReclaimOutcome {
        self.reclaimed.borrow_mut().push((process.pid(), target_pages));
        ReclaimOutcome {
            scanned: target_pages,
            reclaimed: target_pages * self.reclaim_percent / 100,
        }
    }

    fn terminate(&self, process: &ProcessRef) -> Result<(), LmkError> {
        self.killed.borrow_mut().push(process.pid());
        self.free_swap_kb
            .set(self.free_swap_kb.get() + self.relief_kb);
        Ok(())
    }
}

fn context(tunables: Tunables) -> LmkContext {
    LmkContext::new(tunables).kill_settle(Duration::ZERO)
}

/// Plenty of swap and file pages.
const RELAXED_SWAP_KB: u64 = 1 << 30;

#[test]
fn test_no_candidates_ends_pass() {
    let host = FakeHost::new(vec![proc(1, -100, 500, 1000, 1), proc(2, 900, 0, 1000, 1)], 0, 0);
    let ctx = context(Tunables::default());

    assert_eq!(run_pass(&host, &host, &ctx), PassOutcome::NoCandidates);
    assert!(host.killed.borrow().is_empty());
    assert_eq!(ctx.stats.empty_passes.load(Ordering::Relaxed), 1);
}

#[test]
fn test_reclaim_when_no_low_memory() {
    let host = FakeHost::new(
        vec![
            proc(1, 900, 100, 1000, 1),
            proc(2, 0, 400, 1001, 1),
            proc(3, 700, 500, 1002, 1),
        ],
        1_000_000,
        RELAXED_SWAP_KB,
    );
    let ctx = context(Tunables::default());

    let outcome = run_pass(&host, &host, &ctx);
    let PassOutcome::Reclaim(report) = outcome else {
        panic!("expected reclaim, got {:?}", outcome);
    };
    assert_eq!(report.calls, 2);
    assert_eq!(report.efficiency, Some(100));

    // heaviest unprotected first, sized against the total of all candidates
    let calls = host.reclaimed.borrow();
    assert_eq!(calls[0], (3, 500 * 1024 / 1000));
    assert_eq!(calls[1], (1, 100 * 1024 / 1000));
    assert!(host.killed.borrow().is_empty());
}

#[test]
fn test_reclaim_cooldown_across_passes() {
    let host = FakeHost::new(
        vec![proc(1, 900, 500, 1000, 1), proc(2, 900, 500, 1001, 1)],
        1_000_000,
        RELAXED_SWAP_KB,
    )
    .reclaim_percent(10);
    let ctx = context(Tunables::default());

    let mut skipped = Vec::new();
    for _ in 0..5 {
        match run_pass(&host, &host, &ctx) {
            PassOutcome::Reclaim(report) => skipped.push(report.skipped),
            other => panic!("expected reclaim, got {:?}", other),
        }
    }

    // two inefficient batches, two skipped passes, then reclaim resumes
    assert_eq!(skipped, vec![false, false, true, true, false]);
    assert_eq!(ctx.stats.reclaim_cooldown_skips.load(Ordering::Relaxed), 2);
}

#[test]
fn test_kill_order_until_relieved() {
    // each kill frees 8 MiB of swap; three kills clear the 20 MiB limit
    let host = FakeHost::new(
        vec![
            proc(10, 900, 100, 1000, 40),
            proc(11, 900, 100, 1001, 10),
            proc(12, 900, 100, 1002, 30),
            proc(13, 900, 100, 1003, 20),
            proc(14, 900, 100, 1004, 50),
        ],
        0,
        0,
    )
    .relief_kb(8 * 1024);
    let ctx = context(Tunables::default());

    let outcome = run_pass(&host, &host, &ctx);
    let PassOutcome::Kill { state, report } = outcome else {
        panic!("expected kill, got {:?}", outcome);
    };
    assert_eq!(state, PressureState::Critical);
    assert_eq!(*host.killed.borrow(), vec![11, 13, 12]);
    assert_eq!(report.killed, 3);
    assert!(report.relieved);
    assert_eq!(ctx.stats.kills.load(Ordering::Relaxed), 3);
}

#[test]
fn test_group_collapse_under_normal_pressure() {
    let host = FakeHost::new(
        vec![
            proc(20, 900, 100, 5000, 10),
            proc(21, 900, 100, 5000, 90),
            proc(22, 900, 100, 5001, 30),
        ],
        1_000_000,
        1024,
    );
    let ctx = context(Tunables::default());

    let outcome = run_pass(&host, &host, &ctx);
    let PassOutcome::Kill { state, report } = outcome else {
        panic!("expected kill, got {:?}", outcome);
    };
    assert_eq!(state, PressureState::Normal);
    assert_eq!(report.group_ignored, 1);
    // pid 20 shares a group with the heavier pid 21 and survives
    assert_eq!(*host.killed.borrow(), vec![22, 21]);
}

#[test]
fn test_escalation_only_when_nothing_killed() {
    let host = FakeHost::new(
        vec![
            proc(30, 0, 100, 1000, 10),
            proc(31, 200, 100, 1001, 20),
            proc(32, 50, 100, 1002, 30),
        ],
        0,
        0,
    )
    .relief_kb(32 * 1024);
    let ctx = context(Tunables::default());

    let outcome = run_pass(&host, &host, &ctx);
    let PassOutcome::Kill { report, .. } = outcome else {
        panic!("expected kill, got {:?}", outcome);
    };
    assert_eq!(report.killed, 0);
    // the most recently deferred service goes first and relieves pressure
    assert_eq!(*host.killed.borrow(), vec![32]);
    assert_eq!(report.escalated, 1);
    assert_eq!(ctx.stats.escalation_kills.load(Ordering::Relaxed), 1);
}

#[test]
fn test_no_escalation_below_critical() {
    let host = FakeHost::new(
        vec![proc(40, 0, 100, 1000, 10), proc(41, 50, 100, 1001, 20)],
        1_000_000,
        1024,
    );
    let ctx = context(Tunables::default());

    let outcome = run_pass(&host, &host, &ctx);
    let PassOutcome::Kill { state, report } = outcome else {
        panic!("expected kill, got {:?}", outcome);
    };
    assert_eq!(state, PressureState::Normal);
    assert_eq!(report.escalated, 0);
    assert!(host.killed.borrow().is_empty());
}

#[test]
fn test_handles_released_after_pass() {
    let host = FakeHost::new(
        vec![proc(50, 900, 100, 1000, 10), proc(51, 900, 100, 1001, 20)],
        1_000_000,
        RELAXED_SWAP_KB,
    );
    let ctx = context(Tunables::default());

    assert!(host.refs.iter().all(|r| r.pin_count() == 1));
    run_pass(&host, &host, &ctx);
    assert!(host.refs.iter().all(|r| r.pin_count() == 1));
}

#[test]
fn test_tunables_change_between_passes() {
    let host = FakeHost::new(vec![proc(60, 100, 100, 1000, 10)], 1_000_000, 1024);
    let ctx = context(Tunables::default());

    // score 100 is below min_adj 300: spared under normal pressure
    run_pass(&host, &host, &ctx);
    assert!(host.killed.borrow().is_empty());

    let mut lowered = ctx.tunables.get();
    lowered.min_adj = 50;
    ctx.tunables.set(lowered);

    run_pass(&host, &host, &ctx);
    assert_eq!(*host.killed.borrow(), vec![60]);
}
