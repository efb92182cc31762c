//! Decision pass statistics.
//!
//! This module provides counters and running statistics for passes, reclaim
//! work and terminations. All updates are lock-free or take a short mutex so
//! the worker and the daemon's reporting path can share one instance.

use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Running statistics for a single metric.
#[derive(Clone, Copy, Default)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }
}

/// Thread-safe wrapper for running statistics.
#[derive(Default)]
pub struct Stat {
    inner: Mutex<RunningStat>,
}

impl Stat {
    pub fn add_sample(&self, value: f64) {
        if let Ok(mut s) = self.inner.lock() {
            s.add(value);
        }
    }

    /// Returns (last, avg, max, min, count).
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        if let Ok(s) = self.inner.lock() {
            (s.last, s.avg(), s.max, s.min, s.count)
        } else {
            (0.0, 0.0, 0.0, 0.0, 0)
        }
    }
}

/// Counters for everything the decision engine does.
pub struct LmkStats {
    // Trigger
    pub triggers_accepted: AtomicU64,
    pub triggers_coalesced: AtomicU64,

    // Passes
    pub passes: AtomicU64,
    pub empty_passes: AtomicU64,
    pub candidates: Stat,
    pub pass_duration_ms: Stat,

    // Reclaim
    pub reclaim_passes: AtomicU64,
    pub reclaim_cooldown_skips: AtomicU64,
    pub reclaim_calls: AtomicU64,
    pub pages_scanned: AtomicU64,
    pub pages_reclaimed: AtomicU64,
    pub reclaim_efficiency: Stat,
    pub cooldowns_started: AtomicU64,

    // Kill
    pub kill_passes: AtomicU64,
    pub kills: AtomicU64,
    pub escalation_kills: AtomicU64,
    pub kill_failures: AtomicU64,
    pub groups_collapsed: AtomicU64,

    pub start_time: Instant,
}

impl Default for LmkStats {
    fn default() -> Self {
        Self {
            triggers_accepted: AtomicU64::new(0),
            triggers_coalesced: AtomicU64::new(0),
            passes: AtomicU64::new(0),
            empty_passes: AtomicU64::new(0),
            candidates: Stat::default(),
            pass_duration_ms: Stat::default(),
            reclaim_passes: AtomicU64::new(0),
            reclaim_cooldown_skips: AtomicU64::new(0),
            reclaim_calls: AtomicU64::new(0),
            pages_scanned: AtomicU64::new(0),
            pages_reclaimed: AtomicU64::new(0),
            reclaim_efficiency: Stat::default(),
            cooldowns_started: AtomicU64::new(0),
            kill_passes: AtomicU64::new(0),
            kills: AtomicU64::new(0),
            escalation_kills: AtomicU64::new(0),
            kill_failures: AtomicU64::new(0),
            groups_collapsed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl LmkStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_trigger(&self, accepted: bool) {
        if accepted {
            self.triggers_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.triggers_coalesced.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_pass(&self, candidates: usize, duration_ms: f64) {
        self.passes.fetch_add(1, Ordering::Relaxed);
        self.candidates.add_sample(candidates as f64);
        self.pass_duration_ms.add_sample(duration_ms);
    }

    pub fn record_empty_pass(&self) {
        self.empty_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reclaim_skip(&self) {
        self.reclaim_cooldown_skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reclaim(&self, calls: u64, scanned: u64, reclaimed: u64) {
        self.reclaim_passes.fetch_add(1, Ordering::Relaxed);
        self.reclaim_calls.fetch_add(calls, Ordering::Relaxed);
        self.pages_scanned.fetch_add(scanned, Ordering::Relaxed);
        self.pages_reclaimed.fetch_add(reclaimed, Ordering::Relaxed);
    }

    pub fn record_efficiency(&self, efficiency: u64, cooldown_started: bool) {
        self.reclaim_efficiency.add_sample(efficiency as f64);
        if cooldown_started {
            self.cooldowns_started.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_kill_pass(&self) {
        self.kill_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_kill(&self, escalated: bool) {
        self.kills.fetch_add(1, Ordering::Relaxed);
        if escalated {
            self.escalation_kills.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_kill_failure(&self) {
        self.kill_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_groups_collapsed(&self, ignored: u64) {
        self.groups_collapsed.fetch_add(ignored, Ordering::Relaxed);
    }

    /// Overall reclaim efficiency in percent since start, if anything was scanned.
    pub fn overall_efficiency(&self) -> Option<u64> {
        let scanned = self.pages_scanned.load(Ordering::Relaxed);
        if scanned == 0 {
            return None;
        }
        Some(self.pages_reclaimed.load(Ordering::Relaxed) * 100 / scanned)
    }

    /// Renders a human-readable multi-line summary.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let load = |v: &AtomicU64| v.load(Ordering::Relaxed);

        let _ = writeln!(
            out,
            "uptime: {:.0}s",
            self.start_time.elapsed().as_secs_f64()
        );
        let _ = writeln!(
            out,
            "triggers: accepted={} coalesced={}",
            load(&self.triggers_accepted),
            load(&self.triggers_coalesced)
        );

        let (last_ms, avg_ms, max_ms, _, _) = self.pass_duration_ms.snapshot();
        let (_, avg_candidates, _, _, _) = self.candidates.snapshot();
        let _ = writeln!(
            out,
            "passes: total={} empty={} avg_candidates={:.1} duration_ms last={:.2} avg={:.2} max={:.2}",
            load(&self.passes),
            load(&self.empty_passes),
            avg_candidates,
            last_ms,
            avg_ms,
            max_ms
        );

        let efficiency = match self.overall_efficiency() {
            Some(e) => format!("{}%", e),
            None => "n/a".to_string(),
        };
        let _ = writeln!(
            out,
            "reclaim: passes={} cooldown_skips={} calls={} scanned={} reclaimed={} efficiency={} cooldowns={}",
            load(&self.reclaim_passes),
            load(&self.reclaim_cooldown_skips),
            load(&self.reclaim_calls),
            load(&self.pages_scanned),
            load(&self.pages_reclaimed),
            efficiency,
            load(&self.cooldowns_started)
        );
        let _ = writeln!(
            out,
            "kill: passes={} kills={} escalation_kills={} failures={} group_duplicates={}",
            load(&self.kill_passes),
            load(&self.kills),
            load(&self.escalation_kills),
            load(&self.kill_failures),
            load(&self.groups_collapsed)
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat_tracks_min_max_avg() {
        let mut s = RunningStat::default();
        s.add(4.0);
        s.add(2.0);
        s.add(6.0);
        assert_eq!(s.avg(), 4.0);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 6.0);
        assert_eq!(s.last, 6.0);
    }

    #[test]
    fn test_overall_efficiency() {
        let stats = LmkStats::new();
        assert_eq!(stats.overall_efficiency(), None);

        stats.record_reclaim(3, 200, 50);
        assert_eq!(stats.overall_efficiency(), Some(25));
    }

    #[test]
    fn test_summary_mentions_kill_counters() {
        let stats = LmkStats::new();
        stats.record_kill(false);
        stats.record_kill(true);

        let summary = stats.render_summary();
        assert!(summary.contains("kills=2"));
        assert!(summary.contains("escalation_kills=1"));
        assert!(summary.contains("efficiency=n/a"));
    }
}
