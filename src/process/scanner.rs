//! Process table backed by the /proc filesystem.
//!
//! This module scans /proc for process entries, reads the attributes the
//! decision engine needs and carries out reclaim and termination on live
//! processes.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::error::LmkError;
use crate::lmk::host::{
    ProcessAttributes, ProcessEntry, ProcessRef, ProcessTable, ReclaimOutcome, TaskFlags,
};
use crate::process::memory::{
    bytes_to_pages, pageout, pages_to_bytes, plan_pageout, read_anon_ranges, resident_covered,
};
use crate::process::signal;
use crate::process::stat::read_stat;
use crate::process::status::{any_thread_kill_pending, read_oom_score_adj, read_status};

/// Process entry representing a directory in /proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcEntry {
    pub pid: i32,
    pub proc_path: PathBuf,
}

/// Scans /proc directory for process entries with numeric PIDs.
pub fn collect_proc_entries(root: &Path) -> Vec<ProcEntry> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let p = entry.path();
            let name = match p.file_name().and_then(|s| s.to_str()) {
                Some(v) => v,
                None => continue,
            };
            if !name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let pid: i32 = match name.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            out.push(ProcEntry { pid, proc_path: p });
        }
    }
    out
}

/// Linux process table.
#[derive(Debug, Clone)]
pub struct ProcTable {
    root: PathBuf,
    dry_run: bool,
}

impl ProcTable {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
        }
    }

    /// Log reclaim and kill decisions instead of acting on them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn proc_path(&self, pid: i32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    fn read_entry(&self, entry: &ProcEntry) -> Option<ProcessEntry> {
        let stat = read_stat(&entry.proc_path).ok()?;
        let status = read_status(&entry.proc_path).ok()?;

        let single_threaded = stat.num_threads <= 1;
        let kill_pending = status.kill_pending
            || (!single_threaded && any_thread_kill_pending(&entry.proc_path));

        let flags = TaskFlags {
            group_exiting: stat.is_dead() || status.core_dumping,
            exiting: stat.is_exiting(),
            single_threaded,
            kernel_thread: stat.is_kernel_thread(),
            kill_pending,
        };

        Some(ProcessEntry {
            process: ProcessRef::new(entry.pid),
            name: stat.comm,
            flags,
        })
    }

    fn anon_pages(&self, pid: i32) -> Option<u64> {
        read_status(&self.proc_path(pid)).ok()?.anon_pages()
    }
}

impl ProcessTable for ProcTable {
    fn snapshot(&self) -> Vec<ProcessEntry> {
        collect_proc_entries(&self.root)
            .iter()
            .filter_map(|e| self.read_entry(e))
            .collect()
    }

    fn pin(&self, entry: &ProcessEntry) -> ProcessRef {
        signal::pin(entry.process.pid())
    }

    fn attributes(&self, entry: &ProcessEntry) -> Option<ProcessAttributes> {
        let proc_path = self.proc_path(entry.process.pid());

        let status = read_status(&proc_path).ok()?;
        let anon_pages = status.anon_pages()?;
        let adjustment_score = read_oom_score_adj(&proc_path).ok()?;
        let stat = read_stat(&proc_path).ok()?;

        Some(ProcessAttributes {
            adjustment_score,
            anon_pages,
            last_group: status.last_group(),
            accumulated_usage: stat.cpu_ticks,
        })
    }

    fn reclaim_anon(&self, process: &ProcessRef, target_pages: u64) -> ReclaimOutcome {
        if target_pages == 0 {
            return ReclaimOutcome::default();
        }
        if self.dry_run {
            info!(pid = process.pid(), target_pages, "dry-run: would reclaim");
            return ReclaimOutcome::default();
        }

        let pid = process.pid();
        let Some(before) = self.anon_pages(pid) else {
            return ReclaimOutcome::default();
        };

        let ranges = match read_anon_ranges(&self.proc_path(pid)) {
            Ok(r) => r,
            Err(e) => {
                trace!(pid, "no anon ranges: {}", e);
                return ReclaimOutcome::default();
            }
        };

        let plan = plan_pageout(ranges, pages_to_bytes(target_pages));
        let scanned = match pageout(process, &plan) {
            Ok(advised) => bytes_to_pages(resident_covered(&plan, advised)),
            Err(e) => {
                debug!(pid, "pageout failed: {}", e);
                return ReclaimOutcome::default();
            }
        };

        let after = self.anon_pages(pid).unwrap_or(before);
        ReclaimOutcome {
            scanned,
            reclaimed: before.saturating_sub(after).min(scanned),
        }
    }

    fn terminate(&self, process: &ProcessRef) -> Result<(), LmkError> {
        if self.dry_run {
            info!(pid = process.pid(), "dry-run: would kill");
            return Ok(());
        }
        signal::terminate(process)
    }
}
