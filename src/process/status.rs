//! Parsing of `/proc/<pid>/status` and `/proc/<pid>/oom_score_adj`.

use std::fs;
use std::path::Path;

use crate::error::LmkError;
use crate::system::kb_to_pages;

/// Bit of SIGKILL in the pending signal masks.
const SIGKILL_BIT: u64 = 1 << (libc::SIGKILL - 1);

/// Fields of `/proc/<pid>/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcStatus {
    /// Resident anonymous memory in KiB; absent for processes without an address space.
    pub rss_anon_kb: Option<u64>,
    /// Supplementary groups in kernel order.
    pub groups: Vec<u32>,
    pub core_dumping: bool,
    /// SIGKILL is pending on this thread or its thread group.
    pub kill_pending: bool,
}

impl ProcStatus {
    pub fn anon_pages(&self) -> Option<u64> {
        self.rss_anon_kb.map(kb_to_pages)
    }

    pub fn last_group(&self) -> Option<u32> {
        self.groups.last().copied()
    }
}

fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}

fn parse_sigmask(v: &str) -> Option<u64> {
    u64::from_str_radix(v.trim(), 16).ok()
}

/// Parses the content of a status file. Unknown lines are ignored.
pub fn parse_status(content: &str) -> ProcStatus {
    let mut status = ProcStatus::default();

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("RssAnon:") {
            status.rss_anon_kb = parse_kb_value(v);
        } else if let Some(v) = line.strip_prefix("Groups:") {
            status.groups = v
                .split_whitespace()
                .filter_map(|g| g.parse::<u32>().ok())
                .collect();
        } else if let Some(v) = line.strip_prefix("CoreDumping:") {
            status.core_dumping = v.trim() == "1";
        } else if let Some(v) = line
            .strip_prefix("SigPnd:")
            .or_else(|| line.strip_prefix("ShdPnd:"))
        {
            if parse_sigmask(v).is_some_and(|mask| mask & SIGKILL_BIT != 0) {
                status.kill_pending = true;
            }
        }
    }

    status
}

pub fn read_status(proc_path: &Path) -> Result<ProcStatus, LmkError> {
    let path = proc_path.join("status");
    let content =
        fs::read_to_string(&path).map_err(|e| LmkError::io(path.display().to_string(), e))?;
    Ok(parse_status(&content))
}

/// True when any thread of the process has SIGKILL pending.
pub fn any_thread_kill_pending(proc_path: &Path) -> bool {
    let Ok(tasks) = fs::read_dir(proc_path.join("task")) else {
        return false;
    };

    tasks.flatten().any(|task| {
        fs::read_to_string(task.path().join("status"))
            .map(|content| parse_status(&content).kill_pending)
            .unwrap_or(false)
    })
}

pub fn read_oom_score_adj(proc_path: &Path) -> Result<i16, LmkError> {
    let path = proc_path.join("oom_score_adj");
    let content =
        fs::read_to_string(&path).map_err(|e| LmkError::io(path.display().to_string(), e))?;
    content
        .trim()
        .parse::<i16>()
        .map_err(|e| LmkError::parse("oom_score_adj", e.to_string()))
}
