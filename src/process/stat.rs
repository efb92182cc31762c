//! Parsing of `/proc/<pid>/stat`.
//!
//! The command name is wrapped in parentheses and may itself contain spaces or
//! parentheses, so fields are split only after the last `)`.

use std::fs;
use std::path::Path;

use crate::error::LmkError;

/// Kernel thread flag in the `flags` field.
pub const PF_KTHREAD: u64 = 0x0020_0000;
/// Exit in progress flag in the `flags` field.
pub const PF_EXITING: u64 = 0x0000_0004;

/// The fields of `/proc/<pid>/stat` the killer cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcStat {
    pub pid: i32,
    pub comm: String,
    pub state: char,
    pub flags: u64,
    /// User plus system time, in clock ticks.
    pub cpu_ticks: u64,
    pub num_threads: u64,
}

impl ProcStat {
    pub fn is_kernel_thread(&self) -> bool {
        self.flags & PF_KTHREAD != 0
    }

    pub fn is_exiting(&self) -> bool {
        self.flags & PF_EXITING != 0
    }

    /// Zombie or dead: nothing left to reclaim or kill.
    pub fn is_dead(&self) -> bool {
        matches!(self.state, 'Z' | 'X' | 'x')
    }
}

/// Parses the content of a stat file.
pub fn parse_stat(content: &str) -> Result<ProcStat, LmkError> {
    let open = content
        .find('(')
        .ok_or_else(|| LmkError::parse("stat", "missing '('"))?;
    let close = content
        .rfind(')')
        .ok_or_else(|| LmkError::parse("stat", "missing ')'"))?;
    if close < open {
        return Err(LmkError::parse("stat", "malformed comm"));
    }

    let pid: i32 = content[..open]
        .trim()
        .parse()
        .map_err(|_| LmkError::parse("stat", "invalid pid"))?;
    let comm = content[open + 1..close].to_string();

    // rest[0] is field 3 (state); field N is rest[N - 3]
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if rest.len() < 18 {
        return Err(LmkError::parse("stat", "too few fields"));
    }

    let field = |n: usize, name: &str| -> Result<u64, LmkError> {
        rest[n - 3]
            .parse::<u64>()
            .map_err(|_| LmkError::parse("stat", format!("invalid {}", name)))
    };

    let state = rest[0].chars().next().unwrap_or('?');
    let flags = field(9, "flags")?;
    let utime = field(14, "utime")?;
    let stime = field(15, "stime")?;
    let num_threads = field(20, "num_threads")?;

    Ok(ProcStat {
        pid,
        comm,
        state,
        flags,
        cpu_ticks: utime.saturating_add(stime),
        num_threads,
    })
}

pub fn read_stat(proc_path: &Path) -> Result<ProcStat, LmkError> {
    let path = proc_path.join("stat");
    let content =
        fs::read_to_string(&path).map_err(|e| LmkError::io(path.display().to_string(), e))?;
    parse_stat(&content)
}
