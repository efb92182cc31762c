//! System-wide counters from the /proc filesystem.
//!
//! This module provides the Linux implementations of the memory counters
//! (`/proc/meminfo`) and the pressure source (`/proc/pressure/memory`), plus
//! small helpers around page size and thread priority.

use once_cell::sync::Lazy;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::LmkError;
use crate::lmk::host::{MemoryCounters, MemorySample, PressureSource};

/// Get the system page size in bytes (usually 4096).
fn get_page_size() -> u64 {
    // SAFETY: sysconf is safe to call with _SC_PAGESIZE
    // Returns -1 on error - handled by the > 0 check
    unsafe {
        let size = libc::sysconf(libc::_SC_PAGESIZE);
        if size > 0 {
            return size as u64;
        }
    }
    4096
}

/// System page size in bytes.
pub static PAGE_SIZE: Lazy<u64> = Lazy::new(get_page_size);

/// Converts a KiB amount to whole pages.
pub fn kb_to_pages(kb: u64) -> u64 {
    kb.saturating_mul(1024) / *PAGE_SIZE
}

/// Memory counters relevant to low-memory classification, in KiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemInfo {
    pub active_file_kb: u64,
    pub swap_free_kb: u64,
}

/// Parses the fields we need from /proc/meminfo content.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, LmkError> {
    let mut active_file_kb: Option<u64> = None;
    let mut swap_free_kb: Option<u64> = None;

    for line in content.lines() {
        let value = |rest: &str| rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok());

        if let Some(rest) = line.strip_prefix("Active(file):") {
            active_file_kb = value(rest);
        } else if let Some(rest) = line.strip_prefix("SwapFree:") {
            swap_free_kb = value(rest);
        }

        if active_file_kb.is_some() && swap_free_kb.is_some() {
            break;
        }
    }

    match (active_file_kb, swap_free_kb) {
        (Some(active_file_kb), Some(swap_free_kb)) => Ok(MemInfo {
            active_file_kb,
            swap_free_kb,
        }),
        _ => Err(LmkError::parse("meminfo", "missing Active(file) or SwapFree")),
    }
}

pub fn read_meminfo(path: &Path) -> Result<MemInfo, LmkError> {
    let content =
        fs::read_to_string(path).map_err(|e| LmkError::io(path.display().to_string(), e))?;
    parse_meminfo(&content)
}

/// Memory counters backed by /proc/meminfo.
///
/// A failed read reports plenty of memory, so a broken counter never causes kills.
#[derive(Debug, Clone)]
pub struct ProcMemInfo {
    path: PathBuf,
}

impl ProcMemInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> Option<MemInfo> {
        match read_meminfo(&self.path) {
            Ok(info) => Some(info),
            Err(e) => {
                warn!("Failed to read memory counters: {}", e);
                None
            }
        }
    }
}

impl MemoryCounters for ProcMemInfo {
    fn active_file_pages(&self) -> u64 {
        self.read()
            .map(|m| kb_to_pages(m.active_file_kb))
            .unwrap_or(u64::MAX)
    }

    fn free_swap_kb(&self) -> u64 {
        self.read().map(|m| m.swap_free_kb).unwrap_or(u64::MAX)
    }

    fn sample(&self) -> MemorySample {
        match self.read() {
            Some(m) => MemorySample {
                active_file_pages: kb_to_pages(m.active_file_kb),
                free_swap_kb: m.swap_free_kb,
            },
            None => MemorySample {
                active_file_pages: u64::MAX,
                free_swap_kb: u64::MAX,
            },
        }
    }
}

/// Which PSI line to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsiLine {
    Some,
    Full,
}

impl PsiLine {
    fn prefix(self) -> &'static str {
        match self {
            PsiLine::Some => "some",
            PsiLine::Full => "full",
        }
    }
}

/// Parses the `avg10` percentage from PSI content.
///
/// Format: "some avg10=0.00 avg60=0.00 avg300=0.00 total=123456789"
pub fn parse_psi_avg10(content: &str, line: PsiLine) -> Result<f64, LmkError> {
    for l in content.lines() {
        if !l.starts_with(line.prefix()) {
            continue;
        }
        for part in l.split_whitespace() {
            if let Some(avg) = part.strip_prefix("avg10=") {
                return avg
                    .parse::<f64>()
                    .map_err(|e| LmkError::parse("psi avg10", e.to_string()));
            }
        }
    }

    Err(LmkError::parse(
        "psi",
        format!("no '{}' line with avg10", line.prefix()),
    ))
}

/// Pressure source backed by a PSI file such as /proc/pressure/memory.
#[derive(Debug, Clone)]
pub struct PsiSource {
    path: PathBuf,
    line: PsiLine,
}

impl PsiSource {
    pub fn new(path: impl Into<PathBuf>, line: PsiLine) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PressureSource for PsiSource {
    fn read_pressure(&self) -> Result<u64, LmkError> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| LmkError::io(self.path.display().to_string(), e))?;
        let avg10 = parse_psi_avg10(&content, self.line)?;
        Ok(avg10.round().clamp(0.0, 100.0) as u64)
    }
}

/// Lowers the nice value of the calling thread. Fails without CAP_SYS_NICE.
pub fn raise_thread_priority(nice: i32) -> Result<(), std::io::Error> {
    // SAFETY: setpriority only reads its integer arguments; who=0 addresses
    // the calling thread on Linux.
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS as _, 0, nice) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}
