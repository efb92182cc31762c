//! Anonymous memory reclaim through `process_madvise(MADV_PAGEOUT)`.
//!
//! The anonymous mappings of a process and their resident anonymous memory
//! are read from `/proc/<pid>/smaps`. Ranges are paged out, most resident
//! first, until the requested number of resident pages is covered. Mappings
//! that are only reserved address space are never part of a plan.

use std::fs;
use std::io::{BufRead, BufReader};
use std::os::fd::AsRawFd;
use std::path::Path;

use crate::error::LmkError;
use crate::lmk::host::ProcessRef;
use crate::system::PAGE_SIZE;

/// Upper bound on iovecs per process_madvise call (UIO_MAXIOV).
const MAX_IOVECS: usize = 1024;

/// One anonymous, private, writable mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnonRange {
    pub start: u64,
    pub end: u64,
    /// Resident anonymous bytes inside the range.
    pub resident: u64,
}

impl AnonRange {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parses one mapping header, keeping only private writable anonymous mappings.
///
/// Format: "55d0c0a00000-55d0c0a21000 rw-p 00000000 00:00 0    [heap]"
fn parse_maps_line(line: &str) -> Option<AnonRange> {
    let mut parts = line.split_whitespace();
    let range = parts.next()?;
    let perms = parts.next()?;
    let _offset = parts.next()?;
    let _dev = parts.next()?;
    let inode = parts.next()?;
    let path = parts.next();

    if !perms.starts_with("rw") || !perms.ends_with('p') || inode != "0" {
        return None;
    }

    match path {
        None => {}
        Some(p) if p == "[heap]" || p == "[stack]" || p.starts_with("[anon:") => {}
        Some(_) => return None,
    }

    let (start, end) = range.split_once('-')?;
    Some(AnonRange {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        resident: 0,
    })
}

/// Header lines start with an address range, field lines with "Name:".
fn is_mapping_header(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|first| first.contains('-') && !first.ends_with(':'))
}

/// Parses kilobyte values from smaps field lines.
pub fn parse_kb_value(v: &str) -> Option<u64> {
    v.split_whitespace().next()?.parse().ok()
}

/// Collects anonymous ranges from smaps content, with the `Anonymous:` field
/// of each mapping as its resident size.
pub fn parse_anon_ranges<R: BufRead>(reader: R) -> Vec<AnonRange> {
    let mut out = Vec::new();
    let mut current: Option<AnonRange> = None;

    for line in reader.lines().map_while(Result::ok) {
        if is_mapping_header(&line) {
            out.extend(current.take());
            current = parse_maps_line(&line);
        } else if let Some(kb) = line.strip_prefix("Anonymous:") {
            if let Some(range) = current.as_mut() {
                range.resident = parse_kb_value(kb).unwrap_or(0).saturating_mul(1024);
            }
        }
    }
    out.extend(current);

    out.retain(|r| !r.is_empty());
    out
}

pub fn read_anon_ranges(proc_path: &Path) -> Result<Vec<AnonRange>, LmkError> {
    let path = proc_path.join("smaps");
    let file = fs::File::open(&path).map_err(|e| LmkError::io(path.display().to_string(), e))?;
    Ok(parse_anon_ranges(BufReader::new(file)))
}

/// Picks ranges, most resident first, until `target_bytes` of resident memory
/// is covered. Ranges with nothing resident are skipped. The last range is
/// clipped in proportion to its residency so the plan does not overshoot.
pub fn plan_pageout(mut ranges: Vec<AnonRange>, target_bytes: u64) -> Vec<AnonRange> {
    ranges.retain(|r| r.resident > 0);
    ranges.sort_by(|a, b| b.resident.cmp(&a.resident));

    let page = *PAGE_SIZE;
    let mut plan = Vec::new();
    let mut left = target_bytes;
    for r in ranges {
        if left == 0 || plan.len() >= MAX_IOVECS {
            break;
        }
        if r.resident <= left {
            left -= r.resident;
            plan.push(r);
            continue;
        }

        let share = (r.len() as u128 * left as u128 / r.resident as u128) as u64;
        let len = share.div_ceil(page).saturating_mul(page).clamp(page, r.len());
        plan.push(AnonRange {
            start: r.start,
            end: r.start + len,
            resident: left,
        });
        left = 0;
    }
    plan
}

/// Resident bytes covered by `plan` when the kernel advised `advised` bytes
/// of it, in order.
pub fn resident_covered(plan: &[AnonRange], advised: u64) -> u64 {
    let mut left = advised;
    let mut covered = 0;
    for r in plan {
        if left == 0 {
            break;
        }
        if left >= r.len() {
            covered += r.resident;
            left -= r.len();
        } else {
            covered += (r.resident as u128 * left as u128 / r.len() as u128) as u64;
            left = 0;
        }
    }
    covered
}

/// Asks the kernel to page out `ranges` of the pinned process. Returns the
/// number of bytes advised.
pub fn pageout(process: &ProcessRef, ranges: &[AnonRange]) -> Result<u64, LmkError> {
    let fd = process
        .pidfd()
        .ok_or(LmkError::Unsupported("reclaim without pidfd"))?;

    let iov: Vec<libc::iovec> = ranges
        .iter()
        .map(|r| libc::iovec {
            iov_base: r.start as *mut libc::c_void,
            iov_len: r.len() as usize,
        })
        .collect();
    if iov.is_empty() {
        return Ok(0);
    }

    // SAFETY: iov points to a live slice of iov.len() entries; the addresses
    // name memory in the target process and are never dereferenced here.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_process_madvise,
            fd.as_raw_fd(),
            iov.as_ptr(),
            iov.len(),
            libc::MADV_PAGEOUT,
            0u32,
        )
    };
    if rc < 0 {
        return Err(LmkError::Reclaim {
            pid: process.pid(),
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(rc as u64)
}

pub fn pages_to_bytes(pages: u64) -> u64 {
    pages.saturating_mul(*PAGE_SIZE)
}

pub fn bytes_to_pages(bytes: u64) -> u64 {
    bytes / *PAGE_SIZE
}
