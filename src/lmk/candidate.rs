//! Candidate records and the bounded per-pass candidate set.

use crate::lmk::host::{ProcessAttributes, ProcessEntry, ProcessRef};
use crate::tunables::Tunables;

/// Upper bound on candidates collected per decision pass.
pub const MAX_CANDIDATES: usize = 128;

/// Adjustment scores that are never reclaimed from and are killed last.
pub const PROTECTED_SCORES: [i16; 3] = [
    0,   // Foreground
    50,  // Service
    200, // Service
];

/// Score of the foreground class within [`PROTECTED_SCORES`].
pub const FOREGROUND_SCORE: i16 = 0;

pub fn is_protected(score: i16) -> bool {
    PROTECTED_SCORES.contains(&score)
}

/// One eligible process for the current decision pass.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub process: ProcessRef,
    pub pid: i32,
    pub name: String,
    pub adjustment_score: i16,
    /// Resident anonymous pages.
    pub anon_size: u64,
    /// Shared group identity, 0 when grouping is off.
    pub group_id: u32,
    pub accumulated_usage: u64,
    /// Excluded from killing by the group deduplicator.
    pub ignore: bool,
}

/// Turns a snapshot entry and its attributes into a candidate, or `None` when
/// the process is not eligible.
///
/// Negative scores are system-protected and never become candidates. With
/// group killing enabled, processes whose last supplementary group is root (or
/// that have none) are skipped entirely.
pub fn select(
    entry: &ProcessEntry,
    attrs: &ProcessAttributes,
    tunables: &Tunables,
) -> Option<Candidate> {
    if attrs.adjustment_score < 0 {
        return None;
    }

    let group_id = if tunables.kill_heaviest_gid {
        match attrs.last_group {
            Some(gid) if gid != 0 => gid,
            _ => return None,
        }
    } else {
        0
    };

    Some(Candidate {
        process: entry.process.clone(),
        pid: entry.process.pid(),
        name: entry.name.clone(),
        adjustment_score: attrs.adjustment_score,
        anon_size: attrs.anon_pages,
        group_id,
        accumulated_usage: attrs.accumulated_usage,
        ignore: false,
    })
}

/// Fixed-capacity arena of candidates for one pass.
///
/// Every later stage works on this array by index; dropping the set releases
/// every pinned process handle it holds.
#[derive(Debug, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    total_anon: u64,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(MAX_CANDIDATES),
            total_anon: 0,
        }
    }

    /// Appends a candidate. Returns `false` once the set is full.
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if self.is_full() {
            return false;
        }
        self.total_anon += candidate.anon_size;
        self.items.push(candidate);
        true
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= MAX_CANDIDATES
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `anon_size` across all candidates.
    pub fn total_anon(&self) -> u64 {
        self.total_anon
    }

    /// No candidates, or none of them own anonymous memory.
    pub fn is_degenerate(&self) -> bool {
        self.items.is_empty() || self.total_anon == 0
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [Candidate] {
        &mut self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.items.iter()
    }
}

/// Sorts `items` by `key`, largest first. Equal keys keep their relative order.
pub fn sort_desc_by_key<T, K, F>(items: &mut [T], key: F)
where
    K: Ord,
    F: Fn(&T) -> K,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}
