//! Snapshot command implementation.
//!
//! Collects the candidate set and classifies memory exactly like a decision
//! pass would, then prints the result instead of acting on it.

use serde::Serialize;

use prlmk::lmk::candidate::is_protected;
use prlmk::lmk::collector::collect;
use prlmk::lmk::host::MemoryCounters;
use prlmk::lmk::pressure::classify_sample;
use prlmk::process::ProcTable;
use prlmk::system::ProcMemInfo;
use prlmk::PressureState;

use crate::cli::ConfigFormat;
use crate::config::{render, Config, DEFAULT_MEMINFO_PATH, DEFAULT_PROC_ROOT};

#[derive(Debug, Serialize)]
struct CandidateRow {
    pid: i32,
    name: String,
    adjustment_score: i16,
    anon_pages: u64,
    group_id: u32,
    accumulated_usage: u64,
    protected: bool,
}

#[derive(Debug, Serialize)]
struct SnapshotReport {
    state: PressureState,
    active_file_pages: u64,
    free_swap_kb: u64,
    candidates: usize,
    total_anon_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    processes: Option<Vec<CandidateRow>>,
}

/// Prints the current pressure state and candidate set.
pub fn command_snapshot(
    verbose: bool,
    format: ConfigFormat,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = config
        .proc_root
        .as_deref()
        .unwrap_or_else(|| std::path::Path::new(DEFAULT_PROC_ROOT));
    let meminfo = config
        .meminfo_path
        .as_deref()
        .unwrap_or_else(|| std::path::Path::new(DEFAULT_MEMINFO_PATH));

    let table = ProcTable::new(root).dry_run(true);
    let counters = ProcMemInfo::new(meminfo);
    let tunables = config.tunables;

    let set = collect(&table, &tunables);
    let sample = counters.sample();

    let processes = verbose.then(|| {
        set.iter()
            .map(|c| CandidateRow {
                pid: c.pid,
                name: c.name.clone(),
                adjustment_score: c.adjustment_score,
                anon_pages: c.anon_size,
                group_id: c.group_id,
                accumulated_usage: c.accumulated_usage,
                protected: is_protected(c.adjustment_score),
            })
            .collect()
    });

    let report = SnapshotReport {
        state: classify_sample(sample, &tunables),
        active_file_pages: sample.active_file_pages,
        free_swap_kb: sample.free_swap_kb,
        candidates: set.len(),
        total_anon_pages: set.total_anon(),
        processes,
    };

    println!("{}", render(&report, &format)?);
    Ok(())
}
