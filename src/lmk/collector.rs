//! Process snapshot collection.
//!
//! Walks one table snapshot and builds the bounded candidate set for a pass.
//! Processes that vanish mid-walk simply drop out: liveness is re-validated
//! when a candidate is acted upon, not here. Only accepted candidates are
//! pinned.

use tracing::trace;

use crate::lmk::candidate::{select, CandidateSet};
use crate::lmk::host::{ProcessTable, TaskFlags};
use crate::tunables::Tunables;

/// Processes that are already on their way out.
pub fn is_exiting(flags: &TaskFlags) -> bool {
    flags.group_exiting || (flags.single_threaded && flags.exiting) || flags.kernel_thread
}

/// Builds the candidate set for one pass.
pub fn collect<T: ProcessTable + ?Sized>(table: &T, tunables: &Tunables) -> CandidateSet {
    let mut set = CandidateSet::new();

    for entry in table.snapshot() {
        if is_exiting(&entry.flags) {
            continue;
        }

        // Already dying from an earlier kill; counting it again would double
        // its memory.
        if entry.flags.kill_pending {
            trace!(pid = entry.process.pid(), "skipping process with kill pending");
            continue;
        }

        let Some(attrs) = table.attributes(&entry) else {
            continue;
        };

        let Some(mut candidate) = select(&entry, &attrs, tunables) else {
            continue;
        };
        candidate.process = table.pin(&entry);

        set.push(candidate);
        if set.is_full() {
            break;
        }
    }

    set
}
