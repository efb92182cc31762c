//! Group deduplication.
//!
//! Processes sharing a supplementary group usually belong to one app. Only
//! the heaviest of them (by accumulated usage) stays killable; the rest are
//! marked `ignore` so the kill walk passes over them.

use tracing::debug;

use crate::lmk::candidate::{sort_desc_by_key, Candidate};

/// Marks every member of a multi-process group except the heaviest as ignored.
///
/// Reorders `candidates`. Returns the number of candidates newly ignored.
pub fn mark_group_duplicates(candidates: &mut [Candidate]) -> usize {
    // Cluster same-group entries; the order between groups does not matter.
    sort_desc_by_key(candidates, |c| c.group_id);

    let mut ignored = 0;
    let mut start = 0;
    while start < candidates.len() {
        let gid = candidates[start].group_id;
        let mut end = start + 1;
        while end < candidates.len() && candidates[end].group_id == gid {
            end += 1;
        }

        if gid != 0 && end - start > 1 {
            let run = &mut candidates[start..end];
            sort_desc_by_key(run, |c| c.accumulated_usage);

            for c in &mut run[1..] {
                if !c.ignore {
                    c.ignore = true;
                    ignored += 1;
                }
            }

            debug!(
                gid,
                members = end - start,
                keep_pid = run[0].pid,
                keep_usage = run[0].accumulated_usage,
                "kept heaviest process of group"
            );
        }

        start = end;
    }

    ignored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lmk::candidate::tests::candidate;

    #[test]
    fn test_one_group_keeps_heaviest() {
        let mut v = vec![
            candidate(1, 900, 1, 5000, 10),
            candidate(2, 900, 1, 5000, 40),
            candidate(3, 900, 1, 5000, 20),
            candidate(4, 900, 1, 5000, 30),
        ];

        let ignored = mark_group_duplicates(&mut v);
        assert_eq!(ignored, 3);

        let survivors: Vec<&Candidate> = v.iter().filter(|c| !c.ignore).collect();
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].pid, 2);
        assert_eq!(survivors[0].accumulated_usage, 40);
    }

    #[test]
    fn test_groups_are_independent() {
        let mut v = vec![
            candidate(1, 900, 1, 7000, 5),
            candidate(2, 900, 1, 8000, 50),
            candidate(3, 900, 1, 7000, 9),
            candidate(4, 900, 1, 9000, 1),
            candidate(5, 900, 1, 8000, 60),
        ];

        assert_eq!(mark_group_duplicates(&mut v), 2);

        let mut kept: Vec<i32> = v.iter().filter(|c| !c.ignore).map(|c| c.pid).collect();
        kept.sort();
        assert_eq!(kept, vec![3, 4, 5]);
    }

    #[test]
    fn test_ungrouped_candidates_untouched() {
        let mut v = vec![candidate(1, 900, 1, 0, 5), candidate(2, 900, 1, 0, 50)];
        assert_eq!(mark_group_duplicates(&mut v), 0);
        assert!(v.iter().all(|c| !c.ignore));
    }

    #[test]
    fn test_empty_and_single() {
        let mut v: Vec<Candidate> = Vec::new();
        assert_eq!(mark_group_duplicates(&mut v), 0);

        let mut v = vec![candidate(1, 900, 1, 4000, 5)];
        assert_eq!(mark_group_duplicates(&mut v), 0);
        assert!(!v[0].ignore);
    }
}
