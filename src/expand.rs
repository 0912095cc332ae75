//! Block expansion: grow a set of one-line occurrences in lock-step
//! until any pairwise comparison turns up Different or a file boundary is
//! hit, committing LinesDone for each occurrence's newly-covered line after
//! every successful growth step so a sibling occurrence sharing the same
//! peer bitmap sees the claim on its very next growth attempt.

use crate::equivalence::{self, Level};
use crate::occurrence::{LoadedFile, WorkingOccurrence, WorkingState};
use crate::options::CompiledOptions;

/// Advances `end` past already-done or unaccepted lines, returning the next
/// candidate end (exclusive) or `None` if the file boundary was reached.
fn next_candidate_end(
    file: &LoadedFile,
    done_at: impl Fn(usize) -> bool,
    mut end: usize,
    opts: &CompiledOptions,
) -> Option<usize> {
    loop {
        if end >= file.line_count() {
            return None;
        }
        if done_at(end) {
            return None;
        }
        let line = &file.lines[end];
        end += 1;
        let accepted = (!(opts.ignore_blank_lines && line.is_blank()))
            && crate::driver::long_enough(line, opts)
            && !line.matches_ignore();
        if accepted {
            return Some(end);
        }
        // Blank/ignored lines are skipped over but still counted, so the
        // loop just keeps stepping `end` forward.
    }
}

/// Grows every occurrence in `occs` simultaneously against `subject`'s
/// LinesDone bitmaps. Returns the possibly-lowered level; `occs` is mutated
/// in place with the final committed ranges, and `subject`'s bitmaps are
/// updated to match every growth step taken, not just the final one.
pub fn expand_occurrences(
    occs: &mut [WorkingOccurrence],
    files: &[LoadedFile],
    mut level: Level,
    subject: &mut WorkingState,
    opts: &CompiledOptions,
) -> Level {
    loop {
        let mut trial_ends = Vec::with_capacity(occs.len());
        let mut blocked = false;
        for occ in occs.iter() {
            let file = &files[occ.file];
            match next_candidate_end(file, |idx| subject.is_committed(occ, idx), occ.end, opts) {
                Some(end) => trial_ends.push(end),
                None => {
                    blocked = true;
                    break;
                }
            }
        }
        if blocked {
            return level;
        }

        let base_line = &files[occs[0].file].lines[trial_ends[0] - 1];
        let mut iteration_level = Level::Equal;
        let mut different = false;
        for (i, occ) in occs.iter().enumerate().skip(1) {
            let other_line = &files[occ.file].lines[trial_ends[i] - 1];
            let pairwise = equivalence::compare(base_line, other_line, opts);
            if pairwise == Level::Different {
                different = true;
                break;
            }
            iteration_level = iteration_level.min(pairwise);
        }
        if different {
            return level;
        }

        level = level.min(iteration_level);
        for (occ, end) in occs.iter_mut().zip(trial_ends) {
            let covered_from = occ.end;
            subject.commit_range(occ, covered_from, end);
            occ.end = end;
        }
    }
}
