//! Per-subject seed collection and the acceptance predicate.

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::equivalence::Level;
use crate::expand::expand_occurrences;
use crate::line::Line;
use crate::occurrence::{LoadedFile, Occurrence, Similarity, WorkingOccurrence, WorkingState};
use crate::options::CompiledOptions;
use crate::search;

/// `LongEnough`: a line bypasses the minimum-length check if it's blank;
/// otherwise its comparison-form length must meet `min_line_length`.
pub(crate) fn long_enough(line: &Line, opts: &CompiledOptions) -> bool {
    if opts.min_line_length == 0 || line.is_blank() {
        return true;
    }
    line.len(opts.ignore_whitespace) >= opts.min_line_length
}

/// `Accept`: whether a line may seed or extend a similarity.
fn accept(line: &Line, opts: &CompiledOptions) -> bool {
    !(opts.ignore_blank_lines && line.is_blank()) && long_enough(line, opts) && !line.matches_ignore()
}

/// Walks one subject file, returning the similarities it seeds, in
/// ascending order of seed start line. Expects to be called from inside a
/// blocking task (see [`crate::engine`]); `handle` lets nested line
/// searches drive their own async chunk coordination.
pub fn file_similarities(
    handle: &Handle,
    subject: &mut WorkingState,
    files: &[LoadedFile],
    opts: &CompiledOptions,
    cancel: &CancellationToken,
) -> Vec<Similarity> {
    let mut results = Vec::new();
    let subject_file = subject.file;
    let mut i = 0usize;

    while i < files[subject_file].line_count() {
        if cancel.is_cancelled() {
            break;
        }
        if subject.lines_done.is_set(i) {
            i += 1;
            continue;
        }

        let needle = files[subject_file].lines[i].clone();
        if !accept(&needle, opts) {
            i += 1;
            continue;
        }

        let mut seeds: Vec<WorkingOccurrence> = Vec::new();
        for (peer_idx, peer) in subject.peers.iter().enumerate() {
            let start = if peer.file == subject_file { i + 1 } else { 0 };
            let mut cursor = start;
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                let found = search::line_index(
                    handle,
                    &files[peer.file].lines,
                    &peer.lines_done,
                    &needle,
                    cursor,
                    opts,
                    cancel,
                );
                match found {
                    Some(f) => {
                        seeds.push(WorkingOccurrence {
                            peer: peer_idx,
                            file: peer.file,
                            start: f.index,
                            end: f.index + 1,
                        });
                        cursor = f.index + 1;
                    }
                    None => break,
                }
            }
        }

        if seeds.is_empty() {
            i += 1;
            continue;
        }

        seeds.insert(
            0,
            WorkingOccurrence {
                peer: usize::MAX, // the seed itself lives on the subject, not a peer
                file: subject_file,
                start: i,
                end: i + 1,
            },
        );
        let mut level = Level::Equal;
        for occ in seeds.iter().skip(1) {
            let cmp_level = crate::equivalence::compare(
                &needle,
                &files[occ.file].lines[occ.start],
                opts,
            );
            level = level.min(cmp_level);
        }

        let final_level = expand_occurrences(&mut seeds, files, level, subject, opts);

        // Filter same-file overlaps, rolling back LinesDone on anything dropped.
        let mut kept: Vec<WorkingOccurrence> = Vec::new();
        for occ in seeds.iter() {
            if kept.iter().any(|k| k.overlaps(occ)) {
                subject.rollback_range(occ, occ.start, occ.end);
                continue;
            }
            kept.push(*occ);
        }

        if kept.len() < 2 {
            for occ in &kept {
                subject.rollback_range(occ, occ.start, occ.end);
            }
            i += 1;
            continue;
        }

        let seed_len = kept[0].len();
        if seed_len < opts.min_similar_lines {
            for occ in &kept {
                subject.rollback_range(occ, occ.start, occ.end);
            }
            i += 1;
            continue;
        }

        let seed_end = kept[0].end;
        for occ in &kept {
            // Re-assert full coverage: growth commits only marked
            // incremental spans, and a dropped sibling's rollback above may
            // have cleared bits a kept occurrence on the same peer bitmap
            // still needs set (e.g. its own un-grown seed line).
            subject.commit_range(occ, occ.start, occ.end);
        }

        log::debug!(
            "emitting {:?} similarity across {} occurrences in {}",
            final_level,
            kept.len(),
            files[subject_file].name
        );
        results.push(Similarity {
            occurrences: kept.iter().map(Occurrence::from).collect(),
            level: final_level,
        });

        i = seed_end;
    }

    log::info!(
        "{}: found {} similarit{}",
        files[subject_file].name,
        results.len(),
        if results.len() == 1 { "y" } else { "ies" }
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::Line;
    use crate::occurrence::LoadedFile;
    use crate::options::Options;
    use std::sync::Arc;

    fn file(name: &str, lines: &[&str]) -> LoadedFile {
        LoadedFile {
            name: name.to_string(),
            lines: Arc::new(
                lines
                    .iter()
                    .map(|l| Line::new(l.to_string(), None, None, false))
                    .collect(),
            ),
        }
    }

    #[test]
    fn self_similarity_with_overlap_protection() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let f = file(
            "f",
            &["aaaa", "bbbb", "cccc", "aaaa", "bbbb", "xxxx", "aaaa", "bbbb"],
        );
        let files = vec![f];
        let opts = Options::new(5).compile().unwrap();
        let mut subject = WorkingState::new(0, &files);
        let cancel = CancellationToken::new();
        let sims = file_similarities(rt.handle(), &mut subject, &files, &opts, &cancel);

        assert_eq!(sims.len(), 1);
        assert_eq!(sims[0].occurrences.len(), 3);
        assert_eq!(sims[0].level, Level::Equal);
    }

    #[test]
    fn adjacent_same_peer_occurrences_stop_growth_at_mutual_boundary() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let f = file(
            "f",
            &["aaaa", "xxxx", "aaaa", "aaaa", "xxxx", "cccc"],
        );
        let files = vec![f];
        let opts = Options::new(5).compile().unwrap();
        let mut subject = WorkingState::new(0, &files);
        let cancel = CancellationToken::new();
        let sims = file_similarities(rt.handle(), &mut subject, &files, &opts, &cancel);

        assert_eq!(sims.len(), 1);
        let mut occs: Vec<(usize, usize)> = sims[0]
            .occurrences
            .iter()
            .map(|o| (o.start, o.end))
            .collect();
        occs.sort();
        assert_eq!(occs, vec![(0, 2), (2, 4)]);
    }
}
