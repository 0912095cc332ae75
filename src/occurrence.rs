//! Occurrence and similarity bookkeeping: half-open line ranges, the
//! per-peer `LinesDone` bitmap that tracks consumed/reserved lines, and the
//! result types the engine emits.

use crate::equivalence::Level;
use bitvec::vec::BitVec;
use std::sync::Arc;

use crate::line::Line;

/// Index into the run's file table.
pub type FileId = usize;

/// An immutable, loaded input file shared by every working state that
/// references it.
pub struct LoadedFile {
    pub name: String,
    pub lines: Arc<Vec<Line>>,
}

impl LoadedFile {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Tracks which lines of one file, from the point of view of one peer
/// inside one subject's search, have already been consumed by an accepted
/// similarity (or tentatively reserved, pending rollback).
#[derive(Debug, Clone)]
pub struct LinesDone {
    bits: BitVec,
}

impl LinesDone {
    pub fn new(line_count: usize) -> Self {
        LinesDone {
            bits: BitVec::repeat(false, line_count),
        }
    }

    pub fn is_set(&self, idx: usize) -> bool {
        self.bits[idx]
    }

    pub fn set_range(&mut self, start: usize, end: usize) {
        self.bits[start..end].fill(true);
    }

    pub fn clear_range(&mut self, start: usize, end: usize) {
        self.bits[start..end].fill(false);
    }
}

/// One subject file's working state during a run: its own `LinesDone`
/// (controlling the outer walk) plus one peer working state per
/// input file, including itself.
pub struct WorkingState {
    pub file: FileId,
    pub lines_done: LinesDone,
    pub peers: Vec<PeerState>,
}

impl WorkingState {
    pub fn new(file: FileId, files: &[LoadedFile]) -> Self {
        let lines_done = LinesDone::new(files[file].line_count());
        let peers = files
            .iter()
            .enumerate()
            .map(|(id, f)| PeerState {
                file: id,
                lines_done: LinesDone::new(f.line_count()),
            })
            .collect();
        WorkingState {
            file,
            lines_done,
            peers,
        }
    }

    /// Whether `line_idx` in `occ`'s own file is already claimed: on the
    /// peer bitmap for a peer occurrence, or on the subject's own bitmap
    /// for the seed occurrence (`peer == usize::MAX`).
    pub fn is_committed(&self, occ: &WorkingOccurrence, line_idx: usize) -> bool {
        if occ.peer == usize::MAX {
            self.lines_done.is_set(line_idx)
        } else {
            self.peers[occ.peer].lines_done.is_set(line_idx)
        }
    }

    /// Marks `[start, end)` done for `occ`: on its peer bitmap, and also on
    /// the subject's own bitmap whenever `occ`'s file is the subject file
    /// (a peer occurrence can coincide with the subject file during
    /// self-similarity, and both bitmaps track it independently).
    pub fn commit_range(&mut self, occ: &WorkingOccurrence, start: usize, end: usize) {
        if occ.peer != usize::MAX {
            self.peers[occ.peer].lines_done.set_range(start, end);
        }
        if occ.file == self.file {
            self.lines_done.set_range(start, end);
        }
    }

    /// Undoes a tentative `commit_range` over `[start, end)` for `occ`.
    pub fn rollback_range(&mut self, occ: &WorkingOccurrence, start: usize, end: usize) {
        if occ.peer != usize::MAX {
            self.peers[occ.peer].lines_done.clear_range(start, end);
        }
        if occ.file == self.file {
            self.lines_done.clear_range(start, end);
        }
    }
}

/// One peer's working state inside a subject's search: its own `LinesDone`,
/// independent even when the peer and subject reference the same file.
pub struct PeerState {
    pub file: FileId,
    pub lines_done: LinesDone,
}

/// A tentative or emitted occurrence: a half-open line range inside one
/// peer's file.
#[derive(Debug, Clone, Copy)]
pub struct WorkingOccurrence {
    pub peer: usize,
    pub file: FileId,
    pub start: usize,
    pub end: usize,
}

impl WorkingOccurrence {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &WorkingOccurrence) -> bool {
        self.file == other.file && self.start < other.end && other.start < self.end
    }
}

/// A caller-visible occurrence: a half-open line range in one named file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Occurrence {
    pub file: FileId,
    pub start: usize,
    pub end: usize,
}

impl From<&WorkingOccurrence> for Occurrence {
    fn from(w: &WorkingOccurrence) -> Self {
        Occurrence {
            file: w.file,
            start: w.start,
            end: w.end,
        }
    }
}

/// A group of two or more occurrences sharing one seed, emitted together.
#[derive(Debug, Clone)]
pub struct Similarity {
    pub occurrences: Vec<Occurrence>,
    pub level: Level,
}

impl Similarity {
    /// A sort key used by the deduplicator: occurrences sorted by
    /// (file, start, end), so two similarities covering the same lines
    /// always produce equal keys regardless of discovery order.
    pub fn dedup_key(&self) -> Vec<Occurrence> {
        let mut occs = self.occurrences.clone();
        occs.sort();
        occs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_requires_same_file() {
        let a = WorkingOccurrence { peer: 0, file: 0, start: 0, end: 3 };
        let b = WorkingOccurrence { peer: 0, file: 1, start: 0, end: 3 };
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn overlap_detects_half_open_range_intersection() {
        let a = WorkingOccurrence { peer: 0, file: 0, start: 0, end: 3 };
        let b = WorkingOccurrence { peer: 0, file: 0, start: 2, end: 5 };
        let c = WorkingOccurrence { peer: 0, file: 0, start: 3, end: 5 };
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn lines_done_round_trips_set_and_clear() {
        let mut ld = LinesDone::new(10);
        ld.set_range(2, 5);
        assert!(ld.is_set(2));
        assert!(!ld.is_set(5));
        ld.clear_range(2, 5);
        assert!(!ld.is_set(2));
    }
}
