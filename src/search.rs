//! Parallel line search within one peer file.
//!
//! Short spans are scanned inline. Long spans are partitioned into 10-line
//! chunks, each run as its own blocking task on the tokio thread pool; the
//! first chunk to report a match wins, and every chunk whose start index
//! can no longer win is cancelled. The whole per-subject driver already
//! runs on a blocking task of its own (see [`crate::engine`]); nested chunk
//! tasks are coordinated through a borrowed runtime [`Handle`], since the
//! outer task has no async context of its own to `.await` from.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::equivalence::{self, Level};
use crate::line::Line;
use crate::occurrence::LinesDone;
use crate::options::CompiledOptions;

const CHUNK_SIZE: usize = 10;

/// The outcome of a line search: the earliest matching index (if any) and
/// the level at which it matched.
pub struct Found {
    pub index: usize,
    pub level: Level,
}

/// Searches `lines[start..]` for the earliest index not already marked done
/// in `lines_done` whose line is Similar or Equal to `needle`.
pub fn line_index(
    handle: &Handle,
    lines: &Arc<Vec<Line>>,
    lines_done: &LinesDone,
    needle: &Line,
    start: usize,
    opts: &CompiledOptions,
    cancel: &CancellationToken,
) -> Option<Found> {
    let end = lines.len();
    if start >= end {
        return None;
    }

    if end - start <= CHUNK_SIZE {
        return scan_range(lines, lines_done, needle, start, end, opts, cancel);
    }

    handle.block_on(parallel_scan(lines, lines_done, needle, start, end, opts, cancel))
}

fn scan_range(
    lines: &Arc<Vec<Line>>,
    lines_done: &LinesDone,
    needle: &Line,
    start: usize,
    end: usize,
    opts: &CompiledOptions,
    cancel: &CancellationToken,
) -> Option<Found> {
    for idx in start..end {
        if cancel.is_cancelled() {
            return None;
        }
        if lines_done.is_set(idx) {
            continue;
        }
        let level = equivalence::compare(&lines[idx], needle, opts);
        if level != Level::Different {
            return Some(Found { index: idx, level });
        }
    }
    None
}

async fn parallel_scan(
    lines: &Arc<Vec<Line>>,
    lines_done: &LinesDone,
    needle: &Line,
    start: usize,
    end: usize,
    opts: &CompiledOptions,
    cancel: &CancellationToken,
) -> Option<Found> {
    let chunk_starts: Vec<usize> = (start..end).step_by(CHUNK_SIZE).collect();
    let (tx, mut rx) = mpsc::channel::<(usize, Found)>(chunk_starts.len().max(1));

    let mut chunk_tokens = Vec::with_capacity(chunk_starts.len());
    let mut handles = Vec::with_capacity(chunk_starts.len());

    for (chunk_idx, &chunk_start) in chunk_starts.iter().enumerate() {
        let chunk_end = (chunk_start + CHUNK_SIZE).min(end);
        let chunk_cancel = cancel.child_token();
        chunk_tokens.push(chunk_cancel.clone());

        let lines = Arc::clone(lines);
        let lines_done = lines_done.clone();
        let needle = needle.clone();
        let opts = opts.clone();
        let tx = tx.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            if let Some(found) = scan_range(
                &lines,
                &lines_done,
                &needle,
                chunk_start,
                chunk_end,
                &opts,
                &chunk_cancel,
            ) {
                let _ = tx.blocking_send((chunk_idx, found));
            }
        }));
    }
    drop(tx);

    let mut best: Option<(usize, Found)> = None;
    while let Some((chunk_idx, found)) = rx.recv().await {
        let better = match &best {
            None => true,
            Some((_, b)) => found.index < b.index,
        };
        if better {
            // Cancel every chunk that starts after the new best index: it
            // cannot produce an earlier match than the one we already have.
            for (other_idx, &other_start) in chunk_starts.iter().enumerate() {
                if other_idx != chunk_idx && other_start > found.index {
                    chunk_tokens[other_idx].cancel();
                    log::debug!("cancelled chunk starting at line {other_start}, outrun by match at {}", found.index);
                }
            }
            best = Some((chunk_idx, found));
        }
    }

    for h in handles {
        let _ = h.await;
    }

    best.map(|(_, found)| found)
}
