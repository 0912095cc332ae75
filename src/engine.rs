//! Orchestrator: loads every input file, runs one task per subject
//! file gated by a semaphore sized to the host's parallelism, streams
//! similarities through a single-consumer deduplicator, and reports
//! per-file progress with an ETA.
//!
//! Built on an index -> compare -> export pipeline shape, using
//! `tokio::sync::Semaphore` and `mpsc` channels so cancellation and
//! streaming compose cleanly.

use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::driver;
use crate::error::Result;
use crate::line::Line;
use crate::occurrence::{LoadedFile, Similarity, WorkingState};
use crate::options::Options;
use crate::reader;

/// One input to a run: an opaque name and a byte stream read to EOF once.
pub struct InputFile {
    pub name: String,
    pub reader: Box<dyn Read + Send>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        InputFile {
            name: name.into(),
            reader: Box::new(reader),
        }
    }
}

/// Per-file completion progress, with ETA extrapolated from wall time
/// elapsed so far scaled by the remaining file count.
#[derive(Debug, Clone)]
pub struct Progress {
    pub file: String,
    pub done: usize,
    pub total: usize,
    pub eta: Option<std::time::Duration>,
}

/// Receivers driving the two output streams of a run. Both close once every
/// subject file has completed or the run was cancelled.
pub struct RunHandles {
    pub similarities: mpsc::Receiver<Similarity>,
    pub progress: mpsc::Receiver<Progress>,
}

/// Runs the engine over `files`. Must be called from inside a tokio runtime
/// (the CLI front-end drives it under `#[tokio::main]`). Loading and regex
/// compilation happen synchronously before any task is spawned -- a load
/// failure is all-or-nothing.
pub async fn similarities(
    files: Vec<InputFile>,
    opts: Options,
    cancel: CancellationToken,
) -> Result<RunHandles> {
    let compiled = Arc::new(opts.compile()?);
    let loaded = load_files(files, &compiled)?;
    let loaded = Arc::new(loaded);

    let total = loaded.len();
    log::info!("loaded {total} files");
    let (raw_tx, raw_rx) = mpsc::channel::<Similarity>(64);
    let (sim_tx, sim_rx) = mpsc::channel::<Similarity>(64);
    let (progress_tx, progress_rx) = mpsc::channel::<Progress>(total.max(1));

    tokio::spawn(dedup_stage(raw_rx, sim_tx));

    let permits = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        + 2;
    let semaphore = Arc::new(Semaphore::new(permits));
    let done = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let started = Instant::now();
    let handle = Handle::current();

    for subject_id in 0..total {
        let loaded = Arc::clone(&loaded);
        let compiled = Arc::clone(&compiled);
        let cancel = cancel.clone();
        let semaphore = Arc::clone(&semaphore);
        let raw_tx = raw_tx.clone();
        let progress_tx = progress_tx.clone();
        let done = Arc::clone(&done);
        let handle_for_spawn = handle.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(p) => p,
                Err(_) => return,
            };
            if cancel.is_cancelled() {
                return;
            }

            let loaded_for_blocking = Arc::clone(&loaded);
            let compiled_for_blocking = Arc::clone(&compiled);
            let cancel_for_blocking = cancel.clone();
            let name = loaded[subject_id].name.clone();

            let result = tokio::task::spawn_blocking(move || {
                let mut subject = WorkingState::new(subject_id, &loaded_for_blocking);
                driver::file_similarities(
                    &handle_for_spawn,
                    &mut subject,
                    &loaded_for_blocking,
                    &compiled_for_blocking,
                    &cancel_for_blocking,
                )
            })
            .await;

            if let Ok(sims) = result {
                for sim in sims {
                    if raw_tx.send(sim).await.is_err() {
                        break;
                    }
                }
            }

            let n = done.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
            let elapsed = started.elapsed();
            let eta = if n > 0 {
                let per_file = elapsed / n as u32;
                Some(per_file * (total.saturating_sub(n)) as u32)
            } else {
                None
            };
            let _ = progress_tx
                .send(Progress {
                    file: name,
                    done: n,
                    total,
                    eta,
                })
                .await;
        });
    }
    drop(raw_tx);
    drop(progress_tx);

    Ok(RunHandles {
        similarities: sim_rx,
        progress: progress_rx,
    })
}

/// Single-consumer dedup: two similarities whose occurrence sets are equal
/// after sorting collapse to one; order of arrival across subject tasks is
/// otherwise irrelevant.
async fn dedup_stage(mut raw_rx: mpsc::Receiver<Similarity>, sim_tx: mpsc::Sender<Similarity>) {
    let mut seen = HashSet::new();
    while let Some(sim) = raw_rx.recv().await {
        let key = sim.dedup_key();
        if seen.insert(key) {
            if sim_tx.send(sim).await.is_err() {
                break;
            }
        } else {
            log::debug!("dedup: dropped a duplicate similarity already reported");
        }
    }
}

fn load_files(files: Vec<InputFile>, opts: &crate::options::CompiledOptions) -> Result<Vec<LoadedFile>> {
    files
        .into_iter()
        .map(|f| {
            let raw_lines = reader::read_lines(&f.name, f.reader)?;
            if raw_lines.is_empty() {
                log::warn!("{}: file has no lines", f.name);
            }
            let lines: Vec<Line> = raw_lines
                .into_iter()
                .map(|text| {
                    Line::new(
                        text,
                        opts.ignore_line_re.as_ref(),
                        opts.always_different_re.as_ref(),
                        opts.ignore_whitespace,
                    )
                })
                .collect();
            Ok(LoadedFile {
                name: f.name,
                lines: Arc::new(lines),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalence::Level;
    use std::collections::HashSet;
    use std::io::Cursor;

    async fn run(files: Vec<(&str, &str)>, opts: Options) -> Vec<Similarity> {
        let inputs = files
            .into_iter()
            .map(|(name, text)| InputFile::new(name, Cursor::new(text.as_bytes().to_vec())))
            .collect();
        let mut handles = similarities(inputs, opts, CancellationToken::new())
            .await
            .unwrap();
        let mut out = Vec::new();
        while let Some(sim) = handles.similarities.recv().await {
            out.push(sim);
        }
        while handles.progress.recv().await.is_some() {}
        out
    }

    #[tokio::test]
    async fn equal_block_and_edited_block() {
        let f1 = "aaaa\nbbbb\ncccc\nxxxx\ncccc\n";
        let f2 = "aaaa\nbbbb\n  cccc  \ndddd\ncccXc\n";
        let opts = Options::new(2);
        let sims = run(vec![("f1", f1), ("f2", f2)], opts).await;

        assert_eq!(sims.len(), 2);
        assert!(sims
            .iter()
            .any(|s| s.level == Level::Equal && s.occurrences.len() == 2));
        assert!(sims
            .iter()
            .any(|s| s.level == Level::Similar && s.occurrences.len() == 2));
    }

    #[tokio::test]
    async fn ignore_whitespace_merges_trailing_block() {
        let f1 = "aaaa\nbbbb\ncccc\nxxxx\ncccc\n";
        let f2 = "aaaa\nbbbb\n  cccc  \ndddd\ncccXc\n";
        let opts = Options::new(2).with_ignore_whitespace(true);
        let sims = run(vec![("f1", f1), ("f2", f2)], opts).await;

        let equal: Vec<_> = sims.iter().filter(|s| s.level == Level::Equal).collect();
        assert_eq!(equal.len(), 1);
        assert_eq!(equal[0].occurrences[0].end - equal[0].occurrences[0].start, 3);
    }

    #[tokio::test]
    async fn ignore_blank_lines_skips_but_still_counts_indices() {
        let f1 = "xxxx\naaaa\nbbbb\n";
        let f2 = "yyyy\nzzzz\naaaa\n\nbbbb\n";
        let opts = Options::new(5).with_ignore_blank_lines(true);
        let sims = run(vec![("f1", f1), ("f2", f2)], opts).await;

        assert_eq!(sims.len(), 1);
        let occs: HashSet<(usize, usize, usize)> = sims[0]
            .occurrences
            .iter()
            .map(|o| (o.file, o.start, o.end))
            .collect();
        assert!(occs.contains(&(0, 1, 3)));
        assert!(occs.contains(&(1, 2, 5)));
    }

    #[tokio::test]
    async fn ignore_line_regex_bridges_over_filtered_lines() {
        let f1 = "aaaa\nfoo\nbbbb\ncccc\n";
        let f2 = "aaaa\nbbbb\nbar\ncccc\n";
        let opts = Options::new(5).with_ignore_line_regex("foo|bar");
        let sims = run(vec![("f1", f1), ("f2", f2)], opts).await;

        assert_eq!(sims.len(), 1);
        assert_eq!(sims[0].level, Level::Equal);
        assert_eq!(sims[0].occurrences[0].end - sims[0].occurrences[0].start, 4);
    }

    #[tokio::test]
    async fn always_different_regex_terminates_expansion() {
        let text = "aaaa\nfoo\nbbbb\ncccc\n";
        let opts = Options::new(5).with_always_different_regex("foo");
        let sims = run(vec![("f", text)], opts).await;

        assert_eq!(sims.len(), 2);
        assert!(sims.iter().all(|s| s.level == Level::Equal));
    }

    #[tokio::test]
    async fn self_similarity_finds_three_occurrences() {
        let text = "aaaa\nbbbb\ncccc\naaaa\nbbbb\nxxxx\naaaa\nbbbb\n";
        let opts = Options::new(5);
        let sims = run(vec![("f", text)], opts).await;

        assert_eq!(sims.len(), 1);
        assert_eq!(sims[0].occurrences.len(), 3);
        assert_eq!(sims[0].level, Level::Equal);
    }

    #[tokio::test]
    async fn min_similar_lines_discards_short_seeds() {
        let f1 = "aaaa\nbbbb\n";
        let f2 = "xxxx\naaaa\nyyyy\n";
        let opts = Options::new(5).with_min_similar_lines(2);
        let sims = run(vec![("f1", f1), ("f2", f2)], opts).await;
        assert!(sims.is_empty());
    }

    #[tokio::test]
    async fn emitted_similarities_have_unique_dedup_keys() {
        let f1 = "aaaa\nbbbb\ncccc\n";
        let f2 = "aaaa\nbbbb\ncccc\n";
        let f3 = "aaaa\nbbbb\ncccc\n";
        let opts = Options::new(5);
        let sims = run(vec![("f1", f1), ("f2", f2), ("f3", f3)], opts).await;

        let keys: HashSet<_> = sims.iter().map(|s| s.dedup_key()).collect();
        assert_eq!(keys.len(), sims.len());
        for s in &sims {
            assert!(s.occurrences.len() >= 2);
        }
    }

    #[tokio::test]
    async fn single_file_run_is_deterministic_across_repeats() {
        let text = "aaaa\nbbbb\ncccc\naaaa\nbbbb\nxxxx\naaaa\nbbbb\n";
        let opts = Options::new(5);
        let first = run(vec![("f", text)], opts.clone()).await;
        let second = run(vec![("f", text)], opts).await;

        let mut first_keys: Vec<_> = first.iter().map(|s| s.dedup_key()).collect();
        let mut second_keys: Vec<_> = second.iter().map(|s| s.dedup_key()).collect();
        first_keys.sort();
        second_keys.sort();
        assert_eq!(first_keys, second_keys);
    }
}
