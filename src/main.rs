//! simuncover - CLI front-end
//!
//! A thin wrapper around the `simuncover` engine: parses flags into
//! [`simuncover::Options`], opens each input path, drives the engine to
//! completion, and prints each reported similarity. Directory walking, glob
//! expansion, external diff-tool invocation, and rich report formatting are
//! all out of scope here by design.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use tokio_util::sync::CancellationToken;

use simuncover::{InputFile, Level, Options, Similarity};

/// Detects copy-pasted and lightly-modified line ranges across a set of files.
#[derive(Parser)]
#[command(name = "simuncover")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Files to compare (every file is compared against every other,
    /// including itself, for self-similarity).
    files: Vec<PathBuf>,

    /// Render a progress bar while the run is in flight.
    #[arg(long)]
    progress: bool,

    /// Also print similarities at the Equal level.
    #[arg(long)]
    print_equal: bool,

    /// Ignore leading/trailing whitespace when comparing lines.
    #[arg(long)]
    ignore_ws: bool,

    /// Treat blank lines as invisible for matching purposes.
    #[arg(long)]
    ignore_blank: bool,

    /// Minimum line length (in code points) to be eligible as a seed or
    /// expansion candidate.
    #[arg(long, default_value = "0")]
    min_len: usize,

    /// Minimum number of lines a similarity's seed occurrence must span.
    #[arg(long, default_value = "0")]
    min_lines: usize,

    /// Maximum Levenshtein distance at which two non-equal lines still
    /// count as Similar.
    #[arg(long, default_value = "5")]
    max_dist: i64,

    /// Lines matching this regex are skipped entirely.
    #[arg(long)]
    ignore_re: Option<String>,

    /// Lines matching this regex are always classified Different.
    #[arg(long)]
    always_different_re: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut opts = Options::new(cli.max_dist)
        .with_ignore_whitespace(cli.ignore_ws)
        .with_ignore_blank_lines(cli.ignore_blank)
        .with_min_line_length(cli.min_len)
        .with_min_similar_lines(cli.min_lines);
    if let Some(pattern) = cli.ignore_re {
        opts = opts.with_ignore_line_regex(pattern);
    }
    if let Some(pattern) = cli.always_different_re {
        opts = opts.with_always_different_regex(pattern);
    }

    let mut files = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        files.push(InputFile::new(path.display().to_string(), f));
    }
    let total = files.len();
    info!("loaded {total} files");

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
        });
    }

    let run = simuncover::similarities(files, opts, cancel.clone()).await?;
    let mut progress_rx = run.progress;
    let mut sim_rx = run.similarities;

    let bar = if cli.progress {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .expect("invalid progress bar template")
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_task = tokio::spawn(async move {
        while let Some(p) = progress_rx.recv().await {
            if let Some(pb) = &bar {
                pb.set_position(p.done as u64);
            }
            info!("{}/{} files done ({})", p.done, p.total, p.file);
        }
        if let Some(pb) = bar {
            pb.finish_with_message("done");
        }
    });

    let mut printed = 0usize;
    while let Some(sim) = sim_rx.recv().await {
        if sim.level == Level::Equal && !cli.print_equal {
            continue;
        }
        print_similarity(&sim, &cli.files);
        printed += 1;
    }
    let _ = progress_task.await;

    if cancel.is_cancelled() {
        eprintln!("cancelled");
        std::process::exit(1);
    }

    info!("printed {printed} similarities");
    Ok(())
}

fn print_similarity(sim: &Similarity, files: &[PathBuf]) {
    let level = match sim.level {
        Level::Equal => "equal",
        Level::Similar => "similar",
        Level::Different => unreachable!("a Different similarity is never emitted"),
    };
    let ranges: Vec<String> = sim
        .occurrences
        .iter()
        .map(|o| format!("{}:{}-{}", files[o.file].display(), o.start + 1, o.end))
        .collect();
    println!("{level}: {}", ranges.join(" <-> "));
}
