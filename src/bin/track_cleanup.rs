//! track_cleanup: command line front end for the cleanup engine
//!
//! Reads a board JSON file, runs the selected cleanup phases and prints the
//! resulting records as JSON. The cleaned board is written only when
//! `--output` is given.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use track_cleanup::board::{Board, BoardCommit};
use track_cleanup::cleanup::{CleanupOptions, TracingReporter, TracksCleaner};
use track_cleanup::config::Config;

/// Remove redundant, shorting and dangling copper from a board and merge
/// collinear segments.
#[derive(Parser, Debug)]
#[command(name = "track_cleanup")]
#[command(version, about, long_about = None)]
struct Args {
    /// Board JSON file
    #[arg(value_name = "BOARD")]
    board: PathBuf,

    /// Configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Report what would be cleaned without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Write the cleaned board here
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write the records here instead of stdout
    #[arg(long, value_name = "FILE")]
    records: Option<PathBuf>,

    /// Keep tracks and vias that short different nets
    #[arg(long)]
    keep_shorts: bool,

    /// Keep redundant vias
    #[arg(long)]
    no_via_cleanup: bool,

    /// Do not merge collinear segments
    #[arg(long)]
    no_merge: bool,

    /// Keep tracks with an unconnected end
    #[arg(long)]
    keep_dangling_tracks: bool,

    /// Keep tracks lying inside pads
    #[arg(long)]
    keep_tracks_in_pads: bool,

    /// Keep vias connected on fewer than two sides
    #[arg(long)]
    keep_dangling_vias: bool,

    /// Segments per merge search task
    #[arg(long)]
    block_size: Option<usize>,

    /// Dedicated worker threads
    #[arg(long)]
    threads: Option<usize>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Apply command line overrides on top of the configuration file
    fn apply(&self, config: &mut Config) {
        let options: &mut CleanupOptions = &mut config.options;
        options.remove_misconnected &= !self.keep_shorts;
        options.clean_vias &= !self.no_via_cleanup;
        options.merge_segments &= !self.no_merge;
        options.delete_unconnected_tracks &= !self.keep_dangling_tracks;
        options.delete_tracks_in_pads &= !self.keep_tracks_in_pads;
        options.delete_dangling_vias &= !self.keep_dangling_vias;

        config.dry_run |= self.dry_run;
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
    }
}

fn log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        },
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_board(path: &Path) -> Result<Board> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read board file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse board file {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => Config::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid settings")?;

    init_tracing(log_level(args.verbose, args.quiet, &config.logging.level));

    let mut board = load_board(&args.board)?;
    info!(
        "[Cleanup] Loaded {}: {} tracks, {} pads",
        args.board.display(),
        board.track_count(),
        board.pad_count()
    );

    let pool = config.worker_pool().context("Failed to set up worker pool")?;
    let mut records = Vec::new();
    let mut commit = BoardCommit::new(&board);
    let mut reporter = TracingReporter;

    let outcome = TracksCleaner::new(&mut board).with_pool(pool).cleanup_board_with_commit(
        config.dry_run,
        &mut records,
        &config.options,
        &mut commit,
        Some(&mut reporter),
    );

    // Records found before a failure are still worth reporting
    let json = serde_json::to_string_pretty(&records).context("Failed to serialize records")?;
    match &args.records {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write records to {}", path.display()))?,
        None => println!("{}", json),
    }

    let summary = outcome.context("Cleanup failed")?;
    for (kind, count) in &summary.records_by_kind {
        info!("[Cleanup] {:>4}  {}", count, kind.description());
    }

    if !config.dry_run {
        info!(
            "[Cleanup] {} items modified, {} removed",
            commit.modified_count(),
            commit.removed_count()
        );
    }

    match &args.output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&board).context("Failed to serialize board")?;
            fs::write(path, json)
                .with_context(|| format!("Failed to write board to {}", path.display()))?;
            info!("[Cleanup] Wrote {}", path.display());
        }
        None if !config.dry_run && !commit.is_empty() => {
            warn!("[Cleanup] No --output given; cleaned board was not saved");
        }
        None => {}
    }

    Ok(())
}
