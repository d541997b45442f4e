//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use myrient_dl::{DEFAULT_MAX_ATTEMPTS, DEFAULT_PARALLELISM};

/// Download files from Myrient directory listings.
///
/// Fetches an Apache-style directory listing, keeps the files matching the
/// include/exclude patterns and downloads them with optional parallelism,
/// retries and progress bars. Files already present with the right size are
/// skipped, so an interrupted run can simply be started again.
#[derive(Parser, Debug)]
#[command(name = "myrient-dl")]
#[command(author, version, about)]
pub struct Args {
    /// Directory listing URL
    pub url: String,

    /// Output directory (defaults to the last path component of the URL)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Include pattern, glob syntax (repeatable; default: all files)
    #[arg(short, long, value_name = "GLOB")]
    pub include: Vec<String>,

    /// Exclude pattern, glob syntax (repeatable)
    #[arg(short, long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Number of parallel downloads (1-100)
    #[arg(short, long, default_value_t = DEFAULT_PARALLELISM as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub parallel: u8,

    /// Attempts per file, including the first one (1-20)
    #[arg(short, long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=20))]
    pub retry: u8,

    /// Show what would be downloaded without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
