//! CLI entry point for the myrient-dl tool.

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

mod app;
mod cli;
mod output;

use cli::Args;

/// Exit code for a run stopped by Ctrl-C (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: u8 = 130;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
    Interrupted,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Interrupted => INTERRUPTED_EXIT_CODE,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    app::terminal::init_tracing(app::terminal::resolve_default_log_level(
        args.quiet,
        args.verbose,
    ));
    debug!(?args, "CLI arguments parsed");

    match app::runtime::run_downloader(args).await {
        Ok(exit) => exit.into(),
        Err(error) => {
            eprintln!("Error: {error}");
            ProcessExit::Failure.into()
        }
    }
}
