//! The `myrient-dl` run: listing, filtering and downloading.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use myrient_dl::download::{NoProgress, ProgressObserver};
use myrient_dl::{
    DownloadEngine, HttpClient, PatternFilter, RunError, TransferConfig, fetch_listing,
    total_expected_size,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::ProcessExit;
use crate::app::{progress::TerminalProgress, terminal};
use crate::cli::Args;
use crate::output::{self, Console};

pub(crate) async fn run_downloader(args: Args) -> Result<ProcessExit> {
    let target = Url::parse(&args.url).with_context(|| format!("invalid URL: {}", args.url))?;
    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| output::default_output_dir(&target));
    let verbose = args.verbose > 0;
    let console = Console::new(args.quiet);

    if verbose {
        console.say(format!("Target URL: {target}"));
        console.say(format!("Output directory: {}", output_dir.display()));
        console.say(format!("Include patterns: {}", display_patterns(&args.include, "*")));
        if !args.exclude.is_empty() {
            console.say(format!("Exclude patterns: {}", display_patterns(&args.exclude, "")));
        }
        console.say(format!("Parallel downloads: {}", args.parallel));
        console.say(format!("Attempts per file: {}", args.retry));
        console.say("");
    }

    console.say("Fetching directory listing...");
    let client = HttpClient::new()?;
    let files = fetch_listing(&client, target.as_str()).await?;

    if files.is_empty() {
        bail!("no files found in directory listing");
    }
    if verbose {
        console.say(format!("Found {} files", files.len()));
    }

    let filter = PatternFilter::new(&args.include, &args.exclude);
    let matched = filter.apply(files);

    if matched.is_empty() {
        console.say("No files match the specified patterns");
        return Ok(ProcessExit::Success);
    }

    console.say(format!(
        "\nMatched {} files (total size: {})",
        matched.len(),
        output::format_bytes(total_expected_size(&matched))
    ));

    if args.dry_run {
        println!("\nFiles to download (dry-run mode):");
        for line in output::dry_run_lines(&matched) {
            println!("{line}");
        }
        return Ok(ProcessExit::Success);
    }

    tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
        anyhow!(
            "failed to create output directory {}: {e}",
            output_dir.display()
        )
    })?;
    debug!(dir = %output_dir.display(), "output directory ready");

    console.say("\nStarting downloads...");

    let config = TransferConfig::new(&output_dir)
        .with_parallelism(usize::from(args.parallel))
        .with_max_attempts(u32::from(args.retry))
        .with_verbose(verbose);

    let observer: Arc<dyn ProgressObserver> = if args.quiet {
        Arc::new(NoProgress)
    } else {
        let draw_bars = terminal::should_use_progress_bars(
            io::stderr().is_terminal(),
            args.quiet,
            terminal::is_dumb_terminal(),
        );
        Arc::new(TerminalProgress::new(draw_bars))
    };

    let engine = DownloadEngine::new(config)?
        .with_client(client)
        .with_observer(observer);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    match engine.run(&matched, &cancel).await {
        Ok(summary) => {
            info!(
                completed = summary.completed,
                skipped = summary.skipped,
                "downloads complete"
            );
            console.say("\n✓ All downloads completed!");
            Ok(ProcessExit::Success)
        }
        Err(RunError::Cancelled) => {
            warn!("interrupted");
            eprintln!("\nInterrupted. Run again to resume.");
            Ok(ProcessExit::Interrupted)
        }
        Err(error) => Err(anyhow!("download failed: {error}")),
    }
}

fn display_patterns(patterns: &[String], when_empty: &str) -> String {
    if patterns.is_empty() {
        when_empty.to_string()
    } else {
        patterns.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_patterns() {
        assert_eq!(display_patterns(&[], "*"), "*");
        assert_eq!(
            display_patterns(&["*.zip".to_string(), "*(USA)*".to_string()], "*"),
            "*.zip *(USA)*"
        );
    }
}
