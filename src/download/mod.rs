//! HTTP download engine for streaming listed files to disk.
//!
//! This module turns [`FileDescriptor`](crate::FileDescriptor)s into files in
//! an output directory, with bounded parallelism and per-file retries.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for multi-gigabyte files)
//! - Size-based resume check: files already on disk with the remote size are skipped
//! - Atomic publish through `<name>.tmp` and a rename
//! - Exponential backoff with jitter between attempts
//! - Cooperative cancellation through a [`CancellationToken`](tokio_util::sync::CancellationToken)
//!
//! # Example
//!
//! ```no_run
//! use myrient_dl::FileDescriptor;
//! use myrient_dl::download::{DownloadEngine, TransferConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let files = vec![FileDescriptor::new(
//!     "Game.zip",
//!     "https://myrient.erista.me/files/No-Intro/Game.zip",
//!     1024,
//! )];
//! let engine = DownloadEngine::new(TransferConfig::new("./downloads"))?;
//! engine.run(&files, &CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod engine;
mod error;
pub mod progress;
pub mod resume;
pub mod retry;

pub use client::{HttpClient, temp_path_for};
pub use engine::{
    DEFAULT_PARALLELISM, DownloadEngine, EngineError, RunError, RunResult, RunSummary,
    TransferConfig, TransferOutcome,
};
pub use error::DownloadError;
pub use progress::{NoProgress, ProgressObserver, TransferProgress};
pub use retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy, Sleeper, TokioSleeper};

// Note: we do NOT define module-local Result aliases besides `RunResult`.
// Use `Result<T, DownloadError>` explicitly in function signatures.
