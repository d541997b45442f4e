//! Download engine: the single entry point that turns an ordered list of
//! [`FileDescriptor`]s into files on disk.
//!
//! # Overview
//!
//! The engine runs every descriptor through the resume check and, when
//! needed, a retry-wrapped transfer. With a parallelism of 1 descriptors are
//! processed strictly in order and the first failure stops the run. With a
//! higher parallelism each descriptor becomes its own Tokio task admitted
//! through a semaphore; the first failure cancels everything still running
//! or waiting.
//!
//! # Example
//!
//! ```no_run
//! use myrient_dl::FileDescriptor;
//! use myrient_dl::download::{DownloadEngine, TransferConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let files = vec![FileDescriptor::new("a.zip", "https://example.com/files/a.zip", 0)];
//! let config = TransferConfig::new("./downloads").with_parallelism(4);
//! let summary = DownloadEngine::new(config)?
//!     .run(&files, &CancellationToken::new())
//!     .await?;
//! println!("completed {}, skipped {}", summary.completed, summary.skipped);
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod task;

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::progress::{NoProgress, ProgressObserver};
use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use super::{DownloadError, HttpClient};
use crate::FileDescriptor;

/// Minimum allowed parallelism value.
const MIN_PARALLELISM: usize = 1;

/// Maximum allowed parallelism value.
const MAX_PARALLELISM: usize = 100;

/// Default parallelism: one download at a time, in listing order.
pub const DEFAULT_PARALLELISM: usize = 1;

/// Error type for engine construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid parallelism value provided.
    #[error(
        "invalid parallelism value {value}: must be between {MIN_PARALLELISM} and {MAX_PARALLELISM}"
    )]
    InvalidParallelism {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Invalid attempt budget provided.
    #[error("invalid retry attempts value {value}: must be at least 1")]
    InvalidMaxAttempts {
        /// The invalid value that was provided.
        value: u32,
    },

    /// The shared HTTP client could not be created.
    #[error(transparent)]
    Client(#[from] DownloadError),
}

/// Per-run engine configuration. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Directory files are published to. Must exist before the run starts.
    pub output_dir: PathBuf,
    /// Maximum number of concurrent transfers.
    pub parallelism: usize,
    /// Attempts per descriptor, initial attempt included.
    pub max_attempts: u32,
    /// Report size mismatches of existing local files.
    pub verbose: bool,
}

impl TransferConfig {
    /// Creates a serial, non-verbose configuration with the default attempt budget.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            parallelism: DEFAULT_PARALLELISM,
            max_attempts: super::DEFAULT_MAX_ATTEMPTS,
            verbose: false,
        }
    }

    /// Sets the parallelism.
    #[must_use]
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sets the attempt budget per descriptor.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Enables verbose notices.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn validate(&self) -> Result<(), EngineError> {
        if !(MIN_PARALLELISM..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(EngineError::InvalidParallelism {
                value: self.parallelism,
            });
        }
        if self.max_attempts == 0 {
            return Err(EngineError::InvalidMaxAttempts {
                value: self.max_attempts,
            });
        }
        Ok(())
    }
}

/// What happened to one descriptor.
#[derive(Debug)]
pub enum TransferOutcome {
    /// The local copy already matched the remote size.
    Skipped,
    /// The file was downloaded and published.
    Completed {
        /// Bytes written.
        bytes: u64,
    },
    /// Every attempt failed.
    Failed(DownloadError),
    /// The unit stopped because the run was cancelled.
    Cancelled,
}

/// Counts for a run in which every descriptor succeeded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Descriptors downloaded during this run.
    pub completed: usize,
    /// Descriptors already present with the right size.
    pub skipped: usize,
}

impl RunSummary {
    /// Returns the number of descriptors processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.skipped
    }

    fn record(&mut self, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Skipped => self.skipped += 1,
            TransferOutcome::Completed { .. } => self.completed += 1,
            TransferOutcome::Failed(_) | TransferOutcome::Cancelled => {}
        }
    }
}

/// Run-level failure.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// At least one descriptor failed after all retries.
    ///
    /// Carries the first failure observed and how many other descriptors
    /// failed as well.
    #[error("failed to download {name}: {source}{}", additional_suffix(.additional))]
    Aggregate {
        /// Name of the first descriptor that failed.
        name: String,
        /// Its final error.
        #[source]
        source: DownloadError,
        /// Number of further failed descriptors.
        additional: usize,
    },

    /// The run was cancelled from outside before anything failed.
    #[error("download run cancelled")]
    Cancelled,
}

impl RunError {
    fn aggregate(name: impl Into<String>, source: DownloadError, additional: usize) -> Self {
        Self::Aggregate {
            name: name.into(),
            source,
            additional,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn additional_suffix(additional: &usize) -> String {
    if *additional == 0 {
        String::new()
    } else {
        format!(" (and {additional} other error(s))")
    }
}

/// Result of [`DownloadEngine::run`].
pub type RunResult = Result<RunSummary, RunError>;

/// Everything a unit of work needs, shared read-only between units.
struct TransferContext {
    client: HttpClient,
    output_dir: PathBuf,
    verbose: bool,
    retry_policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    observer: Arc<dyn ProgressObserver>,
}

/// Orchestrates one download run.
///
/// Built once per program run and consumed by [`run`](Self::run); it owns the
/// HTTP client used by every transfer of that run.
///
/// # Concurrency Model
///
/// - Serial mode (`parallelism == 1`) is a plain loop in input order
/// - Parallel mode spawns one Tokio task per descriptor
/// - A semaphore permit is acquired before a task starts its first attempt
/// - The first failure cancels a run-scoped child of the caller's token
pub struct DownloadEngine {
    client: HttpClient,
    config: TransferConfig,
    retry_policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    observer: Arc<dyn ProgressObserver>,
}

impl std::fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("config", &self.config)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl DownloadEngine {
    /// Creates an engine for `config` with a fresh HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParallelism`] if parallelism is outside
    /// 1-100, [`EngineError::InvalidMaxAttempts`] if it is 0, or
    /// [`EngineError::Client`] if the HTTP client cannot be built.
    #[instrument(level = "debug")]
    pub fn new(config: TransferConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let client = HttpClient::new()?;

        debug!(
            parallelism = config.parallelism,
            max_attempts = config.max_attempts,
            "creating download engine"
        );

        Ok(Self {
            client,
            retry_policy: RetryPolicy::with_max_attempts(config.max_attempts),
            config,
            sleeper: Arc::new(TokioSleeper),
            observer: Arc::new(NoProgress),
        })
    }

    /// Replaces the HTTP client (for custom timeouts).
    #[must_use]
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = client;
        self
    }

    /// Sets the observer that receives progress events.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces how backoff delays are waited out.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Downloads every descriptor in `files` into the configured directory.
    ///
    /// Cancelling `cancel` stops the run cooperatively: units waiting for a
    /// permit or a backoff never start another attempt, in-flight bodies are
    /// aborted and their temporary files removed.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Aggregate`] if any descriptor failed after all
    /// retries, or [`RunError::Cancelled`] if `cancel` stopped the run first.
    #[instrument(skip_all, fields(files = files.len(), parallelism = self.config.parallelism))]
    pub async fn run(self, files: &[FileDescriptor], cancel: &CancellationToken) -> RunResult {
        let parallelism = self.config.parallelism;
        let context = TransferContext {
            client: self.client,
            output_dir: self.config.output_dir,
            verbose: self.config.verbose,
            retry_policy: self.retry_policy,
            sleeper: self.sleeper,
            observer: self.observer,
        };

        info!(output_dir = %context.output_dir.display(), "starting download run");

        let result = if parallelism == 1 {
            run_serial(&context, files, cancel).await
        } else {
            coordinator::run_parallel(Arc::new(context), files, parallelism, cancel).await
        };

        match &result {
            Ok(summary) => info!(
                completed = summary.completed,
                skipped = summary.skipped,
                "download run complete"
            ),
            Err(error) => info!(error = %error, "download run failed"),
        }
        result
    }
}

/// Processes `files` one at a time in input order, stopping at the first failure.
async fn run_serial(
    context: &TransferContext,
    files: &[FileDescriptor],
    cancel: &CancellationToken,
) -> RunResult {
    let total = files.len();
    let mut summary = RunSummary::default();

    for (index, file) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        context.observer.on_start(file, index + 1, total);
        let outcome = task::transfer_with_retry(context, file, cancel).await;
        summary.record(&outcome);

        match outcome {
            TransferOutcome::Skipped | TransferOutcome::Completed { .. } => {}
            TransferOutcome::Cancelled => return Err(RunError::Cancelled),
            TransferOutcome::Failed(error) => {
                return Err(RunError::aggregate(file.name.clone(), error, 0));
            }
        }
    }

    Ok(summary)
}
