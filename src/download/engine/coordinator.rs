//! Parallel execution: one task per descriptor, admitted through a semaphore.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use super::{RunError, RunResult, RunSummary, TransferContext, TransferOutcome, task};
use crate::FileDescriptor;
use crate::download::DownloadError;
use crate::download::progress::ProgressCounter;

/// Runs `files` with at most `parallelism` transfers in flight.
///
/// The first failed unit cancels a child of `cancel`, which stops units
/// waiting for a permit or a backoff and aborts in-flight bodies. The run
/// still waits for every task before reporting.
#[instrument(skip_all, fields(files = files.len(), parallelism = parallelism))]
pub(super) async fn run_parallel(
    context: Arc<TransferContext>,
    files: &[FileDescriptor],
    parallelism: usize,
    cancel: &CancellationToken,
) -> RunResult {
    let run_cancel = cancel.child_token();
    let gate = Arc::new(Semaphore::new(parallelism));
    let counter = Arc::new(ProgressCounter::new(files.len()));

    let mut units = JoinSet::new();
    let mut names = HashMap::with_capacity(files.len());

    for file in files.iter().cloned() {
        let context = Arc::clone(&context);
        let gate = Arc::clone(&gate);
        let counter = Arc::clone(&counter);
        let run_cancel = run_cancel.clone();
        let name = file.name.clone();

        let handle = units.spawn(async move {
            run_unit(&context, &file, &gate, &counter, &run_cancel).await
        });
        names.insert(handle.id(), name);
    }

    let mut summary = RunSummary::default();
    let mut first_failure: Option<(String, DownloadError)> = None;
    let mut additional = 0usize;
    let mut cancelled = false;

    while let Some(joined) = units.join_next_with_id().await {
        let (name, outcome) = match joined {
            Ok((id, outcome)) => (names.remove(&id).unwrap_or_default(), outcome),
            Err(join_error) => {
                let name = names.remove(&join_error.id()).unwrap_or_default();
                error!(name = %name, error = %join_error, "download task panicked");
                run_cancel.cancel();
                let message = join_error.to_string();
                (name, TransferOutcome::Failed(DownloadError::TaskPanicked { message }))
            }
        };

        summary.record(&outcome);
        match outcome {
            TransferOutcome::Skipped | TransferOutcome::Completed { .. } => {}
            TransferOutcome::Cancelled => cancelled = true,
            TransferOutcome::Failed(error) => {
                if first_failure.is_none() {
                    first_failure = Some((name, error));
                } else {
                    additional += 1;
                }
            }
        }
    }

    if let Some((name, source)) = first_failure {
        return Err(RunError::aggregate(name, source, additional));
    }
    if cancelled {
        return Err(RunError::Cancelled);
    }
    Ok(summary)
}

/// Waits for admission, then processes one descriptor.
///
/// The permit is held until after a failure has cancelled the run, so no
/// waiting unit can be admitted in between.
async fn run_unit(
    context: &TransferContext,
    file: &FileDescriptor,
    gate: &Semaphore,
    counter: &ProgressCounter,
    cancel: &CancellationToken,
) -> TransferOutcome {
    let _permit = tokio::select! {
        biased;
        () = cancel.cancelled() => return TransferOutcome::Cancelled,
        permit = gate.acquire() => match permit {
            Ok(permit) => permit,
            // The gate is never closed while units are running.
            Err(_closed) => return TransferOutcome::Cancelled,
        },
    };

    context
        .observer
        .on_start(file, counter.current(), counter.total());

    let outcome = task::transfer_with_retry(context, file, cancel).await;
    match &outcome {
        TransferOutcome::Skipped | TransferOutcome::Completed { .. } => counter.record_completed(),
        TransferOutcome::Failed(_) => {
            debug!(name = %file.name, "cancelling remaining downloads");
            cancel.cancel();
        }
        TransferOutcome::Cancelled => {}
    }
    outcome
}
