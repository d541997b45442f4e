//! One unit of work: resume check, then a retry-wrapped transfer.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::{TransferContext, TransferOutcome};
use crate::FileDescriptor;
use crate::download::DownloadError;
use crate::download::resume::{self, ResumeDecision};
use crate::download::retry::run_with_retry;

/// Result of one successful attempt.
enum AttemptResult {
    Skipped,
    Completed(u64),
}

/// Runs every attempt the retry policy allows for `file`.
///
/// Each attempt repeats the resume check, so a file completed by an earlier
/// attempt that failed late is recognised and skipped. A name that would
/// escape the output directory fails without any request.
#[instrument(skip_all, fields(name = %file.name))]
pub(super) async fn transfer_with_retry(
    context: &TransferContext,
    file: &FileDescriptor,
    cancel: &CancellationToken,
) -> TransferOutcome {
    let output_path = match file.output_path(&context.output_dir) {
        Ok(path) => path,
        Err(error) => {
            warn!(error = %error, "refusing to download");
            return TransferOutcome::Failed(error);
        }
    };

    let result = run_with_retry(
        &context.retry_policy,
        context.sleeper.as_ref(),
        cancel,
        |attempt, delay, error| {
            warn!(
                name = %file.name,
                attempt,
                delay_ms = delay.as_millis(),
                error = %error,
                "download attempt failed, retrying"
            );
            context.observer.on_retry(file, attempt, delay, error);
        },
        |_attempt| attempt_once(context, file, &output_path, cancel),
    )
    .await;

    match result {
        Ok(AttemptResult::Skipped) => TransferOutcome::Skipped,
        Ok(AttemptResult::Completed(bytes)) => TransferOutcome::Completed { bytes },
        Err(DownloadError::Cancelled) => {
            debug!("download cancelled");
            TransferOutcome::Cancelled
        }
        Err(error) => {
            warn!(error = %error, "download failed");
            TransferOutcome::Failed(error)
        }
    }
}

async fn attempt_once(
    context: &TransferContext,
    file: &FileDescriptor,
    output_path: &Path,
    cancel: &CancellationToken,
) -> Result<AttemptResult, DownloadError> {
    match resume::check(&context.client, file, output_path, cancel).await? {
        ResumeDecision::Skip { size } => {
            info!(size, "already downloaded, skipping");
            context.observer.on_skip(file);
            Ok(AttemptResult::Skipped)
        }
        ResumeDecision::Transfer {
            remote_size,
            local_size,
        } => {
            if let (Some(local), Some(remote)) = (local_size, remote_size) {
                debug!(local, remote, "local size differs, downloading again");
                if context.verbose {
                    context.observer.on_size_mismatch(file, local, remote);
                }
            }

            let bytes = context
                .client
                .download_to_path(file, output_path, cancel, context.observer.as_ref())
                .await?;
            info!(bytes, "download complete");
            Ok(AttemptResult::Completed(bytes))
        }
    }
}
