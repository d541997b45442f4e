//! Pre-flight resume check.
//!
//! Decides whether a descriptor still needs to be downloaded by comparing the
//! length of any local copy with the authoritative length reported by a HEAD
//! request. Only byte length is compared: a corrupted file of the right size
//! is accepted as already downloaded.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::{DownloadError, HttpClient};
use crate::FileDescriptor;

/// Result of the resume check for one descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// The local file already has the remote size; nothing to transfer.
    Skip {
        /// Size shared by the local and remote copies.
        size: u64,
    },
    /// The file must be (re)transferred.
    Transfer {
        /// Authoritative remote size, when the server reported one.
        remote_size: Option<u64>,
        /// Size of an existing local file that will be replaced.
        local_size: Option<u64>,
    },
}

impl ResumeDecision {
    /// Returns true if the local size differs from a known remote size.
    #[must_use]
    pub fn is_size_mismatch(&self) -> bool {
        matches!(
            self,
            Self::Transfer {
                remote_size: Some(_),
                local_size: Some(_),
            }
        )
    }
}

/// Pure comparison behind [`check`].
///
/// A missing remote size never matches, so the file is transferred again.
#[must_use]
pub fn decide(local_size: Option<u64>, remote_size: Option<u64>) -> ResumeDecision {
    match (local_size, remote_size) {
        (Some(local), Some(remote)) if local == remote => ResumeDecision::Skip { size: local },
        _ => ResumeDecision::Transfer {
            remote_size,
            local_size,
        },
    }
}

/// Runs the resume check for `file` against `output_path`.
///
/// # Errors
///
/// Returns [`DownloadError::ResumeCheck`] if the HEAD request fails, or
/// [`DownloadError::Cancelled`] if `cancel` fires while waiting for it.
#[instrument(skip(client, file, cancel), fields(name = %file.name))]
pub async fn check(
    client: &HttpClient,
    file: &FileDescriptor,
    output_path: &Path,
    cancel: &CancellationToken,
) -> Result<ResumeDecision, DownloadError> {
    let remote_size = match client.remote_size(&file.url, cancel).await {
        Ok(size) => size,
        Err(DownloadError::Cancelled) => return Err(DownloadError::Cancelled),
        Err(e) => return Err(DownloadError::resume_check(e)),
    };

    let local_size = match tokio::fs::metadata(output_path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    };

    let decision = decide(local_size, remote_size);
    debug!(?local_size, ?remote_size, ?decision, "resume check");
    Ok(decision)
}
