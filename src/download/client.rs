//! HTTP client wrapper for listing fetches, size checks and file transfers.
//!
//! This module provides the `HttpClient` struct which owns the shared
//! connection pool, applies the project User-Agent and timeouts, and streams
//! response bodies to disk through a temporary file that is atomically
//! renamed into place.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Method};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS, TEMP_FILE_SUFFIX};
use super::error::DownloadError;
use super::progress::{ProgressObserver, TransferProgress};
use crate::FileDescriptor;
use crate::user_agent;

/// HTTP client shared by every unit of a run.
///
/// Cloning is cheap: clones share the same connection pool, so one client is
/// created per run and handed to every worker.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Whole-request timeout: 30 minutes (for very large files)
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the TLS backend or system
    /// configuration cannot be initialised.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_timeouts(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::ClientBuild`] if the builder fails.
    pub fn with_timeouts(
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| DownloadError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Fetches a page and returns its body as text.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails, or the
    /// server answers with a non-success status.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let response = self
            .send_request(Method::GET, url, &CancellationToken::new())
            .await?;
        response
            .text()
            .await
            .map_err(|e| DownloadError::network(url, e))
    }

    /// Asks the server for the authoritative size of `url` with a HEAD request.
    ///
    /// Returns `Ok(None)` when the response carries no usable `Content-Length`.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` on network failure, non-success status, or
    /// cancellation.
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn remote_size(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<u64>, DownloadError> {
        let response = self.send_request(Method::HEAD, url, cancel).await?;
        let size = header_content_length(&response);
        debug!(?size, "remote size");
        Ok(size)
    }

    /// Downloads `file` to `final_path` through an adjacent temporary file.
    ///
    /// The body is streamed to `<final_path>.tmp` and to the observer's
    /// progress handle. Only after the whole body is written, synced and its
    /// length verified against `Content-Length` is the temporary file renamed
    /// to `final_path`. On any failure, including cancellation and the future
    /// being dropped, the temporary file is removed and `final_path` is left
    /// untouched.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request fails, the server returns a
    /// non-success status, writing or renaming fails, the body is shorter or
    /// longer than announced, or `cancel` fires.
    #[instrument(skip(self, file, cancel, observer), fields(url = %file.url, path = %final_path.display()))]
    pub async fn download_to_path(
        &self,
        file: &FileDescriptor,
        final_path: &Path,
        cancel: &CancellationToken,
        observer: &dyn ProgressObserver,
    ) -> Result<u64, DownloadError> {
        let response = self.send_request(Method::GET, &file.url, cancel).await?;
        let content_length = header_content_length(&response);

        let temp_path = temp_path_for(final_path);
        let mut guard = TempFileGuard::new(temp_path.clone());
        let output = File::create(&temp_path)
            .await
            .map_err(|e| DownloadError::io(temp_path.clone(), e))?;

        let progress = observer.begin_transfer(file, content_length);
        let result = write_and_publish(
            output,
            response,
            &file.url,
            &temp_path,
            final_path,
            content_length,
            cancel,
            progress.as_ref(),
        )
        .await;

        match result {
            Ok(bytes) => {
                guard.disarm();
                progress.finish();
                debug!(bytes, "download published");
                Ok(bytes)
            }
            Err(e) => {
                progress.abandon();
                debug!(path = %temp_path.display(), error = %e, "removing partial download");
                Err(e)
            }
        }
    }

    async fn send_request(
        &self,
        method: Method,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let request = self.client.request(method, url);
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::Cancelled),
            sent = request.send() => sent.map_err(|e| DownloadError::network(url, e))?,
        };

        if !response.status().is_success() {
            return Err(DownloadError::http_status(url, response.status().as_u16()));
        }

        Ok(response)
    }
}

/// Streams the body to the temporary file, verifies it and renames it into place.
#[allow(clippy::too_many_arguments)]
async fn write_and_publish(
    output: File,
    response: reqwest::Response,
    url: &str,
    temp_path: &Path,
    final_path: &Path,
    content_length: Option<u64>,
    cancel: &CancellationToken,
    progress: &dyn TransferProgress,
) -> Result<u64, DownloadError> {
    let bytes_written = stream_to_file(output, response, url, temp_path, cancel, progress).await?;

    if let Some(expected) = content_length
        && expected != bytes_written
    {
        return Err(DownloadError::integrity(temp_path, expected, bytes_written));
    }

    tokio::fs::rename(temp_path, final_path)
        .await
        .map_err(|e| DownloadError::io(final_path, e))?;

    Ok(bytes_written)
}

/// Streams response body to file, returning bytes written.
///
/// The file is flushed, synced and closed before returning so the caller can
/// rename it.
async fn stream_to_file(
    output: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    cancel: &CancellationToken,
    progress: &dyn TransferProgress,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(output);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DownloadError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk_result) = next else {
            break;
        };
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
        progress.advance(chunk.len() as u64);
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;
    let output = writer.into_inner();
    output
        .sync_all()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;
    drop(output);

    Ok(bytes_written)
}

/// Reads `Content-Length` from the headers.
///
/// The header is read directly because the body size hint of a HEAD response
/// is always empty.
fn header_content_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Temporary path used while downloading to `final_path`.
#[must_use]
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(TEMP_FILE_SUFFIX);
    final_path.with_file_name(name)
}

/// Removes the temporary file on drop unless the download was published.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
