//! Error types for the download module.
//!
//! This module defines structured errors for all per-file download
//! operations, providing context-rich error messages for debugging and user
//! feedback.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while checking or downloading a single file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (anything outside 2xx).
    #[error("server returned status {status} for {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create file, write, rename, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The descriptor name would resolve outside the output directory.
    #[error("refusing unsafe file name {name:?}: must be a plain file name")]
    UnsafeName {
        /// The rejected name.
        name: String,
    },

    /// Downloaded body size does not match the response content length.
    #[error(
        "integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    Integrity {
        /// Temporary path that failed verification.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },

    /// The metadata (HEAD) request used for the resume check failed.
    #[error("failed to get file size: {source}")]
    ResumeCheck {
        /// The failure reported by the HEAD request.
        #[source]
        source: Box<DownloadError>,
    },

    /// Every attempt allowed by the retry policy failed.
    #[error("failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// The failure of the last attempt.
        #[source]
        source: Box<DownloadError>,
    },

    /// The attempt was stopped because the run was cancelled.
    #[error("download cancelled")]
    Cancelled,

    /// The worker task running this download panicked.
    #[error("download task panicked: {message}")]
    TaskPanicked {
        /// Panic description reported by the runtime.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    ClientBuild {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    ///
    /// Timeouts are promoted to [`DownloadError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an unsafe file name error.
    pub fn unsafe_name(name: impl Into<String>) -> Self {
        Self::UnsafeName { name: name.into() }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Wraps a HEAD failure as a resume-check error.
    #[must_use]
    pub fn resume_check(source: DownloadError) -> Self {
        Self::ResumeCheck {
            source: Box::new(source),
        }
    }

    /// Wraps the last attempt's failure once the retry budget is spent.
    #[must_use]
    pub fn retries_exhausted(attempts: u32, source: DownloadError) -> Self {
        Self::RetriesExhausted {
            attempts,
            source: Box::new(source),
        }
    }

    /// Returns true if this error only records that the run was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// Note on From trait implementations:
// We do NOT implement `From<reqwest::Error>` or `From<std::io::Error>` because
// every variant needs context (url, path) that the source errors don't carry.
