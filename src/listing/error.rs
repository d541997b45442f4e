//! Error types for directory listing retrieval.

use thiserror::Error;

use crate::download::DownloadError;

/// Errors that can occur while fetching a directory listing.
#[derive(Debug, Error)]
pub enum ListingError {
    /// The listing URL is malformed or not http(s).
    #[error("invalid listing URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// The listing page could not be retrieved.
    #[error("failed to fetch directory listing: {source}")]
    Fetch {
        /// The listing URL.
        url: String,
        /// The underlying request failure.
        #[source]
        source: DownloadError,
    },
}

impl ListingError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a fetch error.
    pub fn fetch(url: impl Into<String>, source: DownloadError) -> Self {
        Self::Fetch {
            url: url.into(),
            source,
        }
    }
}
