//! Directory listing retrieval.
//!
//! Fetches an Apache-style index page and turns its file rows into
//! [`FileDescriptor`]s for the download engine.
//!
//! # Example
//!
//! ```no_run
//! use myrient_dl::download::HttpClient;
//! use myrient_dl::listing::fetch_listing;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let files = fetch_listing(&client, "https://myrient.erista.me/files/No-Intro/").await?;
//! for file in &files {
//!     println!("{} ({} bytes)", file.name, file.expected_size);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod html;
mod size;

use tracing::{info, instrument};
use url::Url;

pub use error::ListingError;
pub use html::parse_listing;
pub use size::parse_size;

use crate::FileDescriptor;
use crate::download::HttpClient;

/// Fetches the listing at `url` and returns its file entries in page order.
///
/// An empty vector is a valid result; deciding whether that is an error is
/// up to the caller.
///
/// # Errors
///
/// Returns [`ListingError::InvalidUrl`] if `url` is not an absolute http(s)
/// URL, or [`ListingError::Fetch`] if the request fails or the server answers
/// with a non-success status.
#[instrument(skip(client))]
pub async fn fetch_listing(
    client: &HttpClient,
    url: &str,
) -> Result<Vec<FileDescriptor>, ListingError> {
    let base = Url::parse(url).map_err(|_| ListingError::invalid_url(url))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ListingError::invalid_url(url));
    }

    let html = client
        .fetch_text(base.as_str())
        .await
        .map_err(|source| ListingError::fetch(url, source))?;

    let files = parse_listing(&html, &base);
    info!(count = files.len(), "fetched directory listing");
    Ok(files)
}
