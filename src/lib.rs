//! Myrient Downloader Library
//!
//! This library provides the core functionality for the `myrient-dl` tool,
//! which downloads the files of a remote Apache-style directory listing,
//! narrowed by glob patterns, with bounded parallelism and retries.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`listing`] - Directory listing fetch and HTML extraction
//! - [`filter`] - Include/exclude glob filtering
//! - [`download`] - Download engine: resume check, atomic transfer, retry, parallelism
//! - [`descriptor`] - The file descriptor passed between the stages

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod descriptor;
pub mod download;
pub mod filter;
pub mod listing;
mod user_agent;

// Re-export commonly used types
pub use descriptor::{FileDescriptor, total_expected_size};
pub use download::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_PARALLELISM, DownloadEngine, DownloadError, EngineError,
    HttpClient, ProgressObserver, RunError, RunResult, RunSummary, TransferConfig,
    TransferOutcome,
};
pub use filter::PatternFilter;
pub use listing::{ListingError, fetch_listing};
