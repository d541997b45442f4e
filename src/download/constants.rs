//! Constants for the download module (timeouts, retry backoff, concurrency).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Whole-request timeout (30 minutes, sized for multi-gigabyte archives).
pub const REQUEST_TIMEOUT_SECS: u64 = 30 * 60;

/// Base delay before the first retry; doubles for every further attempt.
pub const BACKOFF_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for any single backoff wait, jitter included.
pub const BACKOFF_MAX_DELAY: Duration = Duration::from_secs(30);

/// Jitter spread as a fraction of the base delay (±25%).
pub const BACKOFF_JITTER_FRACTION: f64 = 0.25;

/// Suffix appended to the final file name while a transfer is in flight.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";
