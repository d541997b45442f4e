//! Shared User-Agent string for listing and download requests.
//!
//! Single source for the project URL and UA format so every request to the
//! mirror identifies the tool the same way.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/nchapman/myrient-dl";

/// Default User-Agent for all outbound requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("myrient-dl/{version} (+{PROJECT_UA_URL})")
}
