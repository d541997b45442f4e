//! Application flow for the `myrient-dl` binary.

pub(crate) mod progress;
pub(crate) mod runtime;
pub(crate) mod terminal;
