//! Core library for launching a debugger against a running backend.
//! Provides modules reused by the CLI front end.

pub mod breakpoints;
pub mod config;
pub mod errors;
pub mod host;
pub mod launcher;
pub mod ops;
pub mod symbols;
pub mod template;

pub use errors::{PgdbError, PgdbResult};
pub use ops::{Attached, attach, list_symbols};

/// Exposes the crate version for CLI reporting.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
