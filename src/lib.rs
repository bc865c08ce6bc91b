//! Park Fetcher Library
//!
//! Fetches theme-park ticket prices and park schedules from a remote JSON API.
//! Units of work are fetched concurrently under a strict concurrency bound, with
//! per-attempt timeouts, retries and pacing, then deduplicated, sorted and
//! written out together with a run summary.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
