//! Prelude module for Park Fetcher Library
//!
//! Re-exports the items needed to configure and run a fetch with a single
//! `use park_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use park_fetcher::prelude::*;
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let day = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
//!     let coordinator = RunCoordinator::new(
//!         CoordinatorConfig::schedules(day, day),
//!         Arc::new(SchedulePayloadBuilder::new()?),
//!         Arc::new(HttpTransport::new(&ClientConfig::from_env())?),
//!         Arc::new(ScheduleNormalizer::default()),
//!     );
//!     let report = coordinator.run().await?;
//!     println!("{} records", report.records.len());
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::{
    // Orchestration
    CoordinatorConfig,
    RunCoordinator,
    RunReport,
    RunState,
    RunSummary,

    // Collaborators
    ClientConfig,
    HttpTransport,
    PriceNormalizer,
    PricePayloadBuilder,
    ScheduleNormalizer,
    SchedulePayloadBuilder,

    // Data types
    DomainRecord,
    ProductConfig,
    WorkUnit,

    // Output
    persistence_for,
    OutputFormat,
    OutputTarget,
};

// Commonly used constants
pub use crate::constants::{DEFAULT_MAX_CONCURRENCY, MAX_RETRIES, USER_AGENT};

pub use std::sync::Arc;
