//! Core application logic for Park Fetcher
//!
//! The fetch pipeline and its collaborators: work unit enumeration, the
//! transport, per-unit fetching with retry, dispatch limiting, normalization,
//! aggregation, the worker pool, run coordination and output persistence.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use park_fetcher::app::{
//!     persistence_for, ClientConfig, CoordinatorConfig, HttpTransport, OutputFormat,
//!     OutputTarget, PriceNormalizer, PricePayloadBuilder, ProductConfig, RunCoordinator,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
//! let target = OutputTarget::new("output", "prices");
//!
//! let report = RunCoordinator::new(
//!     CoordinatorConfig::prices(ProductConfig::default_catalogue(), start, end),
//!     Arc::new(PricePayloadBuilder::new()?),
//!     Arc::new(HttpTransport::new(&ClientConfig::from_env())?),
//!     Arc::new(PriceNormalizer::new()),
//! )
//! .with_persistence(Arc::new(persistence_for(&target, &[OutputFormat::Json, OutputFormat::Csv])))
//! .run()
//! .await?;
//!
//! println!("{} of {} units succeeded", report.summary.succeeded_units, report.summary.total_units);
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod client;
pub mod coordinator;
pub mod enumerator;
pub mod fetcher;
pub mod limiter;
pub mod models;
pub mod normalize;
pub mod output;
pub mod payload;
pub mod queue;
pub mod sources;
pub mod worker;

// Re-export main public API
pub use aggregator::{Aggregator, FinalizedRecords};
pub use client::{ClientConfig, HttpTransport, Transport, TransportResponse};
pub use coordinator::{
    CoordinatorConfig, NoProgress, ProgressSink, RunCoordinator, RunReport, RunState, RunSummary,
    UnitFailure,
};
pub use enumerator::{WorkPlan, WorkUnitEnumerator};
pub use fetcher::{ErrorKind, FailureKind, FetchResult, Fetcher, RetryPolicy};
pub use limiter::{DispatchLimiter, DispatchPermit, PacingPolicy};
pub use models::{DomainRecord, PriceRecord, ProductConfig, RunContext, ScheduleRecord, WorkUnit};
pub use normalize::{Normalized, Normalizer};
pub use output::{
    persistence_for, CsvFilePersistence, JsonFilePersistence, MultiPersistence, OutputFormat,
    OutputTarget, Persistence,
};
pub use payload::{PayloadBuilder, RequestPayload};
pub use queue::WorkQueue;
pub use sources::{PriceNormalizer, PricePayloadBuilder, ScheduleNormalizer, SchedulePayloadBuilder};
pub use worker::{UnitOutcome, UnitStatus};
