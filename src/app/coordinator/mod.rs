//! Run orchestration
//!
//! The coordinator owns a run from enumeration to persistence. It spawns the
//! worker pool, folds unit outcomes into the summary, reacts to cancellation
//! and decides whether the run completed or failed.
//!
//! - [`config`] - run configuration and validation
//! - [`stats`] - run summary and report
//! - [`signals`] - Ctrl+C / SIGTERM handling
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use park_fetcher::app::{
//!     ClientConfig, CoordinatorConfig, HttpTransport, RunCoordinator,
//!     ScheduleNormalizer, SchedulePayloadBuilder,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let start = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2026, 5, 31).unwrap();
//!
//! let coordinator = RunCoordinator::new(
//!     CoordinatorConfig::schedules(start, end).with_max_concurrency(5),
//!     Arc::new(SchedulePayloadBuilder::new()?),
//!     Arc::new(HttpTransport::new(&ClientConfig::from_env())?),
//!     Arc::new(ScheduleNormalizer::default()),
//! );
//!
//! let report = coordinator.run().await?;
//! println!("{} records", report.records.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod signals;
pub mod stats;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::app::aggregator::Aggregator;
use crate::app::client::Transport;
use crate::app::enumerator::WorkUnitEnumerator;
use crate::app::fetcher::Fetcher;
use crate::app::limiter::DispatchLimiter;
use crate::app::normalize::Normalizer;
use crate::app::output::Persistence;
use crate::app::payload::PayloadBuilder;
use crate::app::queue::WorkQueue;
use crate::app::worker::{UnitOutcome, WorkerContext, WorkerPool};
use crate::constants::workers;
use crate::errors::Result;

pub use config::CoordinatorConfig;
pub use signals::{create_shutdown_channel, SignalHandler};
pub use stats::{RunReport, RunSummary, UnitFailure};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Enumerating,
    Fetching,
    Aggregating,
    Completed,
    Failed,
}

impl RunState {
    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::NotStarted => "not started",
            RunState::Enumerating => "enumerating",
            RunState::Fetching => "fetching",
            RunState::Aggregating => "aggregating",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Receives run progress as it happens
pub trait ProgressSink: Send + Sync {
    /// Called once the units are known
    fn on_start(&self, _total_units: usize) {}

    /// Called for every unit outcome
    fn on_outcome(&self, _outcome: &UnitOutcome) {}

    /// Called once with the final summary
    fn on_finish(&self, _summary: &RunSummary) {}
}

/// Progress sink that ignores everything
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Orchestrates one fetch run
pub struct RunCoordinator {
    config: CoordinatorConfig,
    builder: Arc<dyn PayloadBuilder>,
    transport: Arc<dyn Transport>,
    normalizer: Arc<dyn Normalizer>,
    persistence: Option<Arc<dyn Persistence>>,
    progress: Arc<dyn ProgressSink>,
    shutdown_tx: broadcast::Sender<()>,
    cancel_requested: AtomicBool,
    state_tx: watch::Sender<RunState>,
}

impl RunCoordinator {
    /// Create a coordinator for one source
    pub fn new(
        config: CoordinatorConfig,
        builder: Arc<dyn PayloadBuilder>,
        transport: Arc<dyn Transport>,
        normalizer: Arc<dyn Normalizer>,
    ) -> Self {
        let (shutdown_tx, _) = create_shutdown_channel();
        let (state_tx, _) = watch::channel(RunState::NotStarted);
        Self {
            config,
            builder,
            transport,
            normalizer,
            persistence: None,
            progress: Arc::new(NoProgress),
            shutdown_tx,
            cancel_requested: AtomicBool::new(false),
            state_tx,
        }
    }

    /// Hand the final records to `persistence` after a successful run
    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Report progress to `sink`
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        *self.state_tx.borrow()
    }

    /// Watch run state changes
    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    /// Sender that cancels the run when a message is broadcast
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Stop dispatching new units; in-flight units finish
    ///
    /// A cancel issued before `run` starts is kept and the run dispatches
    /// nothing.
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.cancel_requested.store(true, Ordering::SeqCst);
        if self.shutdown_tx.send(()).is_err() {
            debug!("No run is listening yet, cancellation latched");
        }
    }

    /// Run the whole pipeline
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the configuration or work plan is
    /// invalid and `AppError::Persistence` when the output cannot be written.
    /// A run where no unit succeeded is reported as `Ok` with state `Failed`.
    pub async fn run(&self) -> Result<RunReport> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let signal_task = self
            .config
            .handle_signals
            .then(|| SignalHandler::new(self.shutdown_tx.clone()).setup());

        let result = self.execute(&mut shutdown_rx).await;

        if let Some(task) = signal_task {
            task.abort();
        }
        if result.is_err() {
            self.set_state(RunState::Failed);
        }
        result
    }

    async fn execute(&self, shutdown_rx: &mut broadcast::Receiver<()>) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_start = Instant::now();
        let source = self.builder.source_name();

        self.set_state(RunState::Enumerating);
        self.config.validate().map_err(|e| {
            error!("Invalid run configuration: {}", e);
            e
        })?;
        let units = WorkUnitEnumerator::enumerate(&self.config.plan).map_err(|e| {
            error!("Enumeration failed: {}", e);
            e
        })?;
        if let Some(unit) = units.iter().find(|unit| !self.builder.supports(unit)) {
            let e = self.builder.unsupported(unit);
            error!("{}", e);
            return Err(e.into());
        }

        let total_units = units.len();
        let mut summary = RunSummary::new(source, total_units, started_at);
        info!(
            "Fetching {} {} units with up to {} concurrent requests",
            total_units, source, self.config.max_concurrency
        );
        self.progress.on_start(total_units);

        self.set_state(RunState::Fetching);
        let limiter = Arc::new(DispatchLimiter::new(
            self.config.max_concurrency,
            self.config.pacing,
            self.config.rate_limit_rps,
        )?);
        let queue = Arc::new(WorkQueue::new(units));
        let aggregator = Arc::new(Aggregator::new());
        let fetcher = Arc::new(Fetcher::new(
            Arc::clone(&self.builder),
            Arc::clone(&self.transport),
            Arc::clone(&self.normalizer),
            Arc::clone(&limiter),
            self.config.context.clone(),
            self.config.retry,
            self.config.request_timeout,
        ));

        let context = WorkerContext {
            queue: Arc::clone(&queue),
            fetcher,
            normalizer: Arc::clone(&self.normalizer),
            limiter: Arc::clone(&limiter),
            aggregator: Arc::clone(&aggregator),
        };
        let worker_count = self.config.max_concurrency.min(total_units).max(1);
        let mut pool = WorkerPool::new(worker_count, context);

        if self.cancel_requested.load(Ordering::SeqCst) {
            info!("Run cancelled before dispatch");
            summary.cancelled = true;
            limiter.close();
        }

        let (outcome_tx, mut outcome_rx) = mpsc::channel(workers::OUTCOME_BUFFER_SIZE);
        pool.start(&outcome_tx, &self.shutdown_tx)?;
        drop(outcome_tx);

        let deadline = async {
            match self.config.run_deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                outcome = outcome_rx.recv() => match outcome {
                    Some(outcome) => self.observe(&mut summary, &outcome),
                    None => break,
                },
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping dispatch");
                    summary.cancelled = true;
                    break;
                }
                _ = &mut deadline => {
                    warn!("Run deadline of {:?} reached, stopping dispatch", self.config.run_deadline);
                    summary.cancelled = true;
                    let _ = self.shutdown_tx.send(());
                    break;
                }
            }
        }

        if summary.cancelled {
            limiter.close();
            let drained = tokio::time::timeout(self.config.shutdown_timeout, async {
                while let Some(outcome) = outcome_rx.recv().await {
                    self.observe(&mut summary, &outcome);
                }
            })
            .await;

            if drained.is_err() {
                warn!(
                    "In-flight units did not finish within {:?}, aborting workers",
                    self.config.shutdown_timeout
                );
                pool.abort();
            }
        }
        pool.join().await;
        while let Ok(outcome) = outcome_rx.try_recv() {
            self.observe(&mut summary, &outcome);
        }

        let undispatched = queue.drain().await;
        if !undispatched.is_empty() {
            info!("{} units were not dispatched", undispatched.len());
        }
        summary.cancelled_units.extend(undispatched);
        summary.abandoned_units = total_units.saturating_sub(summary.processed_units());
        summary.peak_in_flight = limiter.peak_in_flight();

        self.set_state(RunState::Aggregating);
        let finalized = aggregator.finalize().await?;
        summary.records_merged = finalized.merged;
        summary.duplicates_removed = finalized.duplicates_removed;
        summary.records_emitted = finalized.records.len();
        summary.duration = run_start.elapsed();

        for failure in &summary.failed_units {
            debug!(
                "Failed unit {}: {} after {} attempts ({})",
                failure.unit, failure.kind, failure.attempts, failure.detail
            );
        }

        if summary.succeeded_units == 0 {
            error!(
                "No {} unit succeeded ({} failed, {} cancelled)",
                source,
                summary.failed_count(),
                summary.cancelled_units.len()
            );
            self.set_state(RunState::Failed);
            self.progress.on_finish(&summary);
            return Ok(RunReport {
                state: RunState::Failed,
                summary,
                records: finalized.records,
            });
        }

        if let Some(persistence) = &self.persistence {
            persistence.write(&finalized.records, &summary).await?;
        }

        info!(
            "Run completed in {:?}: {}/{} units succeeded, {} failed, {} records",
            summary.duration,
            summary.succeeded_units,
            total_units,
            summary.failed_count(),
            summary.records_emitted
        );
        self.set_state(RunState::Completed);
        self.progress.on_finish(&summary);

        Ok(RunReport {
            state: RunState::Completed,
            summary,
            records: finalized.records,
        })
    }

    fn observe(&self, summary: &mut RunSummary, outcome: &UnitOutcome) {
        self.progress.on_outcome(outcome);
        summary.record(outcome);
    }

    fn set_state(&self, state: RunState) {
        debug!("Run state: {}", state);
        self.state_tx.send_replace(state);
    }
}
