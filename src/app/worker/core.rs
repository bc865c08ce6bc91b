//! Core fetch worker implementation
//!
//! Workers continuously take units from the shared queue, hold a dispatch
//! permit around each fetch, normalize and merge what comes back, and report
//! every unit's outcome to the coordinator. A unit's failure never stops the
//! worker; only the shutdown signal or an empty queue does.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::types::{UnitOutcome, UnitStatus};
use crate::app::aggregator::Aggregator;
use crate::app::fetcher::{FailureKind, FetchResult, Fetcher};
use crate::app::limiter::DispatchLimiter;
use crate::app::models::WorkUnit;
use crate::app::normalize::Normalizer;
use crate::app::queue::WorkQueue;

/// Shared components every worker of a run uses
#[derive(Clone)]
pub struct WorkerContext {
    /// Pending units
    pub queue: Arc<WorkQueue>,
    /// Per-unit fetcher
    pub fetcher: Arc<Fetcher>,
    /// Response normalizer
    pub normalizer: Arc<dyn Normalizer>,
    /// Concurrency bound shared with the fetcher
    pub limiter: Arc<DispatchLimiter>,
    /// Record sink
    pub aggregator: Arc<Aggregator>,
}

/// Individual fetch worker
pub struct FetchWorker {
    /// Unique worker identifier
    id: u32,
    context: WorkerContext,
    outcome_tx: mpsc::Sender<UnitOutcome>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl FetchWorker {
    /// Create a new worker
    pub fn new(
        id: u32,
        context: WorkerContext,
        outcome_tx: mpsc::Sender<UnitOutcome>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            id,
            context,
            outcome_tx,
            shutdown_rx,
        }
    }

    /// Start the worker loop; returns the number of units handled
    pub async fn run(mut self) -> usize {
        debug!("Worker {} starting", self.id);
        let mut handled = 0;

        loop {
            if self.shutdown_requested() {
                info!("Worker {} received shutdown signal", self.id);
                break;
            }

            let Some(unit) = self.context.queue.next().await else {
                debug!("Worker {} found no more work", self.id);
                break;
            };

            let status = self.process(&unit).await;
            let cancelled = status == UnitStatus::Cancelled;
            self.report(unit, status).await;
            handled += 1;

            if cancelled {
                break;
            }
        }

        debug!("Worker {} shutting down after {} units", self.id, handled);
        handled
    }

    fn shutdown_requested(&mut self) -> bool {
        match self.shutdown_rx.try_recv() {
            Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => true,
            Err(broadcast::error::TryRecvError::Empty)
            | Err(broadcast::error::TryRecvError::Closed) => false,
        }
    }

    async fn process(&self, unit: &WorkUnit) -> UnitStatus {
        let Some(permit) = self.context.limiter.acquire().await else {
            debug!("Worker {} dropping {}: dispatch closed", self.id, unit);
            return UnitStatus::Cancelled;
        };
        let result = self.context.fetcher.fetch(unit).await;
        // spacing applies after every dispatch, whatever the outcome
        if result.attempts() > 0 {
            self.context.limiter.pace().await;
        }
        drop(permit);

        let (raw, attempts) = match result {
            FetchResult::Success { raw, attempts } => (raw, attempts),
            FetchResult::Failure { kind, attempts } => {
                return UnitStatus::Failed { kind, attempts };
            }
        };

        let normalized = match self.context.normalizer.normalize(unit, &raw) {
            Ok(normalized) => normalized,
            Err(e) => {
                warn!("Worker {} cannot normalize {}: {}", self.id, unit, e);
                return UnitStatus::Failed {
                    kind: FailureKind::DataShape(e),
                    attempts,
                };
            }
        };

        let skipped = normalized.skipped;
        match self.context.aggregator.merge(normalized.records).await {
            Ok(records) => {
                debug!(
                    "Worker {} merged {} records for {} ({} skipped)",
                    self.id, records, unit, skipped
                );
                UnitStatus::Succeeded { records, skipped }
            }
            Err(e) => {
                warn!("Worker {} could not merge {}: {}", self.id, unit, e);
                UnitStatus::Cancelled
            }
        }
    }

    async fn report(&self, unit: WorkUnit, status: UnitStatus) {
        let outcome = UnitOutcome {
            worker_id: self.id,
            unit,
            status,
        };
        if self.outcome_tx.send(outcome).await.is_err() {
            debug!("Worker {} outcome receiver dropped", self.id);
        }
    }
}
