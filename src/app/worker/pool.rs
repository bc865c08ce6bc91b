//! Worker pool management
//!
//! Spawns one fetch worker per concurrency slot and tracks their lifecycle.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::core::{FetchWorker, WorkerContext};
use super::types::UnitOutcome;
use crate::errors::{AppError, Result};

/// Current state of the worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Pool has been created but not started
    Created,
    /// Pool is running with active workers
    Running,
    /// All workers have exited
    Finished,
}

/// Pool of fetch workers sharing one context
pub struct WorkerPool {
    worker_count: usize,
    context: WorkerContext,
    worker_handles: Vec<JoinHandle<usize>>,
    state: PoolState,
}

impl WorkerPool {
    /// Create a new pool; no worker runs until [`WorkerPool::start`]
    pub fn new(worker_count: usize, context: WorkerContext) -> Self {
        Self {
            worker_count,
            context,
            worker_handles: Vec::new(),
            state: PoolState::Created,
        }
    }

    /// Current pool state
    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Start all workers
    pub fn start(
        &mut self,
        outcome_tx: &mpsc::Sender<UnitOutcome>,
        shutdown_tx: &broadcast::Sender<()>,
    ) -> Result<()> {
        if self.state != PoolState::Created {
            return Err(AppError::generic(format!(
                "Cannot start pool in state: {:?}",
                self.state
            )));
        }

        for worker_id in 0..self.worker_count {
            let worker = FetchWorker::new(
                worker_id as u32,
                self.context.clone(),
                outcome_tx.clone(),
                shutdown_tx.subscribe(),
            );
            self.worker_handles
                .push(tokio::spawn(async move { worker.run().await }));
        }

        self.state = PoolState::Running;
        info!("Worker pool started with {} workers", self.worker_count);
        Ok(())
    }

    /// Wait for every worker to exit; returns the number of units handled
    pub async fn join(&mut self) -> usize {
        let mut handled = 0;
        let results = futures::future::join_all(self.worker_handles.drain(..)).await;
        for (worker_id, result) in results.into_iter().enumerate() {
            match result {
                Ok(count) => handled += count,
                Err(e) => warn!("Worker {} task failed: {}", worker_id, e),
            }
        }
        self.state = PoolState::Finished;
        debug!("All workers finished ({} units handled)", handled);
        handled
    }

    /// Abort workers that are still running
    pub fn abort(&mut self) {
        for handle in &self.worker_handles {
            handle.abort();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.worker_handles.is_empty() {
            self.abort();
        }
    }
}
