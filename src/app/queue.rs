//! Shared work queue
//!
//! Holds the enumerated units that have not been handed to a worker yet.
//! Units are taken in enumeration order; whatever is left when a run is
//! cancelled is drained and reported as cancelled.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tracing::debug;

use super::models::WorkUnit;

/// FIFO of pending work units shared by all workers
#[derive(Debug, Default)]
pub struct WorkQueue {
    pending: Mutex<VecDeque<WorkUnit>>,
}

impl WorkQueue {
    /// Create a queue holding `units` in order
    pub fn new(units: Vec<WorkUnit>) -> Self {
        debug!("Queued {} work units", units.len());
        Self {
            pending: Mutex::new(units.into()),
        }
    }

    /// Take the next unit, if any
    pub async fn next(&self) -> Option<WorkUnit> {
        self.pending.lock().await.pop_front()
    }

    /// Remove and return every unit not yet taken
    pub async fn drain(&self) -> Vec<WorkUnit> {
        self.pending.lock().await.drain(..).collect()
    }

    /// Number of units not yet taken
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Whether every unit has been taken
    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }
}
