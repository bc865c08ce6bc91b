//! Types reported by fetch workers

use crate::app::fetcher::FailureKind;
use crate::app::models::WorkUnit;

/// Final status of one unit as seen by its worker
#[derive(Debug, Clone, PartialEq)]
pub enum UnitStatus {
    /// Fetched, normalized and merged
    Succeeded {
        /// Records merged into the aggregate
        records: usize,
        /// Entries the normalizer filtered out
        skipped: usize,
    },
    /// Terminal failure
    Failed { kind: FailureKind, attempts: u32 },
    /// Taken from the queue but never dispatched because the run was cancelled
    Cancelled,
}

/// Message sent from a worker to the coordinator after each unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    /// Worker that handled the unit
    pub worker_id: u32,
    /// The unit
    pub unit: WorkUnit,
    /// What happened to it
    pub status: UnitStatus,
}

impl UnitOutcome {
    /// Whether the unit succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.status, UnitStatus::Succeeded { .. })
    }
}
