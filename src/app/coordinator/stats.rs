//! Run statistics and the final run report
//!
//! The summary is built from the outcomes workers report; it always lists
//! failed units with their error kinds, whether or not the run completed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RunState;
use crate::app::fetcher::ErrorKind;
use crate::app::models::{DomainRecord, WorkUnit};
use crate::app::worker::{UnitOutcome, UnitStatus};

/// One failed unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// The unit that failed
    pub unit: WorkUnit,
    /// Error kind
    pub kind: ErrorKind,
    /// Attempts made before giving up
    pub attempts: u32,
    /// Human-readable error detail
    pub detail: String,
}

/// Summary of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Name of the source that was fetched
    pub source: String,
    /// Units enumerated
    pub total_units: usize,
    /// Units fetched, normalized and merged
    pub succeeded_units: usize,
    /// Units that failed, with error kind and attempts
    pub failed_units: Vec<UnitFailure>,
    /// Units never dispatched because the run was cancelled
    pub cancelled_units: Vec<WorkUnit>,
    /// Units in flight when workers were aborted after the shutdown timeout
    pub abandoned_units: usize,
    /// Whether the run was cancelled
    pub cancelled: bool,
    /// Entries filtered out by the normalizer
    pub entries_skipped: usize,
    /// Records merged before deduplication
    pub records_merged: usize,
    /// Exact duplicates removed
    pub duplicates_removed: usize,
    /// Records in the final output
    pub records_emitted: usize,
    /// Highest number of concurrent fetches observed
    pub peak_in_flight: usize,
    /// Start of the run
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl RunSummary {
    /// Empty summary for a run over `total_units` units
    pub fn new(source: impl Into<String>, total_units: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            source: source.into(),
            total_units,
            succeeded_units: 0,
            failed_units: Vec::new(),
            cancelled_units: Vec::new(),
            abandoned_units: 0,
            cancelled: false,
            entries_skipped: 0,
            records_merged: 0,
            duplicates_removed: 0,
            records_emitted: 0,
            peak_in_flight: 0,
            started_at,
            duration: Duration::ZERO,
        }
    }

    /// Fold one worker outcome into the summary
    pub fn record(&mut self, outcome: &UnitOutcome) {
        match &outcome.status {
            UnitStatus::Succeeded { skipped, .. } => {
                self.succeeded_units += 1;
                self.entries_skipped += skipped;
            }
            UnitStatus::Failed { kind, attempts } => self.failed_units.push(UnitFailure {
                unit: outcome.unit.clone(),
                kind: kind.kind(),
                attempts: *attempts,
                detail: kind.to_string(),
            }),
            UnitStatus::Cancelled => self.cancelled_units.push(outcome.unit.clone()),
        }
    }

    /// Number of failed units
    pub fn failed_count(&self) -> usize {
        self.failed_units.len()
    }

    /// Units accounted for by an outcome or by cancellation
    pub fn processed_units(&self) -> usize {
        self.succeeded_units + self.failed_units.len() + self.cancelled_units.len()
    }

    /// Percentage of enumerated units that succeeded
    pub fn success_rate(&self) -> f64 {
        if self.total_units == 0 {
            return 0.0;
        }
        (self.succeeded_units as f64 / self.total_units as f64) * 100.0
    }

    /// Whether every unit succeeded
    pub fn is_complete(&self) -> bool {
        self.total_units > 0 && self.succeeded_units == self.total_units
    }
}

/// Final result of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Terminal state, `Completed` or `Failed`
    pub state: RunState,
    /// Run summary
    pub summary: RunSummary,
    /// Deduplicated, sorted records
    pub records: Vec<DomainRecord>,
}

impl RunReport {
    /// Whether the run completed
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }
}
