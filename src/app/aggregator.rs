//! Thread-safe record aggregation
//!
//! Workers merge normalized records concurrently; once every worker has exited
//! the coordinator finalizes the aggregate exactly once. Finalizing removes
//! structural duplicates and sorts by a key that never depends on the order in
//! which records arrived.

use chrono::{DateTime, NaiveDate};
use tokio::sync::Mutex;
use tracing::debug;

use super::models::DomainRecord;
use crate::errors::AggregateError;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

#[derive(Debug, Default)]
struct AggregateState {
    records: Vec<DomainRecord>,
    finalized: bool,
}

/// Deduplicated, sorted output of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizedRecords {
    /// Unique records in output order
    pub records: Vec<DomainRecord>,
    /// Records merged before deduplication
    pub merged: usize,
    /// Records dropped as exact duplicates
    pub duplicates_removed: usize,
}

/// Accumulates records from concurrent workers
#[derive(Debug, Default)]
pub struct Aggregator {
    state: Mutex<AggregateState>,
}

impl Aggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records; returns the number added
    ///
    /// # Errors
    ///
    /// Returns `AggregateError::AlreadyFinalized` after [`Aggregator::finalize`].
    pub async fn merge(&self, records: Vec<DomainRecord>) -> Result<usize, AggregateError> {
        let mut state = self.state.lock().await;
        if state.finalized {
            return Err(AggregateError::AlreadyFinalized);
        }
        let added = records.len();
        state.records.extend(records);
        Ok(added)
    }

    /// Freeze the aggregate and return the deduplicated, sorted records
    ///
    /// # Errors
    ///
    /// Returns `AggregateError::AlreadyFinalized` when called twice.
    pub async fn finalize(&self) -> Result<FinalizedRecords, AggregateError> {
        let records = {
            let mut state = self.state.lock().await;
            if state.finalized {
                return Err(AggregateError::AlreadyFinalized);
            }
            state.finalized = true;
            std::mem::take(&mut state.records)
        };

        let merged = records.len();
        let records = sort_and_dedup(records);
        let duplicates_removed = merged - records.len();

        debug!(
            "Finalized {} records ({} duplicates removed)",
            records.len(),
            duplicates_removed
        );
        Ok(FinalizedRecords {
            records,
            merged,
            duplicates_removed,
        })
    }

    /// Number of records merged so far
    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    /// Whether nothing has been merged
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether the aggregate has been finalized
    pub async fn is_finalized(&self) -> bool {
        self.state.lock().await.finalized
    }
}

/// Parse a record date in any of the accepted formats
pub fn parse_record_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|timestamp| timestamp.date_naive())
        })
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    // false sorts first, so parseable dates come before unparseable ones
    unparsed: bool,
    date: Option<NaiveDate>,
    raw_date: String,
    secondary: String,
    tertiary: String,
}

impl SortKey {
    fn of(record: &DomainRecord) -> Self {
        let date = parse_record_date(record.date());
        Self {
            unparsed: date.is_none(),
            raw_date: if date.is_none() {
                record.date().to_string()
            } else {
                String::new()
            },
            date,
            secondary: record.secondary_key().to_string(),
            tertiary: record.tertiary_key().to_string(),
        }
    }
}

fn sort_and_dedup(records: Vec<DomainRecord>) -> Vec<DomainRecord> {
    let mut keyed: Vec<(SortKey, DomainRecord)> = records
        .into_iter()
        .map(|record| (SortKey::of(&record), record))
        .collect();

    // The full record breaks remaining ties, making the order total.
    keyed.sort();
    keyed.dedup_by(|a, b| a.1 == b.1);
    keyed.into_iter().map(|(_, record)| record).collect()
}
