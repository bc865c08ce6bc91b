//! Data models for work units and normalized records
//!
//! Work units are the immutable keys the pipeline fetches one at a time.
//! Domain records are the uniform output rows produced by the normalizers;
//! their structural equality is what the aggregator deduplicates on.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One product configuration of the ticket price calendar
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductConfig {
    /// Product type, also the key of the product inside each calendar day
    pub park_type: String,
    /// Human-readable deal category copied onto every record
    pub deal_category: String,
    /// Adult product code
    pub adult_code: String,
    /// Child product code
    pub child_code: String,
}

impl ProductConfig {
    /// Create a product configuration
    pub fn new(
        park_type: impl Into<String>,
        deal_category: impl Into<String>,
        adult_code: impl Into<String>,
        child_code: impl Into<String>,
    ) -> Self {
        Self {
            park_type: park_type.into(),
            deal_category: deal_category.into(),
            adult_code: adult_code.into(),
            child_code: child_code.into(),
        }
    }

    /// The four product configurations sold on the ticketing site
    pub fn default_catalogue() -> Vec<Self> {
        vec![
            Self::new("1-day-1-park", "special deal", "TKITK6061A", "TKITK6061C"),
            Self::new("1-day-2-parks", "special deal", "TKITHL081A", "TKITHL081C"),
            Self::new("1-day-1-park", "regular deal", "TKITK6001A", "TKITK6001C"),
            Self::new("1-day-2-parks", "regular deal", "TKITHL001A", "TKITHL001C"),
        ]
    }
}

/// An independently fetchable unit of remote work
///
/// Ordering and equality come from the key alone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum WorkUnit {
    /// One calendar date
    Date(NaiveDate),
    /// One product configuration
    Product(ProductConfig),
}

impl WorkUnit {
    /// Date of a date unit
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            WorkUnit::Date(date) => Some(*date),
            WorkUnit::Product(_) => None,
        }
    }

    /// Product configuration of a product unit
    pub fn as_product(&self) -> Option<&ProductConfig> {
        match self {
            WorkUnit::Product(product) => Some(product),
            WorkUnit::Date(_) => None,
        }
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkUnit::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            WorkUnit::Product(product) => {
                write!(f, "{} - {}", product.deal_category, product.park_type)
            }
        }
    }
}

/// Context shared by every request of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    /// Market code, e.g. `nl-nl`
    pub market: String,
    /// Currency code, e.g. `EUR`
    pub currency: String,
    /// First date of the requested window
    pub start_date: NaiveDate,
    /// Last date of the requested window (inclusive)
    pub end_date: NaiveDate,
}

impl RunContext {
    /// Create a context for the given window with the default market and currency
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            market: crate::constants::api::DEFAULT_MARKET.to_string(),
            currency: crate::constants::api::DEFAULT_CURRENCY.to_string(),
            start_date,
            end_date,
        }
    }
}

/// Normalized ticket price row
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PriceRecord {
    pub date: String,
    pub deal_category: String,
    pub park_category: String,
    /// `"Yes"` or `"No"`
    pub available: String,
    pub adult_price: String,
    pub child_price: String,
    pub range: String,
}

/// Normalized schedule row
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub date: String,
    pub location: String,
    pub status: String,
    pub starting_time: String,
    pub ending_time: String,
}

/// Uniform output unit of the pipeline
///
/// Serialized without a variant tag so output files contain flat rows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DomainRecord {
    Price(PriceRecord),
    Schedule(ScheduleRecord),
}

impl DomainRecord {
    /// Raw date text of the record
    pub fn date(&self) -> &str {
        match self {
            DomainRecord::Price(record) => &record.date,
            DomainRecord::Schedule(record) => &record.date,
        }
    }

    /// Secondary ordering key: deal category for prices, location for schedules
    pub fn secondary_key(&self) -> &str {
        match self {
            DomainRecord::Price(record) => &record.deal_category,
            DomainRecord::Schedule(record) => &record.location,
        }
    }

    /// Tertiary ordering key: park category for prices, start time for schedules
    pub fn tertiary_key(&self) -> &str {
        match self {
            DomainRecord::Price(record) => &record.park_category,
            DomainRecord::Schedule(record) => &record.starting_time,
        }
    }
}

impl From<PriceRecord> for DomainRecord {
    fn from(record: PriceRecord) -> Self {
        DomainRecord::Price(record)
    }
}

impl From<ScheduleRecord> for DomainRecord {
    fn from(record: ScheduleRecord) -> Self {
        DomainRecord::Schedule(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_unit_display() {
        let date = WorkUnit::Date(NaiveDate::from_ymd_opt(2026, 3, 7).unwrap());
        assert_eq!(date.to_string(), "2026-03-07");

        let product = WorkUnit::Product(ProductConfig::new("1-day-1-park", "regular deal", "A", "C"));
        assert_eq!(product.to_string(), "regular deal - 1-day-1-park");
    }

    #[test]
    fn test_work_unit_ordering_follows_key() {
        let early = WorkUnit::Date(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
        let late = WorkUnit::Date(NaiveDate::from_ymd_opt(2026, 1, 10).unwrap());
        assert!(early < late);
        assert_eq!(early.as_date(), NaiveDate::from_ymd_opt(2026, 1, 2));
        assert!(early.as_product().is_none());
    }

    #[test]
    fn test_default_catalogue() {
        let catalogue = ProductConfig::default_catalogue();
        assert_eq!(catalogue.len(), 4);
        assert_eq!(catalogue[0].adult_code, "TKITK6061A");
        assert_eq!(catalogue[3].deal_category, "regular deal");
    }

    #[test]
    fn test_domain_record_serializes_flat() {
        let record = DomainRecord::Schedule(ScheduleRecord {
            date: "2026-01-01".to_string(),
            location: "Disneyland Park".to_string(),
            status: "OPERATING".to_string(),
            starting_time: "09:30:00".to_string(),
            ending_time: "22:00:00".to_string(),
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["location"], "Disneyland Park");
        assert!(json.get("Schedule").is_none());
        assert_eq!(record.secondary_key(), "Disneyland Park");
        assert_eq!(record.tertiary_key(), "09:30:00");
    }
}
