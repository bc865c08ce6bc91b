//! Response normalization seam
//!
//! Normalizers are pure functions from a raw vendor payload to uniform
//! domain records. Entries that do not belong to the unit are filtered out,
//! never reported as errors, and the filter count is returned alongside the
//! records so callers can observe it.

use serde_json::Value;

use super::models::{DomainRecord, WorkUnit};
use crate::errors::{DataShapeError, ShapeResult};

/// Records produced from one payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Records extracted from the payload
    pub records: Vec<DomainRecord>,
    /// Entries skipped because they did not match the unit or lacked keys
    pub skipped: usize,
}

impl Normalized {
    /// Create an empty result
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record
    pub fn push(&mut self, record: impl Into<DomainRecord>) {
        self.records.push(record.into());
    }

    /// Count a filtered entry
    pub fn skip(&mut self) {
        self.skipped += 1;
    }
}

/// Converts raw payloads into domain records
pub trait Normalizer: Send + Sync {
    /// Dotted path of the top-level field every valid response carries
    fn required_field(&self) -> &'static str;

    /// Extract records for one unit
    ///
    /// # Errors
    ///
    /// Returns `DataShapeError` when the required top-level field is missing
    /// or has the wrong type.
    fn normalize(&self, unit: &WorkUnit, raw: &Value) -> ShapeResult<Normalized>;

    /// Check the response shape without extracting records
    ///
    /// The required field must be an array or `null`.
    fn check_shape(&self, raw: &Value) -> ShapeResult<()> {
        match lookup(raw, self.required_field())? {
            Value::Array(_) | Value::Null => Ok(()),
            _ => Err(DataShapeError::UnexpectedType {
                field: self.required_field().to_string(),
                expected: "array".to_string(),
            }),
        }
    }
}

/// Follow a dotted path through nested objects
///
/// A `null` leaf is returned as-is; callers decide whether it means empty.
pub fn lookup<'a>(raw: &'a Value, path: &str) -> ShapeResult<&'a Value> {
    let mut current = raw;
    for segment in path.split('.') {
        current = current
            .as_object()
            .ok_or_else(|| DataShapeError::UnexpectedType {
                field: segment.to_string(),
                expected: "object".to_string(),
            })?
            .get(segment)
            .ok_or_else(|| DataShapeError::MissingField {
                field: path.to_string(),
            })?;
    }
    Ok(current)
}

/// Render an optional JSON scalar as text, empty when absent or null
pub fn text_or_empty(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
