//! Activity schedule source
//!
//! One GraphQL request per date. The response lists every activity of the
//! resort with its schedules for that day; only the park-level activities
//! named in the target set are kept.

use std::collections::BTreeSet;

use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::app::models::{RunContext, ScheduleRecord, WorkUnit};
use crate::app::normalize::{lookup, text_or_empty, Normalized, Normalizer};
use crate::app::payload::{PayloadBuilder, RequestPayload};
use crate::constants::api;
use crate::errors::{ConfigError, ConfigResult, DataShapeError, ShapeResult};

const SCHEDULES_FIELD: &str = "data.activitySchedules";

const ACTIVITY_SCHEDULES_QUERY: &str = "query activitySchedules($market: String!, $types: [ActivityScheduleStatusInput]!, $date: String!) {
  activitySchedules(market: $market, date: $date, types: $types) {
    id
    name
    url
    urlFriendlyId
    hideFunctionality
    shortDescription
    iconFont
    subType
    thumbMedia {
      url
      alt
      __typename
    }
    subLocation {
      ...location
      __typename
    }
    location {
      ...location
      __typename
    }
    type
    schedules(date: $date, types: $types) {
      startTime
      endTime
      date
      status
      closed
      language
      __typename
    }
    __typename
  }
}

fragment location on Location {
  id
  value
  urlFriendlyId
  iconFont
  url
  __typename
}
";

/// Builds GraphQL activity schedule requests
#[derive(Debug, Clone)]
pub struct SchedulePayloadBuilder {
    endpoint: Url,
}

impl SchedulePayloadBuilder {
    /// Builder targeting the public GraphQL endpoint
    pub fn new() -> ConfigResult<Self> {
        Self::with_endpoint(api::SCHEDULES_URL)
    }

    /// Builder targeting a custom endpoint
    pub fn with_endpoint(endpoint: &str) -> ConfigResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ConfigError::invalid_value("endpoint", endpoint, e.to_string()))?;
        Ok(Self { endpoint })
    }
}

impl PayloadBuilder for SchedulePayloadBuilder {
    fn source_name(&self) -> &'static str {
        "schedules"
    }

    fn supports(&self, unit: &WorkUnit) -> bool {
        unit.as_date().is_some()
    }

    fn build(&self, unit: &WorkUnit, context: &RunContext) -> ConfigResult<RequestPayload> {
        let date = unit.as_date().ok_or_else(|| self.unsupported(unit))?;

        let body = json!({
            "operationName": "activitySchedules",
            "variables": {
                "market": context.market,
                "types": [
                    {"type": "ThemePark", "status": ["OPERATING", "EXTRA_MAGIC_HOURS"]},
                    {"type": "Attraction", "status": ["REFURBISHMENT", "OPERATING", "CLOSED_OPS"]},
                    {"type": "Entertainment", "status": "PERFORMANCE_TIME"},
                ],
                "date": date.format("%Y-%m-%d").to_string(),
            },
            "query": ACTIVITY_SCHEDULES_QUERY,
        });

        Ok(RequestPayload::new(self.endpoint.clone(), body)
            .with_header("Accept", "*/*")
            .with_header("Origin", api::SITE_ORIGIN)
            .with_header("Referer", format!("{}/", api::SITE_ORIGIN)))
    }
}

/// Extracts schedule rows of the target locations
#[derive(Debug, Clone)]
pub struct ScheduleNormalizer {
    target_locations: BTreeSet<String>,
}

impl Default for ScheduleNormalizer {
    fn default() -> Self {
        Self::new(api::DEFAULT_TARGET_LOCATIONS)
    }
}

impl ScheduleNormalizer {
    /// Normalizer keeping only activities whose name is in `locations`
    pub fn new<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_locations: locations.into_iter().map(Into::into).collect(),
        }
    }

    /// Locations kept by this normalizer
    pub fn target_locations(&self) -> &BTreeSet<String> {
        &self.target_locations
    }
}

impl Normalizer for ScheduleNormalizer {
    fn required_field(&self) -> &'static str {
        SCHEDULES_FIELD
    }

    fn normalize(&self, unit: &WorkUnit, raw: &Value) -> ShapeResult<Normalized> {
        let activities: &[Value] = match lookup(raw, SCHEDULES_FIELD)? {
            Value::Array(activities) => activities.as_slice(),
            Value::Null => &[],
            _ => {
                return Err(DataShapeError::UnexpectedType {
                    field: SCHEDULES_FIELD.to_string(),
                    expected: "array".to_string(),
                })
            }
        };

        let mut normalized = Normalized::new();
        let Some(date) = unit.as_date() else {
            normalized.skipped = activities.len();
            return Ok(normalized);
        };
        let date = date.format("%Y-%m-%d").to_string();

        for activity in activities {
            let location = match activity.get("name").and_then(Value::as_str) {
                Some(name) if self.target_locations.contains(name) => name,
                _ => {
                    normalized.skip();
                    continue;
                }
            };

            let schedules = activity
                .get("schedules")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            for schedule in schedules {
                normalized.push(ScheduleRecord {
                    date: date.clone(),
                    location: location.to_string(),
                    status: text_or_empty(schedule.get("status")),
                    starting_time: text_or_empty(schedule.get("startTime")),
                    ending_time: text_or_empty(schedule.get("endTime")),
                });
            }
        }

        debug!(
            "Normalized {} schedule records for {} ({} activities skipped)",
            normalized.records.len(),
            date,
            normalized.skipped
        );
        Ok(normalized)
    }
}
