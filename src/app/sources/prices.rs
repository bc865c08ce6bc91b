//! Ticket price calendar source
//!
//! One request per product configuration covering the whole date window; the
//! response carries a `calendar` array with one entry per day and the prices
//! of every product sold on that day.

use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::app::models::{PriceRecord, RunContext, WorkUnit};
use crate::app::normalize::{lookup, text_or_empty, Normalized, Normalizer};
use crate::app::payload::{PayloadBuilder, RequestPayload};
use crate::constants::api;
use crate::errors::{ConfigError, ConfigResult, DataShapeError, ShapeResult};

const CALENDAR_FIELD: &str = "calendar";

/// Builds ticket price calendar requests
#[derive(Debug, Clone)]
pub struct PricePayloadBuilder {
    endpoint: Url,
}

impl PricePayloadBuilder {
    /// Builder targeting the public price calendar endpoint
    pub fn new() -> ConfigResult<Self> {
        Self::with_endpoint(api::PRICE_CALENDAR_URL)
    }

    /// Builder targeting a custom endpoint
    pub fn with_endpoint(endpoint: &str) -> ConfigResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ConfigError::invalid_value("endpoint", endpoint, e.to_string()))?;
        Ok(Self { endpoint })
    }
}

impl PayloadBuilder for PricePayloadBuilder {
    fn source_name(&self) -> &'static str {
        "prices"
    }

    fn supports(&self, unit: &WorkUnit) -> bool {
        unit.as_product().is_some()
    }

    fn build(&self, unit: &WorkUnit, context: &RunContext) -> ConfigResult<RequestPayload> {
        let product = unit.as_product().ok_or_else(|| self.unsupported(unit))?;

        let body = json!({
            "market": context.market,
            "currency": context.currency,
            "startDate": context.start_date.format("%Y-%m-%d").to_string(),
            "endDate": context.end_date.format("%Y-%m-%d").to_string(),
            "products": [{
                "productType": product.park_type,
                "adultProductCode": product.adult_code,
                "childProductCode": product.child_code,
            }],
            "eligibilityInformation": {
                "salesChannel": api::SALES_CHANNEL,
                "membershipType": "",
                "masterCategoryCodes": api::MASTER_CATEGORY_CODES,
            },
        });

        Ok(RequestPayload::new(self.endpoint.clone(), body)
            .with_header("Accept", "application/json")
            .with_header("Origin", api::TICKETS_ORIGIN)
            .with_header("Referer", format!("{}/", api::TICKETS_ORIGIN)))
    }
}

/// Extracts price rows for the unit's product from a calendar response
#[derive(Debug, Clone, Default)]
pub struct PriceNormalizer;

impl PriceNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Normalizer for PriceNormalizer {
    fn required_field(&self) -> &'static str {
        CALENDAR_FIELD
    }

    fn normalize(&self, unit: &WorkUnit, raw: &Value) -> ShapeResult<Normalized> {
        let calendar = lookup(raw, CALENDAR_FIELD)?;
        let days: &[Value] = match calendar {
            Value::Array(days) => days.as_slice(),
            Value::Null => &[],
            _ => {
                return Err(DataShapeError::UnexpectedType {
                    field: CALENDAR_FIELD.to_string(),
                    expected: "array".to_string(),
                })
            }
        };

        let mut normalized = Normalized::new();
        let Some(product) = unit.as_product() else {
            // Date units carry no product to select; nothing in the calendar matches.
            normalized.skipped = days.len();
            return Ok(normalized);
        };

        for day in days {
            let (Some(date), Some(products)) = (
                day.get("date").and_then(Value::as_str),
                day.get("products"),
            ) else {
                debug!("Skipping calendar entry without date or products");
                normalized.skip();
                continue;
            };

            let Some(park) = products.get(&product.park_type) else {
                debug!(
                    "Park type {} not found in products for date {}",
                    product.park_type, date
                );
                normalized.skip();
                continue;
            };

            // Absent and explicitly false are treated the same.
            let available = park.get("available").and_then(Value::as_bool).unwrap_or(false);

            let record = if available {
                PriceRecord {
                    date: date.to_string(),
                    deal_category: product.deal_category.clone(),
                    park_category: product.park_type.clone(),
                    available: "Yes".to_string(),
                    adult_price: text_or_empty(park.get("priceAdult")),
                    child_price: text_or_empty(park.get("priceChild")),
                    range: text_or_empty(park.get("range")),
                }
            } else {
                PriceRecord {
                    date: date.to_string(),
                    deal_category: product.deal_category.clone(),
                    park_category: product.park_type.clone(),
                    available: "No".to_string(),
                    adult_price: String::new(),
                    child_price: String::new(),
                    range: String::new(),
                }
            };
            normalized.push(record);
        }

        Ok(normalized)
    }
}
