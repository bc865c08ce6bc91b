//! Work unit enumeration
//!
//! Turns a work plan into the complete, ordered list of units before any
//! fetching starts. Enumeration has no side effects and fails only on an
//! invalid plan.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::models::{ProductConfig, WorkUnit};
use crate::errors::{ConfigError, ConfigResult};

/// What a run should fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkPlan {
    /// One unit per date, both ends inclusive
    DateRange { start: NaiveDate, end: NaiveDate },
    /// One unit per product configuration, in the given order
    Products(Vec<ProductConfig>),
}

/// Produces the ordered work unit sequence for a plan
pub struct WorkUnitEnumerator;

impl WorkUnitEnumerator {
    /// Enumerate every unit of the plan
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDateRange` when `start > end` and
    /// `ConfigError::EmptyProductList` for an empty product plan.
    pub fn enumerate(plan: &WorkPlan) -> ConfigResult<Vec<WorkUnit>> {
        let units = match plan {
            WorkPlan::DateRange { start, end } => Self::dates(*start, *end)?,
            WorkPlan::Products(products) => Self::products(products)?,
        };

        debug!("Enumerated {} work units", units.len());
        Ok(units)
    }

    fn dates(start: NaiveDate, end: NaiveDate) -> ConfigResult<Vec<WorkUnit>> {
        if start > end {
            return Err(ConfigError::InvalidDateRange { start, end });
        }

        Ok(start
            .iter_days()
            .take_while(|date| *date <= end)
            .map(WorkUnit::Date)
            .collect())
    }

    fn products(products: &[ProductConfig]) -> ConfigResult<Vec<WorkUnit>> {
        if products.is_empty() {
            return Err(ConfigError::EmptyProductList);
        }

        let mut seen = HashSet::with_capacity(products.len());
        let mut units = Vec::with_capacity(products.len());
        for product in products {
            if seen.insert(product) {
                units.push(WorkUnit::Product(product.clone()));
            } else {
                warn!(
                    "Ignoring duplicate product configuration: {} - {}",
                    product.deal_category, product.park_type
                );
            }
        }

        Ok(units)
    }
}
