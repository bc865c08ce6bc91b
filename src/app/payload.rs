//! Request payload construction seam
//!
//! A payload builder turns one work unit plus the run context into the request
//! the transport sends. Builders are vendor specific and live in `sources`.

use std::collections::BTreeMap;

use serde_json::Value;
use url::Url;

use super::models::{RunContext, WorkUnit};
use crate::errors::{ConfigError, ConfigResult};

/// A fully built request for one work unit
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPayload {
    /// Endpoint the JSON body is posted to
    pub url: Url,
    /// Vendor-specific headers (auth, proxy and user agent belong to the transport)
    pub headers: BTreeMap<String, String>,
    /// JSON body
    pub body: Value,
}

impl RequestPayload {
    /// Create a payload without extra headers
    pub fn new(url: Url, body: Value) -> Self {
        Self {
            url,
            headers: BTreeMap::new(),
            body,
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Builds vendor requests for work units
pub trait PayloadBuilder: Send + Sync {
    /// Short source name used in logs and errors
    fn source_name(&self) -> &'static str;

    /// Whether this builder can build a request for the unit
    fn supports(&self, unit: &WorkUnit) -> bool;

    /// Build the request for one unit
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnsupportedWorkUnit` for units this builder does not support.
    fn build(&self, unit: &WorkUnit, context: &RunContext) -> ConfigResult<RequestPayload>;

    /// Error for an unsupported unit, shared by implementations
    fn unsupported(&self, unit: &WorkUnit) -> ConfigError {
        ConfigError::UnsupportedWorkUnit {
            unit: unit.to_string(),
            source_name: self.source_name().to_string(),
        }
    }
}
