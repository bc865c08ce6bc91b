//! Per-unit fetching with timeout, retry and backoff
//!
//! A [`Fetcher`] turns one work unit into either the raw JSON payload or a
//! terminal failure. Transport errors, timeouts and non-2xx statuses are
//! retried with exponential backoff; a body that is not JSON or lacks the
//! source's required field fails the unit immediately.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::app::client::Transport;
use crate::app::limiter::DispatchLimiter;
use crate::app::models::{RunContext, WorkUnit};
use crate::app::normalize::Normalizer;
use crate::app::payload::PayloadBuilder;
use crate::errors::{DataShapeError, TransportError};

pub mod retry;

pub use retry::RetryPolicy;

/// Error kind recorded for a failed unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Response was not JSON or missed a required field
    DataShape,
    /// Every attempt failed with a retryable error
    ExhaustedRetries,
    /// The request could not be built or sent
    InvalidRequest,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::DataShape => "data_shape",
            ErrorKind::ExhaustedRetries => "exhausted_retries",
            ErrorKind::InvalidRequest => "invalid_request",
        };
        f.write_str(name)
    }
}

/// Why a unit failed
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// Non-retryable response shape problem
    DataShape(DataShapeError),
    /// Retries used up; carries the last retryable error
    ExhaustedRetries { last_error: String },
    /// Request could not be built or sent
    InvalidRequest { reason: String },
}

impl FailureKind {
    /// Summary kind of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            FailureKind::DataShape(_) => ErrorKind::DataShape,
            FailureKind::ExhaustedRetries { .. } => ErrorKind::ExhaustedRetries,
            FailureKind::InvalidRequest { .. } => ErrorKind::InvalidRequest,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::DataShape(e) => write!(f, "{}", e),
            FailureKind::ExhaustedRetries { last_error } => {
                write!(f, "retries exhausted, last error: {}", last_error)
            }
            FailureKind::InvalidRequest { reason } => write!(f, "invalid request: {}", reason),
        }
    }
}

/// Outcome of fetching one unit
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Raw payload that passed the shape check on attempt `attempts`
    Success { raw: Value, attempts: u32 },
    /// Terminal failure after `attempts` attempts
    Failure { kind: FailureKind, attempts: u32 },
}

impl FetchResult {
    /// Whether the fetch succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    /// Requests sent for this unit; zero when nothing was dispatched
    pub fn attempts(&self) -> u32 {
        match self {
            FetchResult::Success { attempts, .. } | FetchResult::Failure { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Fetches single work units through the transport
pub struct Fetcher {
    builder: Arc<dyn PayloadBuilder>,
    transport: Arc<dyn Transport>,
    normalizer: Arc<dyn Normalizer>,
    limiter: Arc<DispatchLimiter>,
    context: RunContext,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("source", &self.builder.source_name())
            .field("retry", &self.retry)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Fetcher {
    /// Create a fetcher
    pub fn new(
        builder: Arc<dyn PayloadBuilder>,
        transport: Arc<dyn Transport>,
        normalizer: Arc<dyn Normalizer>,
        limiter: Arc<DispatchLimiter>,
        context: RunContext,
        retry: RetryPolicy,
        request_timeout: Duration,
    ) -> Self {
        Self {
            builder,
            transport,
            normalizer,
            limiter,
            context,
            retry,
            request_timeout,
        }
    }

    /// Retry policy in use
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch one unit
    ///
    /// The caller holds a dispatch permit for the whole call and applies the
    /// pacing delay once the result is known.
    pub async fn fetch(&self, unit: &WorkUnit) -> FetchResult {
        let payload = match self.builder.build(unit, &self.context) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Cannot build request for {}: {}", unit, e);
                return FetchResult::Failure {
                    kind: FailureKind::InvalidRequest {
                        reason: e.to_string(),
                    },
                    attempts: 0,
                };
            }
        };

        let max_attempts = self.retry.max_attempts;
        let mut last_error = String::new();

        for attempt_index in 0..max_attempts {
            let attempts = attempt_index + 1;
            self.limiter.until_ready().await;
            debug!("Fetching {} (attempt {}/{})", unit, attempts, max_attempts);

            let outcome = tokio::time::timeout(
                self.request_timeout,
                self.transport.send(&payload, self.request_timeout),
            )
            .await;

            last_error = match outcome {
                Err(_) => format!("timed out after {:?}", self.request_timeout),
                Ok(Err(TransportError::InvalidRequest { reason })) => {
                    error!("Request for {} rejected: {}", unit, reason);
                    return FetchResult::Failure {
                        kind: FailureKind::InvalidRequest { reason },
                        attempts,
                    };
                }
                Ok(Err(e)) => e.to_string(),
                Ok(Ok(response)) if !response.is_success() => {
                    TransportError::Status {
                        status: response.status,
                    }
                    .to_string()
                }
                Ok(Ok(response)) => match self.parse(&response.body) {
                    Ok(raw) => return FetchResult::Success { raw, attempts },
                    Err(e) => {
                        warn!("Malformed response for {}: {}", unit, e);
                        return FetchResult::Failure {
                            kind: FailureKind::DataShape(e),
                            attempts,
                        };
                    }
                },
            };

            if self.retry.has_next(attempt_index) {
                let delay = self.retry.delay_for(attempt_index);
                warn!(
                    "Attempt {}/{} for {} failed: {}. Retrying in {:?}",
                    attempts, max_attempts, unit, last_error, delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        error!(
            "Giving up on {} after {} attempts: {}",
            unit, max_attempts, last_error
        );
        FetchResult::Failure {
            kind: FailureKind::ExhaustedRetries { last_error },
            attempts: max_attempts,
        }
    }

    fn parse(&self, body: &str) -> Result<Value, DataShapeError> {
        let raw: Value = serde_json::from_str(body).map_err(|e| DataShapeError::InvalidJson {
            reason: e.to_string(),
        })?;
        self.normalizer.check_shape(&raw)?;
        Ok(raw)
    }
}
