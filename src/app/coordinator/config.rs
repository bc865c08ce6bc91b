//! Run configuration for the coordinator
//!
//! Everything a run needs besides its collaborators: the work plan, the shared
//! request context, and the concurrency, retry, pacing and timing policies.

use std::time::Duration;

use chrono::NaiveDate;

use crate::app::enumerator::WorkPlan;
use crate::app::fetcher::RetryPolicy;
use crate::app::limiter::PacingPolicy;
use crate::app::models::{ProductConfig, RunContext};
use crate::constants::{coordinator, http, limits};
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for one coordinated run
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// What to fetch
    pub plan: WorkPlan,
    /// Market, currency and date window sent with every request
    pub context: RunContext,
    /// Maximum concurrent fetches
    pub max_concurrency: usize,
    /// Attempts and backoff per unit
    pub retry: RetryPolicy,
    /// Delay after each request
    pub pacing: PacingPolicy,
    /// Deadline for each attempt
    pub request_timeout: Duration,
    /// Optional global requests-per-second ceiling
    pub rate_limit_rps: Option<u32>,
    /// Cancel the run once this much time has passed
    pub run_deadline: Option<Duration>,
    /// Maximum time to wait for in-flight units after cancellation
    pub shutdown_timeout: Duration,
    /// Listen for Ctrl+C and SIGTERM during the run
    pub handle_signals: bool,
}

impl CoordinatorConfig {
    /// Configuration with default policies for `plan`
    pub fn new(plan: WorkPlan, context: RunContext) -> Self {
        Self {
            plan,
            context,
            max_concurrency: limits::DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::default(),
            pacing: PacingPolicy::None,
            request_timeout: http::DEFAULT_TIMEOUT,
            rate_limit_rps: None,
            run_deadline: None,
            shutdown_timeout: coordinator::SHUTDOWN_TIMEOUT,
            handle_signals: false,
        }
    }

    /// Price calendar run: one unit per product over `[start, end]`
    pub fn prices(products: Vec<ProductConfig>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(WorkPlan::Products(products), RunContext::new(start, end))
            .with_pacing(PacingPolicy::prices())
    }

    /// Schedule run: one unit per date in `[start, end]`
    pub fn schedules(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(
            WorkPlan::DateRange { start, end },
            RunContext::new(start, end),
        )
        .with_pacing(PacingPolicy::schedules())
    }

    /// Set the concurrency bound
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the number of attempts per unit
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_attempts = max_retries;
        self
    }

    /// Replace the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the pacing policy
    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the per-attempt deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set a global requests-per-second ceiling
    pub fn with_rate_limit(mut self, rps: u32) -> Self {
        self.rate_limit_rps = Some(rps);
        self
    }

    /// Cancel the run after `deadline`
    pub fn with_run_deadline(mut self, deadline: Duration) -> Self {
        self.run_deadline = Some(deadline);
        self
    }

    /// Set shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Enable or disable Ctrl+C and SIGTERM handling
    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Set the market and currency
    pub fn with_market(mut self, market: impl Into<String>, currency: impl Into<String>) -> Self {
        self.context.market = market.into();
        self.context.currency = currency.into();
        self
    }

    /// Validate the configuration
    ///
    /// The plan itself is checked by the enumerator.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrency == 0 || self.max_concurrency > limits::MAX_CONCURRENCY_LIMIT {
            return Err(ConfigError::invalid_value(
                "max_concurrency",
                self.max_concurrency,
                format!("must be between 1 and {}", limits::MAX_CONCURRENCY_LIMIT),
            ));
        }

        self.retry.validate()?;
        self.pacing.validate()?;

        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "request_timeout",
                "0s",
                "request timeout must be positive",
            ));
        }

        if self.rate_limit_rps == Some(0) {
            return Err(ConfigError::invalid_value(
                "rate_limit_rps",
                0,
                "rate limit must be non-zero",
            ));
        }

        if self.run_deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(ConfigError::invalid_value(
                "run_deadline",
                "0s",
                "run deadline must be positive",
            ));
        }

        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "shutdown_timeout",
                "0s",
                "shutdown timeout cannot be zero",
            ));
        }

        if self.context.start_date > self.context.end_date {
            return Err(ConfigError::InvalidDateRange {
                start: self.context.start_date,
                end: self.context.end_date,
            });
        }

        Ok(())
    }
}
