//! Dispatch limiting: concurrency bound, pacing and request quota
//!
//! Every fetch holds a [`DispatchPermit`] for its whole duration, so the number
//! of fetches in flight never exceeds `max_concurrency`. Pacing is a delay taken
//! after every dispatched fetch while the permit is still held, which spaces out the
//! requests issued through each slot. The optional quota is a global
//! requests-per-second ceiling awaited before every attempt.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

use crate::constants::limits;
use crate::errors::{ConfigError, ConfigResult};

type DirectLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// Delay applied after each dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacingPolicy {
    /// No delay
    #[default]
    None,
    /// Constant delay
    Fixed(Duration),
    /// Uniformly random delay in `[min, max]`
    Jitter { min: Duration, max: Duration },
}

impl PacingPolicy {
    /// Fixed one second delay used by the price calendar
    pub fn prices() -> Self {
        Self::Fixed(limits::PRICE_REQUEST_DELAY)
    }

    /// Randomized 0.5 to 1.5 second delay used by the schedules
    pub fn schedules() -> Self {
        Self::Jitter {
            min: limits::SCHEDULE_JITTER_MIN,
            max: limits::SCHEDULE_JITTER_MAX,
        }
    }

    /// Draw the next delay
    pub fn next_delay(&self) -> Duration {
        match *self {
            PacingPolicy::None => Duration::ZERO,
            PacingPolicy::Fixed(delay) => delay,
            PacingPolicy::Jitter { min, max } => {
                let min_ms = min.as_millis() as u64;
                let max_ms = max.as_millis() as u64;
                Duration::from_millis(fastrand::u64(min_ms..=max_ms))
            }
        }
    }

    /// Validate the policy bounds
    pub fn validate(&self) -> ConfigResult<()> {
        if let PacingPolicy::Jitter { min, max } = self {
            if min > max {
                return Err(ConfigError::invalid_value(
                    "pacing",
                    format!("{:?}..{:?}", min, max),
                    "jitter minimum must not exceed maximum",
                ));
            }
        }
        Ok(())
    }
}

/// Bounds and paces concurrent fetches
#[derive(Debug)]
pub struct DispatchLimiter {
    semaphore: Semaphore,
    max_concurrency: usize,
    pacing: PacingPolicy,
    quota: Option<DirectLimiter>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl DispatchLimiter {
    /// Creates a limiter
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `max_concurrency` is zero, the pacing bounds
    /// are inverted or the request quota is zero.
    pub fn new(
        max_concurrency: usize,
        pacing: PacingPolicy,
        rate_limit_rps: Option<u32>,
    ) -> ConfigResult<Self> {
        if max_concurrency == 0 {
            return Err(ConfigError::invalid_value(
                "max_concurrency",
                0,
                "at least one concurrent fetch is required",
            ));
        }
        pacing.validate()?;

        let quota = rate_limit_rps
            .map(|rps| {
                NonZeroU32::new(rps)
                    .map(|rps| RateLimiter::direct(Quota::per_second(rps)))
                    .ok_or_else(|| {
                        ConfigError::invalid_value(
                            "rate_limit_rps",
                            0,
                            "rate limit must be non-zero",
                        )
                    })
            })
            .transpose()?;

        Ok(Self {
            semaphore: Semaphore::new(max_concurrency),
            max_concurrency,
            pacing,
            quota,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    /// Wait for a dispatch slot
    ///
    /// Returns `None` once the limiter has been closed.
    pub async fn acquire(&self) -> Option<DispatchPermit<'_>> {
        let permit = self.semaphore.acquire().await.ok()?;
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        Some(DispatchPermit {
            _permit: permit,
            limiter: self,
        })
    }

    /// Stop handing out new slots; held permits stay valid
    pub fn close(&self) {
        debug!("Closing dispatch limiter");
        self.semaphore.close();
    }

    /// Whether the limiter has been closed
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Wait until the request quota allows another attempt
    pub async fn until_ready(&self) {
        if let Some(quota) = &self.quota {
            quota
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
                .await;
        }
    }

    /// Sleep for one pacing delay
    pub async fn pace(&self) {
        let delay = self.pacing.next_delay();
        if !delay.is_zero() {
            debug!("Pacing for {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Maximum number of concurrent fetches
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Pacing policy
    pub fn pacing(&self) -> PacingPolicy {
        self.pacing
    }

    /// Fetches currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of fetches ever held at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// Slot held for the duration of one fetch; released on drop
#[derive(Debug)]
pub struct DispatchPermit<'a> {
    _permit: SemaphorePermit<'a>,
    limiter: &'a DispatchLimiter,
}

impl Drop for DispatchPermit<'_> {
    fn drop(&mut self) {
        self.limiter.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
