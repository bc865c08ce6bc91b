//! Application constants for Park Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// API token sent as `Authorization: Token <value>` by the HTTP transport
    pub const API_TOKEN: &str = "PARK_FETCHER_API_TOKEN";

    /// Proxy URL applied to all outgoing requests
    pub const PROXY: &str = "PARK_FETCHER_PROXY";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

    /// Per-attempt request deadline
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 16;
}

/// Rate limiting and retry configuration
pub mod limits {
    use super::Duration;

    /// Maximum attempts per work unit
    pub const MAX_RETRIES: u32 = 3;

    /// Base of the exponential backoff, in seconds (`base ^ attempt_index`)
    pub const BACKOFF_BASE: f64 = 2.0;

    /// Maximum backoff delay
    pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

    /// Default number of concurrent fetches
    pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

    /// Upper bound accepted for concurrent fetches
    pub const MAX_CONCURRENCY_LIMIT: usize = 256;

    /// Fixed pacing delay used by the price calendar source
    pub const PRICE_REQUEST_DELAY: Duration = Duration::from_secs(1);

    /// Lower bound of the randomized pacing delay used by the schedule source
    pub const SCHEDULE_JITTER_MIN: Duration = Duration::from_millis(500);

    /// Upper bound of the randomized pacing delay used by the schedule source
    pub const SCHEDULE_JITTER_MAX: Duration = Duration::from_millis(1500);
}

/// Remote API endpoints and request constants
pub mod api {
    /// Ticket price calendar endpoint
    pub const PRICE_CALENDAR_URL: &str =
        "https://api.disneylandparis.com/prices-calendar/api/v2/prices/ticket-price-calendar";

    /// GraphQL endpoint serving activity schedules
    pub const SCHEDULES_URL: &str = "https://api.disneylandparis.com/query";

    /// Origin header for the ticketing site
    pub const TICKETS_ORIGIN: &str = "https://tickets.disneylandparis.com";

    /// Origin header for the main site
    pub const SITE_ORIGIN: &str = "https://www.disneylandparis.com";

    /// Default market
    pub const DEFAULT_MARKET: &str = "nl-nl";

    /// Default currency
    pub const DEFAULT_CURRENCY: &str = "EUR";

    /// Sales channel sent with price requests
    pub const SALES_CHANNEL: &str = "DIRECT";

    /// Master category codes sent with price requests
    pub const MASTER_CATEGORY_CODES: [&str; 3] = ["EVENT", "TICKET", "TKTEXPERI"];

    /// Locations kept by the schedule normalizer by default
    pub const DEFAULT_TARGET_LOCATIONS: [&str; 2] =
        ["Disneyland Park", "Walt Disney Studios Park"];
}

/// Worker pool configuration
pub mod workers {
    /// Channel buffer size for unit outcome reporting
    pub const OUTCOME_BUFFER_SIZE: usize = 256;
}

/// Coordinator and orchestration constants
pub mod coordinator {
    use super::Duration;

    /// Maximum time to wait for in-flight units after cancellation
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(120);
}

/// Output constants
pub mod output {
    /// Default output directory
    pub const DEFAULT_OUTPUT_DIR: &str = "output";

    /// Suffix of the run summary file written next to the records
    pub const SUMMARY_SUFFIX: &str = "_summary.json";

    /// Log file used when file logging is enabled without a path
    pub const DEFAULT_LOG_FILE: &str = "park-fetcher.log";
}

// Re-export commonly used constants for convenience
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{BACKOFF_BASE, DEFAULT_MAX_CONCURRENCY, MAX_RETRIES};
