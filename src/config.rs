//! Configuration management for Park Fetcher
//!
//! This module provides the TOML configuration file, its search locations,
//! the commented default file written by `config init`, and the conversion
//! of file settings into the runtime configurations used by a run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use humantime_serde::re::humantime::format_duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{
    ClientConfig, CoordinatorConfig, OutputFormat, OutputTarget, PacingPolicy,
    PricePayloadBuilder, ProductConfig, RetryPolicy, ScheduleNormalizer, SchedulePayloadBuilder,
};
use crate::constants::{api, coordinator, http, limits, output};
use crate::errors::{AppError, ConfigError, ConfigResult, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Retry, timeout and concurrency settings shared by both sources
    pub fetch: FetchConfigToml,
    /// Market and currency sent with every request
    pub market: MarketConfigToml,
    /// Ticket price calendar settings
    pub prices: PricesConfigToml,
    /// Park schedule settings
    pub schedules: SchedulesConfigToml,
    /// Output files
    pub output: OutputConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    pub user_agent: String,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Duration,
    pub pool_max_per_host: usize,
    pub tcp_nodelay: bool,
    /// Proxy URL; `PARK_FETCHER_PROXY` takes precedence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            user_agent: http::USER_AGENT.to_string(),
            connect_timeout: http::CONNECT_TIMEOUT,
            pool_idle_timeout: http::POOL_IDLE_TIMEOUT,
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            tcp_nodelay: true,
            proxy: None,
        }
    }
}

/// TOML-friendly fetch policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfigToml {
    /// Maximum concurrent fetches
    pub max_concurrency: usize,
    /// Attempts per unit, including the first
    pub max_retries: u32,
    /// Backoff after attempt `i` is `backoff_base ^ i` seconds
    pub backoff_base: f64,
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    /// Deadline of a single attempt
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Optional global requests-per-second ceiling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_rps: Option<u32>,
    /// Cancel the run after this long
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub run_deadline: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for FetchConfigToml {
    fn default() -> Self {
        Self {
            max_concurrency: limits::DEFAULT_MAX_CONCURRENCY,
            max_retries: limits::MAX_RETRIES,
            backoff_base: limits::BACKOFF_BASE,
            max_backoff: limits::MAX_BACKOFF,
            request_timeout: http::DEFAULT_TIMEOUT,
            rate_limit_rps: None,
            run_deadline: None,
            shutdown_timeout: coordinator::SHUTDOWN_TIMEOUT,
        }
    }
}

/// TOML-friendly market configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfigToml {
    pub market: String,
    pub currency: String,
}

impl Default for MarketConfigToml {
    fn default() -> Self {
        Self {
            market: api::DEFAULT_MARKET.to_string(),
            currency: api::DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// TOML-friendly price calendar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricesConfigToml {
    pub endpoint: String,
    /// Fixed delay after each request
    #[serde(with = "humantime_serde")]
    pub request_delay: Duration,
    /// Product configurations, one work unit each
    pub products: Vec<ProductConfig>,
}

impl Default for PricesConfigToml {
    fn default() -> Self {
        Self {
            endpoint: api::PRICE_CALENDAR_URL.to_string(),
            request_delay: limits::PRICE_REQUEST_DELAY,
            products: ProductConfig::default_catalogue(),
        }
    }
}

/// TOML-friendly schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulesConfigToml {
    pub endpoint: String,
    /// Lower bound of the random delay after each request
    #[serde(with = "humantime_serde")]
    pub jitter_min: Duration,
    /// Upper bound of the random delay after each request
    #[serde(with = "humantime_serde")]
    pub jitter_max: Duration,
    /// Locations kept in the output
    pub target_locations: Vec<String>,
}

impl Default for SchedulesConfigToml {
    fn default() -> Self {
        Self {
            endpoint: api::SCHEDULES_URL.to_string(),
            jitter_min: limits::SCHEDULE_JITTER_MIN,
            jitter_max: limits::SCHEDULE_JITTER_MAX,
            target_locations: api::DEFAULT_TARGET_LOCATIONS
                .iter()
                .map(|location| location.to_string())
                .collect(),
        }
    }
}

/// TOML-friendly output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfigToml {
    pub dir: PathBuf,
    pub formats: Vec<OutputFormat>,
    /// File name of the price output, without extension
    pub prices_stem: String,
    /// File name of the schedule output, without extension
    pub schedules_stem: String,
}

impl Default for OutputConfigToml {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(output::DEFAULT_OUTPUT_DIR),
            formats: vec![OutputFormat::Json, OutputFormat::Csv],
            prices_stem: "prices".to_string(),
            schedules_stem: "times".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,
    /// Also write logs to a file
    pub file_logging: bool,
    /// Log file path (if file_logging is enabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_file: None,
        }
    }
}

impl LoggingConfig {
    /// File to append logs to, if file logging is enabled
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.file_logging.then(|| {
            self.log_file
                .clone()
                .unwrap_or_else(|| PathBuf::from(output::DEFAULT_LOG_FILE))
        })
    }
}

impl AppConfig {
    /// Load configuration from file, or defaults when no file exists
    ///
    /// An explicitly given file must exist; otherwise the standard locations
    /// are searched in order and the first file found wins.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Write the commented default configuration file
    ///
    /// Writes to `path`, or to the user config directory when `None`. An
    /// existing file is only replaced when `force` is set.
    pub async fn write_default(path: Option<PathBuf>, force: bool) -> Result<PathBuf> {
        let config_path = match path {
            Some(path) => path,
            None => Self::default_config_path()?,
        };

        if config_path.exists() && !force {
            return Err(AppError::generic(format!(
                "Config file already exists: {} (use --force to overwrite)",
                config_path.display()
            )));
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(ConfigError::from)?;
            }
        }

        tokio::fs::write(&config_path, Self::generate_default_config_content())
            .await
            .map_err(ConfigError::from)?;

        info!("Created configuration file: {}", config_path.display());
        Ok(config_path)
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::generic(format!("Failed to render configuration: {}", e)))
    }

    /// Validate the file settings that runtime configs do not cover
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.client_config().validate() {
            errors.push(e.to_string());
        }
        if self.fetch.max_concurrency == 0
            || self.fetch.max_concurrency > limits::MAX_CONCURRENCY_LIMIT
        {
            errors.push(format!(
                "fetch.max_concurrency must be between 1 and {}",
                limits::MAX_CONCURRENCY_LIMIT
            ));
        }
        if let Err(e) = self.retry_policy().validate() {
            errors.push(e.to_string());
        }
        if self.prices.products.is_empty() {
            errors.push("prices.products must not be empty".to_string());
        }
        if self.schedules.jitter_min > self.schedules.jitter_max {
            errors.push("schedules.jitter_min must not exceed schedules.jitter_max".to_string());
        }
        if self.schedules.target_locations.is_empty() {
            errors.push("schedules.target_locations must not be empty".to_string());
        }
        if self.output.formats.is_empty() {
            errors.push("output.formats must list at least one format".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors })
        }
    }

    /// HTTP client configuration with environment overrides applied
    pub fn client_config(&self) -> ClientConfig {
        self.client.to_runtime_config().with_env_overrides()
    }

    /// Retry policy from the fetch settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch.max_retries,
            backoff_base: self.fetch.backoff_base,
            max_backoff: self.fetch.max_backoff,
        }
    }

    /// Run configuration for the price calendar over `[start, end]`
    pub fn prices_run(&self, start: NaiveDate, end: NaiveDate) -> CoordinatorConfig {
        let pacing = if self.prices.request_delay.is_zero() {
            PacingPolicy::None
        } else {
            PacingPolicy::Fixed(self.prices.request_delay)
        };
        let config = CoordinatorConfig::prices(self.prices.products.clone(), start, end)
            .with_pacing(pacing);
        self.apply_fetch_settings(config)
    }

    /// Run configuration for the park schedules over `[start, end]`
    pub fn schedules_run(&self, start: NaiveDate, end: NaiveDate) -> CoordinatorConfig {
        let config = CoordinatorConfig::schedules(start, end).with_pacing(PacingPolicy::Jitter {
            min: self.schedules.jitter_min,
            max: self.schedules.jitter_max,
        });
        self.apply_fetch_settings(config)
    }

    /// Payload builder for the configured price endpoint
    pub fn price_builder(&self) -> ConfigResult<PricePayloadBuilder> {
        PricePayloadBuilder::with_endpoint(&self.prices.endpoint)
    }

    /// Payload builder for the configured schedule endpoint
    pub fn schedule_builder(&self) -> ConfigResult<SchedulePayloadBuilder> {
        SchedulePayloadBuilder::with_endpoint(&self.schedules.endpoint)
    }

    /// Normalizer keeping the configured locations
    pub fn schedule_normalizer(&self) -> ScheduleNormalizer {
        ScheduleNormalizer::new(self.schedules.target_locations.iter().cloned())
    }

    /// Output location of the price run
    pub fn prices_target(&self) -> OutputTarget {
        OutputTarget::new(self.output.dir.clone(), self.output.prices_stem.clone())
    }

    /// Output location of the schedule run
    pub fn schedules_target(&self) -> OutputTarget {
        OutputTarget::new(self.output.dir.clone(), self.output.schedules_stem.clone())
    }

    fn apply_fetch_settings(&self, config: CoordinatorConfig) -> CoordinatorConfig {
        let mut config = config
            .with_market(self.market.market.clone(), self.market.currency.clone())
            .with_max_concurrency(self.fetch.max_concurrency)
            .with_retry_policy(self.retry_policy())
            .with_request_timeout(self.fetch.request_timeout)
            .with_shutdown_timeout(self.fetch.shutdown_timeout);
        if let Some(rps) = self.fetch.rate_limit_rps {
            config = config.with_rate_limit(rps);
        }
        if let Some(deadline) = self.fetch.run_deadline {
            config = config.with_run_deadline(deadline);
        }
        config
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![
            // Project-local config
            PathBuf::from("./park-fetcher.toml"),
            PathBuf::from("./config.toml"),
        ];
        // User config
        if let Ok(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        for path in search_paths {
            if path.exists() {
                debug!("Found config file: {}", path.display());
                return Some(path);
            }
        }

        None
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;

        Ok(config_dir.join("park-fetcher").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(ConfigError::from)?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::from)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    fn generate_default_config_content() -> String {
        let products = ProductConfig::default_catalogue()
            .iter()
            .map(|product| {
                format!(
                    "[[prices.products]]\npark_type = \"{}\"\ndeal_category = \"{}\"\nadult_code = \"{}\"\nchild_code = \"{}\"\n",
                    product.park_type, product.deal_category, product.adult_code, product.child_code
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let locations = api::DEFAULT_TARGET_LOCATIONS
            .iter()
            .map(|location| format!("\"{}\"", location))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            r#"# Park Fetcher Configuration
# Command-line flags override the values in this file.
# The API token is read from PARK_FETCHER_API_TOKEN, never from this file.

[client]
user_agent = "{user_agent}"
connect_timeout = "{connect_timeout}"
pool_idle_timeout = "{pool_idle_timeout}"
pool_max_per_host = {pool_max_per_host}
tcp_nodelay = true
# proxy = "http://127.0.0.1:8080"  # PARK_FETCHER_PROXY takes precedence

[fetch]
# Concurrent fetches (1-{concurrency_limit})
max_concurrency = {max_concurrency}
# Attempts per unit, including the first
max_retries = {max_retries}
# Backoff after attempt i is backoff_base^i seconds, capped at max_backoff
backoff_base = {backoff_base:.1}
max_backoff = "{max_backoff}"
# Deadline of a single attempt
request_timeout = "{request_timeout}"
# rate_limit_rps = 10      # Global requests per second ceiling
# run_deadline = "30m"     # Cancel the run after this long
shutdown_timeout = "{shutdown_timeout}"

[market]
market = "{market}"
currency = "{currency}"

[prices]
endpoint = "{price_endpoint}"
# Delay after each request
request_delay = "{request_delay}"

[schedules]
endpoint = "{schedule_endpoint}"
# Random delay after each request
jitter_min = "{jitter_min}"
jitter_max = "{jitter_max}"
target_locations = [{locations}]

[output]
dir = "{output_dir}"
formats = ["json", "csv"]
prices_stem = "prices"
schedules_stem = "times"

[logging]
level = "info"  # error, warn, info, debug, trace
file_logging = false
# log_file = "{log_file}"

# Product configurations fetched by `park_fetcher prices`
{products}"#,
            user_agent = http::USER_AGENT,
            log_file = output::DEFAULT_LOG_FILE,
            connect_timeout = format_duration(http::CONNECT_TIMEOUT),
            pool_idle_timeout = format_duration(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host = http::POOL_MAX_PER_HOST,
            concurrency_limit = limits::MAX_CONCURRENCY_LIMIT,
            max_concurrency = limits::DEFAULT_MAX_CONCURRENCY,
            max_retries = limits::MAX_RETRIES,
            backoff_base = limits::BACKOFF_BASE,
            max_backoff = format_duration(limits::MAX_BACKOFF),
            request_timeout = format_duration(http::DEFAULT_TIMEOUT),
            shutdown_timeout = format_duration(coordinator::SHUTDOWN_TIMEOUT),
            market = api::DEFAULT_MARKET,
            currency = api::DEFAULT_CURRENCY,
            price_endpoint = api::PRICE_CALENDAR_URL,
            request_delay = format_duration(limits::PRICE_REQUEST_DELAY),
            schedule_endpoint = api::SCHEDULES_URL,
            jitter_min = format_duration(limits::SCHEDULE_JITTER_MIN),
            jitter_max = format_duration(limits::SCHEDULE_JITTER_MAX),
            locations = locations,
            output_dir = output::DEFAULT_OUTPUT_DIR,
            products = products,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            user_agent: self.user_agent.clone(),
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: Some(self.pool_idle_timeout),
            pool_max_per_host: self.pool_max_per_host,
            ..ClientConfig::default()
        }
        .with_connect_timeout(self.connect_timeout);
        if let Some(proxy) = &self.proxy {
            config = config.with_proxy(proxy.clone());
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::enumerator::WorkPlan;
    use tempfile::TempDir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_default_config_creation() {
        let config = AppConfig::default();

        assert_eq!(config.fetch.max_concurrency, limits::DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.prices.products.len(), 4);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.output.schedules_stem, "times");
        tokio_test::assert_ok!(config.validate());
    }

    #[tokio::test]
    async fn test_config_file_generation() {
        let content = AppConfig::generate_default_config_content();

        // Should be valid TOML matching the defaults
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        let defaults = AppConfig::default();

        assert!(content.contains("# Park Fetcher Configuration"));
        assert_eq!(parsed.prices.products, defaults.prices.products);
        assert_eq!(parsed.fetch.request_timeout, defaults.fetch.request_timeout);
        assert_eq!(parsed.schedules.jitter_min, Duration::from_millis(500));
        assert_eq!(parsed.schedules.target_locations, defaults.schedules.target_locations);
        assert_eq!(parsed.output.formats, vec![OutputFormat::Json, OutputFormat::Csv]);
        assert!(parsed.fetch.rate_limit_rps.is_none());
    }

    #[tokio::test]
    async fn test_config_loading_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        // Should fail when explicitly specified
        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_config_loading_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let test_config = r#"
[fetch]
max_concurrency = 12
request_timeout = "10s"
run_deadline = "15m"

[market]
market = "fr-fr"

[[prices.products]]
park_type = "1-day-1-park"
deal_category = "regular deal"
adult_code = "A1"
child_code = "C1"

[logging]
level = "debug"
"#;
        tokio::fs::write(&config_path, test_config).await.unwrap();

        let config = AppConfig::load(Some(config_path)).await.unwrap();

        assert_eq!(config.fetch.max_concurrency, 12);
        assert_eq!(config.fetch.request_timeout, Duration::from_secs(10));
        assert_eq!(config.fetch.run_deadline, Some(Duration::from_secs(900)));
        assert_eq!(config.market.market, "fr-fr");
        assert_eq!(config.prices.products.len(), 1);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.log_file_path(), None);

        // Unspecified values keep their defaults
        assert_eq!(config.market.currency, "EUR");
        assert_eq!(config.fetch.max_retries, limits::MAX_RETRIES);
        assert_eq!(config.schedules.endpoint, api::SCHEDULES_URL);
    }

    #[test]
    fn test_log_file_path() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.log_file_path(), None);

        logging.file_logging = true;
        assert_eq!(
            logging.log_file_path(),
            Some(PathBuf::from(output::DEFAULT_LOG_FILE))
        );

        logging.log_file = Some(PathBuf::from("logs/run.log"));
        assert_eq!(logging.log_file_path(), Some(PathBuf::from("logs/run.log")));

        let parsed: AppConfig =
            toml::from_str("[logging]\nfile_logging = true\nlog_file = \"scraper.log\"\n").unwrap();
        assert_eq!(
            parsed.logging.log_file_path(),
            Some(PathBuf::from("scraper.log"))
        );
    }

    #[tokio::test]
    async fn test_invalid_file_is_format_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        tokio::fs::write(&config_path, "[fetch\nmax_concurrency = ")
            .await
            .unwrap();

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::InvalidFormat(_)))
        ));
    }

    #[tokio::test]
    async fn test_write_default_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("conf/park-fetcher.toml");

        let written = AppConfig::write_default(Some(config_path.clone()), false)
            .await
            .unwrap();
        assert_eq!(written, config_path);
        assert!(AppConfig::load(Some(config_path.clone())).await.is_ok());

        assert!(AppConfig::write_default(Some(config_path.clone()), false)
            .await
            .is_err());
        assert!(AppConfig::write_default(Some(config_path), true).await.is_ok());
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = AppConfig::default();
        config.fetch.max_concurrency = 0;
        config.prices.products.clear();
        config.schedules.jitter_min = Duration::from_secs(3);

        match config.validate() {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_runtime_conversion() {
        let mut config = AppConfig::default();
        config.market.market = "en-gb".to_string();
        config.market.currency = "GBP".to_string();
        config.fetch.max_concurrency = 8;
        config.fetch.rate_limit_rps = Some(4);

        let prices = config.prices_run(day(1), day(31));
        assert_eq!(prices.context.market, "en-gb");
        assert_eq!(prices.context.currency, "GBP");
        assert_eq!(prices.max_concurrency, 8);
        assert_eq!(prices.rate_limit_rps, Some(4));
        assert_eq!(prices.pacing, PacingPolicy::Fixed(Duration::from_secs(1)));
        assert!(matches!(prices.plan, WorkPlan::Products(ref p) if p.len() == 4));
        tokio_test::assert_ok!(prices.validate());

        let schedules = config.schedules_run(day(1), day(7));
        assert!(matches!(schedules.pacing, PacingPolicy::Jitter { .. }));
        assert_eq!(
            schedules.plan,
            WorkPlan::DateRange {
                start: day(1),
                end: day(7)
            }
        );

        assert_eq!(config.prices_target().records_path(OutputFormat::Csv), PathBuf::from("output/prices.csv"));
        assert_eq!(config.schedule_normalizer().target_locations().len(), 2);
    }

    #[test]
    fn test_zero_request_delay_disables_pacing() {
        let mut config = AppConfig::default();
        config.prices.request_delay = Duration::ZERO;
        assert_eq!(config.prices_run(day(1), day(2)).pacing, PacingPolicy::None);
    }

    #[test]
    fn test_to_toml_round_trip() {
        let config = AppConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.prices.products, config.prices.products);
        assert_eq!(parsed.fetch.max_backoff, config.fetch.max_backoff);
    }
}
