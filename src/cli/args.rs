//! Command-line argument parsing for Park Fetcher
//!
//! This module defines the CLI structure using clap derive macros: one
//! subcommand per data source plus configuration management.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use humantime_serde::re::humantime;

use crate::app::OutputFormat;
use crate::config::AppConfig;

/// Park Fetcher - Collect theme-park ticket prices and park schedules
#[derive(Parser, Debug)]
#[command(
    name = "park_fetcher",
    version,
    about = "Fetch theme-park ticket price calendars and park schedules",
    long_about = "Fetches ticket price calendars and daily park schedules from the public API.
Requests run concurrently under a strict bound with timeouts, retries and pacing; results are deduplicated, sorted and written as JSON and CSV."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the ticket price calendar for every configured product
    Prices(FetchArgs),

    /// Fetch park schedules, one request per date
    Schedules(FetchArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments shared by the fetch commands
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// First date to fetch (YYYY-MM-DD), defaults to today
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// Last date to fetch, inclusive (YYYY-MM-DD)
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    pub end: NaiveDate,

    /// Maximum concurrent requests
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Attempts per unit, including the first
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-attempt timeout (e.g. "30s")
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Global requests-per-second ceiling
    #[arg(long, value_name = "RPS")]
    pub rate_limit: Option<u32>,

    /// Cancel the run after this long (e.g. "20m")
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub deadline: Option<Duration>,

    /// Market code (e.g. "nl-nl")
    #[arg(long)]
    pub market: Option<String>,

    /// Currency code (e.g. "EUR")
    #[arg(long)]
    pub currency: Option<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format, repeatable (json, csv)
    #[arg(short, long = "format", value_name = "FORMAT", value_parser = parse_format)]
    pub formats: Vec<OutputFormat>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for configuration management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a commented default configuration file
    Init {
        /// Destination, defaults to the user config directory
        #[arg(long, value_name = "FILE")]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl FetchArgs {
    /// Reject flag values that can never form a valid run
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == Some(0) {
            return Err("Concurrency must be greater than 0".to_string());
        }

        if self.retries == Some(0) {
            return Err("Retries must be greater than 0".to_string());
        }

        if let Some(start) = self.start {
            if start > self.end {
                return Err(format!("Start date {} is after end date {}", start, self.end));
            }
        }

        Ok(())
    }

    /// First date of the run, `today` when not given
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        self.start.unwrap_or(today)
    }

    /// Override file settings with the given flags
    pub fn apply_to(&self, mut config: AppConfig) -> AppConfig {
        if let Some(concurrency) = self.concurrency {
            config.fetch.max_concurrency = concurrency;
        }
        if let Some(retries) = self.retries {
            config.fetch.max_retries = retries;
        }
        if let Some(timeout) = self.timeout {
            config.fetch.request_timeout = timeout;
        }
        if let Some(rps) = self.rate_limit {
            config.fetch.rate_limit_rps = Some(rps);
        }
        if let Some(deadline) = self.deadline {
            config.fetch.run_deadline = Some(deadline);
        }
        if let Some(market) = &self.market {
            config.market.market = market.clone();
        }
        if let Some(currency) = &self.currency {
            config.market.currency = currency.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if !self.formats.is_empty() {
            config.output.formats = self.formats.clone();
        }
        config
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {} (expected YYYY-MM-DD)", value, e))
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| format!("invalid duration '{}': {}", value, e))
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    match value.to_ascii_lowercase().as_str() {
        "json" => Ok(OutputFormat::Json),
        "csv" => Ok(OutputFormat::Csv),
        other => Err(format!("unknown format '{}' (expected json or csv)", other)),
    }
}
