//! Park Fetcher CLI application
//!
//! Command-line interface for fetching theme-park ticket price calendars and
//! park schedules. Exits with status 1 when a run fails or no unit succeeds.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use park_fetcher::app::RunState;
use park_fetcher::cli::{handle_config, handle_prices, handle_schedules, Cli, Commands};
use park_fetcher::config::AppConfig;
use park_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(RunState::Failed) => process::exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Main application logic
async fn run() -> Result<RunState> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let log_file = resolve_log_file(&cli).await;
    init_logging(&cli, log_file.as_deref())?;

    info!("Park Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let global = cli.global.clone();
    match cli.command {
        Commands::Prices(args) => {
            info!("Executing prices command");
            Ok(handle_prices(args, &global).await?.state)
        }
        Commands::Schedules(args) => {
            info!("Executing schedules command");
            Ok(handle_schedules(args, &global).await?.state)
        }
        Commands::Config(args) => {
            handle_config(args, &global).await?;
            Ok(RunState::Completed)
        }
    }
}

/// Initialize logging based on CLI verbosity settings
///
/// Logs always go to stderr; a log file from `--log-file` or the `[logging]`
/// section receives the same events without colours.
fn init_logging(cli: &Cli, log_file: Option<&Path>) -> Result<()> {
    let log_level = cli.log_level();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("park_fetcher={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
    if let Some(path) = log_file {
        info!("Logging to {}", path.display());
    }
    Ok(())
}

/// Log file from the command line, else from the configuration file
async fn resolve_log_file(cli: &Cli) -> Option<PathBuf> {
    if let Some(path) = &cli.global.log_file {
        return Some(path.clone());
    }
    AppConfig::load(cli.global.config.clone())
        .await
        .ok()
        .and_then(|config| config.logging.log_file_path())
}
