//! Command handlers for the CLI
//!
//! This module implements the command handlers that tie the parsed arguments,
//! the configuration file and the run coordinator together.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use humantime_serde::re::humantime::format_duration;
use tracing::{info, warn};

use crate::app::{
    persistence_for, HttpTransport, Normalizer, PayloadBuilder, PriceNormalizer, RunCoordinator,
    RunReport, RunState,
};
use crate::cli::args::{ConfigAction, ConfigArgs, FetchArgs, GlobalArgs};
use crate::cli::progress::{ProgressConfig, ProgressDisplay};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Fetch the ticket price calendar
pub async fn handle_prices(args: FetchArgs, global: &GlobalArgs) -> Result<RunReport> {
    let config = load_config(&args, global).await?;
    let start = args.start_date(Local::now().date_naive());

    let run = config
        .prices_run(start, args.end)
        .with_signal_handling(true);
    let builder: Arc<dyn PayloadBuilder> = Arc::new(config.price_builder()?);
    let normalizer: Arc<dyn Normalizer> = Arc::new(PriceNormalizer::new());

    info!(
        "Fetching prices for {} products from {} to {}",
        config.prices.products.len(),
        start,
        args.end
    );

    let coordinator = RunCoordinator::new(
        run,
        builder,
        Arc::new(HttpTransport::new(&config.client_config())?),
        normalizer,
    )
    .with_persistence(Arc::new(persistence_for(
        &config.prices_target(),
        &config.output.formats,
    )));

    execute(coordinator, "Fetching prices", &args, global).await
}

/// Fetch park schedules
pub async fn handle_schedules(args: FetchArgs, global: &GlobalArgs) -> Result<RunReport> {
    let config = load_config(&args, global).await?;
    let start = args.start_date(Local::now().date_naive());

    let run = config
        .schedules_run(start, args.end)
        .with_signal_handling(true);
    let builder: Arc<dyn PayloadBuilder> = Arc::new(config.schedule_builder()?);
    let normalizer: Arc<dyn Normalizer> = Arc::new(config.schedule_normalizer());

    info!("Fetching schedules from {} to {}", start, args.end);

    let coordinator = RunCoordinator::new(
        run,
        builder,
        Arc::new(HttpTransport::new(&config.client_config())?),
        normalizer,
    )
    .with_persistence(Arc::new(persistence_for(
        &config.schedules_target(),
        &config.output.formats,
    )));

    execute(coordinator, "Fetching schedules", &args, global).await
}

/// Handle configuration management
pub async fn handle_config(args: ConfigArgs, global: &GlobalArgs) -> Result<()> {
    match args.action {
        ConfigAction::Init { path, force } => {
            let written = AppConfig::write_default(path, force).await?;
            println!("Created configuration file:");
            println!("   {}", written.display());
            println!("   You can customize settings by editing this file.");
            Ok(())
        }
        ConfigAction::Show => {
            let config = AppConfig::load(global.config.clone()).await?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn load_config(args: &FetchArgs, global: &GlobalArgs) -> Result<AppConfig> {
    args.validate().map_err(AppError::generic)?;

    let config = args.apply_to(AppConfig::load(global.config.clone()).await?);
    config.validate()?;
    Ok(config)
}

async fn execute(
    coordinator: RunCoordinator,
    label: &str,
    args: &FetchArgs,
    global: &GlobalArgs,
) -> Result<RunReport> {
    let progress = Arc::new(ProgressDisplay::new(ProgressConfig {
        enable_progress_bar: !args.no_progress && !global.quiet,
        label: label.to_string(),
        ..Default::default()
    }));

    let report = coordinator.with_progress(progress).run().await?;

    if !global.quiet {
        print_summary(&report);
    }
    Ok(report)
}

fn print_summary(report: &RunReport) {
    let summary = &report.summary;

    println!();
    println!("Run {} ({})", report.state, summary.source);
    println!(
        "   Units: {} succeeded, {} failed, {} cancelled of {}",
        summary.succeeded_units,
        summary.failed_count(),
        summary.cancelled_units.len(),
        summary.total_units
    );
    println!(
        "   Records: {} written, {} duplicates removed, {} entries skipped",
        summary.records_emitted, summary.duplicates_removed, summary.entries_skipped
    );
    println!(
        "   Duration: {}",
        format_duration(Duration::from_millis(summary.duration.as_millis() as u64))
    );

    for failure in &summary.failed_units {
        println!(
            "   Failed {} ({}, {} attempts): {}",
            failure.unit, failure.kind, failure.attempts, failure.detail
        );
    }

    if report.state == RunState::Failed {
        warn!("No unit succeeded; nothing was written");
    }
}
