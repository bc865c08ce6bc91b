//! Progress display for fetch runs
//!
//! An indicatif progress bar fed by the coordinator's unit outcomes. Falls
//! back to a hidden bar when progress is disabled or stderr is not a terminal,
//! so the counters stay available either way.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use crate::app::{ProgressSink, RunSummary, UnitOutcome, UnitStatus};

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Draw the progress bar
    pub enable_progress_bar: bool,
    /// Redraw interval of the spinner
    pub tick_interval: Duration,
    /// Label shown next to the bar
    pub label: String,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bar: true,
            tick_interval: Duration::from_millis(120),
            label: "Fetching".to_string(),
        }
    }
}

/// Progress bar tracking unit outcomes
pub struct ProgressDisplay {
    bar: ProgressBar,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl ProgressDisplay {
    /// Create a display; the bar is hidden unless enabled and stderr is a terminal
    pub fn new(config: ProgressConfig) -> Self {
        let visible = config.enable_progress_bar && std::io::stderr().is_terminal();
        let bar = ProgressBar::with_draw_target(Some(0), Self::draw_target(visible));

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_prefix(config.label.clone());
        bar.set_message(config.label);
        if visible {
            bar.enable_steady_tick(config.tick_interval);
        }

        Self {
            bar,
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
        }
    }

    fn draw_target(visible: bool) -> ProgressDrawTarget {
        if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        }
    }

    /// Units reported so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Total units of the run
    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }

    /// Succeeded, failed and cancelled unit counts
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.succeeded.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.cancelled.load(Ordering::Relaxed),
        )
    }

    fn status_message(&self) -> String {
        let (succeeded, failed, cancelled) = self.counts();
        if cancelled > 0 {
            format!("{} ok, {} failed, {} cancelled", succeeded, failed, cancelled)
        } else {
            format!("{} ok, {} failed", succeeded, failed)
        }
    }
}

impl ProgressSink for ProgressDisplay {
    fn on_start(&self, total_units: usize) {
        self.bar.set_length(total_units as u64);
        self.bar.set_position(0);
        debug!("Progress display started for {} units", total_units);
    }

    fn on_outcome(&self, outcome: &UnitOutcome) {
        match &outcome.status {
            UnitStatus::Succeeded { .. } => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
            }
            UnitStatus::Failed { kind, .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.bar
                    .println(format!("Failed {}: {}", outcome.unit, kind));
            }
            UnitStatus::Cancelled => {
                self.cancelled.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.bar.inc(1);
        self.bar.set_message(self.status_message());
    }

    fn on_finish(&self, summary: &RunSummary) {
        self.bar.finish_with_message(format!(
            "{} of {} units succeeded, {} records",
            summary.succeeded_units, summary.total_units, summary.records_emitted
        ));
    }
}

impl Drop for ProgressDisplay {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
