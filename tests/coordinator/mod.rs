//! Integration tests for the coordinator module
//!
//! These tests drive complete runs through the public API with an in-memory
//! transport, covering partial failure, the concurrency bound, cancellation,
//! configuration errors and persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::time::Instant;

use park_fetcher::app::{
    persistence_for, CoordinatorConfig, DomainRecord, ErrorKind, OutputFormat, OutputTarget,
    PacingPolicy, PriceNormalizer, PricePayloadBuilder, PriceRecord, ProductConfig,
    RequestPayload, RunCoordinator, RunState, ScheduleNormalizer, SchedulePayloadBuilder,
    Transport, TransportResponse, WorkUnit,
};
use park_fetcher::errors::{AppError, ConfigError, TransportResult};

/// Canned reply of the fake transport
enum Reply {
    Json(Value),
    Status(u16),
    Hang,
}

type Responder = dyn Fn(&str) -> Reply + Send + Sync;

/// In-memory transport that records call counts and concurrency
///
/// Each request is keyed by its date (schedules) or adult product code
/// (prices); the responder decides the reply from that key.
struct FakeTransport {
    latency: Duration,
    responder: Box<Responder>,
    calls: AtomicUsize,
    calls_per_key: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    sent_at: Mutex<Vec<Instant>>,
}

impl FakeTransport {
    fn new(latency: Duration, responder: impl Fn(&str) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            latency,
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            calls_per_key: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            sent_at: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn calls_for(&self, key: &str) -> usize {
        self.calls_per_key
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn sent_at(&self) -> Vec<Instant> {
        self.sent_at.lock().unwrap().clone()
    }
}

/// Decrements the in-flight counter even when the request is timed out
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn request_key(payload: &RequestPayload) -> String {
    payload.body["variables"]["date"]
        .as_str()
        .or_else(|| payload.body["products"][0]["adultProductCode"].as_str())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(
        &self,
        payload: &RequestPayload,
        _timeout: Duration,
    ) -> TransportResult<TransportResponse> {
        let key = request_key(payload);
        self.sent_at.lock().unwrap().push(Instant::now());
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_per_key
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert(0) += 1;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        tokio::time::sleep(self.latency).await;

        match (self.responder)(&key) {
            Reply::Json(body) => Ok(TransportResponse::new(200, body.to_string())),
            Reply::Status(status) => Ok(TransportResponse::new(status, String::new())),
            Reply::Hang => std::future::pending().await,
        }
    }
}

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
}

fn day(offset: u64) -> NaiveDate {
    start_date().checked_add_days(Days::new(offset)).unwrap()
}

/// One target-location activity with a single schedule for the requested day
fn schedule_body() -> Value {
    json!({
        "data": {
            "activitySchedules": [
                {
                    "name": "Disneyland Park",
                    "schedules": [
                        {"status": "OPERATING", "startTime": "09:30:00", "endTime": "22:00:00"}
                    ]
                },
                {"name": "Some Restaurant", "schedules": []}
            ]
        }
    })
}

/// Schedule run over `days` dates with fast, deterministic policies
fn schedule_config(days: u64, concurrency: usize) -> CoordinatorConfig {
    CoordinatorConfig::schedules(start_date(), day(days - 1))
        .with_max_concurrency(concurrency)
        .with_pacing(PacingPolicy::None)
        .with_request_timeout(Duration::from_secs(5))
        .with_shutdown_timeout(Duration::from_secs(30))
}

fn schedule_coordinator(config: CoordinatorConfig, transport: Arc<FakeTransport>) -> RunCoordinator {
    RunCoordinator::new(
        config,
        Arc::new(SchedulePayloadBuilder::new().unwrap()),
        transport,
        Arc::new(ScheduleNormalizer::default()),
    )
}

/// Unit #5 of 10 fails permanently; the other nine are aggregated and written
#[tokio::test(start_paused = true)]
async fn test_partial_failure_of_one_unit() {
    let failing = day(4).format("%Y-%m-%d").to_string();
    let failing_key = failing.clone();
    let transport = Arc::new(FakeTransport::new(Duration::from_millis(100), move |key| {
        if key == failing_key {
            Reply::Status(503)
        } else {
            Reply::Json(schedule_body())
        }
    }));

    let temp_dir = TempDir::new().unwrap();
    let target = OutputTarget::new(temp_dir.path(), "times");
    let report = schedule_coordinator(schedule_config(10, 3), Arc::clone(&transport))
        .with_persistence(Arc::new(persistence_for(&target, &[OutputFormat::Json])))
        .run()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.summary.total_units, 10);
    assert_eq!(report.summary.succeeded_units, 9);
    assert_eq!(report.summary.failed_units.len(), 1);
    assert!(report.summary.cancelled_units.is_empty());
    assert!(!report.summary.cancelled);

    let failure = &report.summary.failed_units[0];
    assert_eq!(failure.unit, WorkUnit::Date(day(4)));
    assert_eq!(failure.kind, ErrorKind::ExhaustedRetries);
    assert_eq!(failure.attempts, 3);
    assert_eq!(transport.calls_for(&failing), 3);
    assert_eq!(transport.calls(), 9 + 3);

    assert_eq!(report.records.len(), 9);
    assert_eq!(report.summary.entries_skipped, 9);
    assert!(report
        .records
        .iter()
        .all(|record| !matches!(record, DomainRecord::Schedule(s) if s.date == failing)));

    let written: Value = serde_json::from_str(
        &std::fs::read_to_string(target.records_path(OutputFormat::Json)).unwrap(),
    )
    .unwrap();
    assert_eq!(written.as_array().unwrap().len(), 9);
    assert!(target.summary_path().exists());
}

/// Never more than `max_concurrency` requests are in flight
#[tokio::test(start_paused = true)]
async fn test_concurrency_bound_holds() {
    for concurrency in [1usize, 5, 50] {
        let transport = Arc::new(FakeTransport::new(Duration::from_millis(200), |_| {
            Reply::Json(schedule_body())
        }));

        let report = schedule_coordinator(schedule_config(200, concurrency), Arc::clone(&transport))
            .run()
            .await
            .unwrap();

        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.summary.succeeded_units, 200);
        assert_eq!(report.records.len(), 200);
        assert_eq!(transport.calls(), 200);
        assert!(
            transport.max_in_flight() <= concurrency,
            "observed {} in flight with a bound of {}",
            transport.max_in_flight(),
            concurrency
        );
        assert_eq!(transport.max_in_flight(), concurrency);
        assert!(report.summary.peak_in_flight <= concurrency);
    }
}

/// Records come out sorted by date regardless of completion order
#[tokio::test(start_paused = true)]
async fn test_output_is_chronological() {
    let transport = Arc::new(FakeTransport::new(Duration::from_millis(50), |_| {
        Reply::Json(schedule_body())
    }));

    let report = schedule_coordinator(schedule_config(30, 8), transport)
        .run()
        .await
        .unwrap();

    let dates: Vec<String> = report
        .records
        .iter()
        .map(|record| match record {
            DomainRecord::Schedule(schedule) => schedule.date.clone(),
            DomainRecord::Price(price) => price.date.clone(),
        })
        .collect();
    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(dates, sorted);
    assert_eq!(dates.len(), 30);
}

/// Reaching the run deadline stops dispatch and reports the rest as cancelled
#[tokio::test(start_paused = true)]
async fn test_run_deadline_cancels_remaining_units() {
    let transport = Arc::new(FakeTransport::new(Duration::from_secs(1), |_| {
        Reply::Json(schedule_body())
    }));

    let config = schedule_config(20, 2).with_run_deadline(Duration::from_millis(4500));
    let report = schedule_coordinator(config, Arc::clone(&transport))
        .run()
        .await
        .unwrap();

    let summary = &report.summary;
    assert!(summary.cancelled);
    assert_eq!(report.state, RunState::Completed);
    assert!(summary.succeeded_units >= 8);
    assert!(summary.succeeded_units < 20);
    assert!(!summary.cancelled_units.is_empty());
    assert!(summary.cancelled_units.contains(&WorkUnit::Date(day(19))));
    assert_eq!(
        summary.succeeded_units
            + summary.failed_count()
            + summary.cancelled_units.len()
            + summary.abandoned_units,
        20
    );
    assert_eq!(transport.calls(), summary.succeeded_units);
    // one record per succeeded date survives the cancellation
    assert_eq!(summary.records_merged, summary.succeeded_units);
    assert_eq!(report.records.len(), summary.succeeded_units);
}

/// `cancel()` from another task stops the run after in-flight units finish
#[tokio::test(start_paused = true)]
async fn test_cancel_from_handle() {
    let transport = Arc::new(FakeTransport::new(Duration::from_secs(1), |_| {
        Reply::Json(schedule_body())
    }));

    let coordinator = Arc::new(schedule_coordinator(schedule_config(50, 4), Arc::clone(&transport)));
    let mut state_rx = coordinator.subscribe_state();

    let running = Arc::clone(&coordinator);
    let handle = tokio::spawn(async move { running.run().await });

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(*state_rx.borrow_and_update(), RunState::Fetching);
    coordinator.cancel();

    let report = handle.await.unwrap().unwrap();
    assert!(report.summary.cancelled);
    assert_eq!(report.summary.succeeded_units, 12);
    assert_eq!(report.summary.cancelled_units.len(), 38);
    assert_eq!(report.summary.records_merged, 12);
    assert_eq!(report.records.len(), 12);
    let dates: Vec<String> = report
        .records
        .iter()
        .map(|record| match record {
            DomainRecord::Schedule(schedule) => schedule.date.clone(),
            other => panic!("unexpected record {:?}", other),
        })
        .collect();
    assert_eq!(dates.first().map(String::as_str), Some("2026-01-01"));
    assert_eq!(coordinator.state(), RunState::Completed);
}

/// A cancel issued before the run starts is honoured and nothing is sent
#[tokio::test(start_paused = true)]
async fn test_cancel_before_run() {
    let transport = Arc::new(FakeTransport::new(Duration::from_millis(10), |_| {
        Reply::Json(schedule_body())
    }));

    let coordinator = schedule_coordinator(schedule_config(10, 3), Arc::clone(&transport));
    coordinator.cancel();
    let report = coordinator.run().await.unwrap();

    assert!(report.summary.cancelled);
    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.summary.succeeded_units, 0);
    assert_eq!(report.summary.cancelled_units.len(), 10);
    assert!(report.records.is_empty());
    assert_eq!(transport.calls(), 0);
}

/// A single worker keeps its pacing delay between failing units too
#[tokio::test(start_paused = true)]
async fn test_pacing_applies_between_failed_units() {
    let transport = Arc::new(FakeTransport::new(Duration::ZERO, |_| {
        Reply::Json(json!({"errors": []}))
    }));

    let config = schedule_config(4, 1).with_pacing(PacingPolicy::Fixed(Duration::from_secs(5)));
    let report = schedule_coordinator(config, Arc::clone(&transport))
        .run()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert_eq!(report.summary.failed_count(), 4);
    assert!(report
        .summary
        .failed_units
        .iter()
        .all(|failure| failure.kind == ErrorKind::DataShape && failure.attempts == 1));

    let sent_at = transport.sent_at();
    assert_eq!(sent_at.len(), 4);
    for pair in sent_at.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(5));
    }
}

/// A run without a single success fails and writes nothing
#[tokio::test(start_paused = true)]
async fn test_zero_successes_fails_without_persistence() {
    let transport = Arc::new(FakeTransport::new(Duration::from_millis(10), |_| {
        Reply::Status(500)
    }));

    let temp_dir = TempDir::new().unwrap();
    let target = OutputTarget::new(temp_dir.path().join("out"), "times");
    let config = schedule_config(3, 3).with_max_retries(2);
    let report = schedule_coordinator(config, Arc::clone(&transport))
        .with_persistence(Arc::new(persistence_for(
            &target,
            &[OutputFormat::Json, OutputFormat::Csv],
        )))
        .run()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Failed);
    assert!(report.records.is_empty());
    assert_eq!(report.summary.failed_units.len(), 3);
    assert!(report
        .summary
        .failed_units
        .iter()
        .all(|failure| failure.kind == ErrorKind::ExhaustedRetries && failure.attempts == 2));
    assert_eq!(transport.calls(), 6);
    assert!(!target.records_path(OutputFormat::Json).exists());
    assert!(!target.summary_path().exists());
}

/// Timeouts count as attempts and end in exhausted retries
#[tokio::test(start_paused = true)]
async fn test_hanging_requests_exhaust_retries() {
    let hanging = day(1).format("%Y-%m-%d").to_string();
    let hanging_key = hanging.clone();
    let transport = Arc::new(FakeTransport::new(Duration::ZERO, move |key| {
        if key == hanging_key {
            Reply::Hang
        } else {
            Reply::Json(schedule_body())
        }
    }));

    let report = schedule_coordinator(schedule_config(3, 3), Arc::clone(&transport))
        .run()
        .await
        .unwrap();

    assert_eq!(report.summary.succeeded_units, 2);
    let failure = &report.summary.failed_units[0];
    assert_eq!(failure.unit, WorkUnit::Date(day(1)));
    assert_eq!(failure.kind, ErrorKind::ExhaustedRetries);
    assert_eq!(transport.calls_for(&hanging), 3);
}

/// A malformed body fails its unit without a retry
#[tokio::test(start_paused = true)]
async fn test_data_shape_error_is_not_retried() {
    let broken = day(2).format("%Y-%m-%d").to_string();
    let broken_key = broken.clone();
    let transport = Arc::new(FakeTransport::new(Duration::from_millis(10), move |key| {
        if key == broken_key {
            Reply::Json(json!({"errors": [{"message": "unexpected"}]}))
        } else {
            Reply::Json(schedule_body())
        }
    }));

    let report = schedule_coordinator(schedule_config(4, 2), Arc::clone(&transport))
        .run()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.summary.succeeded_units, 3);
    let failure = &report.summary.failed_units[0];
    assert_eq!(failure.kind, ErrorKind::DataShape);
    assert_eq!(failure.attempts, 1);
    assert_eq!(transport.calls_for(&broken), 1);
}

/// Units the builder cannot handle fail the run before any request
#[tokio::test]
async fn test_unsupported_unit_is_config_error() {
    let transport = Arc::new(FakeTransport::new(Duration::ZERO, |_| Reply::Status(200)));

    let config = CoordinatorConfig::prices(ProductConfig::default_catalogue(), start_date(), day(30));
    let coordinator = schedule_coordinator(config, Arc::clone(&transport));
    let result = coordinator.run().await;

    assert!(matches!(
        result,
        Err(AppError::Config(ConfigError::UnsupportedWorkUnit { .. }))
    ));
    assert_eq!(coordinator.state(), RunState::Failed);
    assert_eq!(transport.calls(), 0);
}

/// An inverted date range fails the run before any request
#[tokio::test]
async fn test_inverted_range_is_config_error() {
    let transport = Arc::new(FakeTransport::new(Duration::ZERO, |_| Reply::Status(200)));

    let config = CoordinatorConfig::schedules(day(5), day(1));
    let result = schedule_coordinator(config, Arc::clone(&transport)).run().await;

    assert!(matches!(
        result,
        Err(AppError::Config(ConfigError::InvalidDateRange { .. }))
    ));
    assert_eq!(transport.calls(), 0);
}

fn price_coordinator(products: Vec<ProductConfig>, transport: Arc<FakeTransport>) -> RunCoordinator {
    let config = CoordinatorConfig::prices(products, start_date(), day(0))
        .with_pacing(PacingPolicy::None);
    RunCoordinator::new(
        config,
        Arc::new(PricePayloadBuilder::new().unwrap()),
        transport,
        Arc::new(PriceNormalizer::new()),
    )
}

fn calendar_body() -> Value {
    json!({
        "calendar": [
            {
                "date": "2026-01-01",
                "products": {
                    "1-day-1-park": {
                        "available": true,
                        "priceAdult": "89",
                        "priceChild": "79",
                        "range": "standard"
                    }
                }
            }
        ]
    })
}

/// One product with one available day yields exactly one price row
#[tokio::test(start_paused = true)]
async fn test_price_example_end_to_end() {
    let transport = Arc::new(FakeTransport::new(Duration::from_millis(10), |_| {
        Reply::Json(calendar_body())
    }));

    let temp_dir = TempDir::new().unwrap();
    let target = OutputTarget::new(temp_dir.path(), "prices");
    let products = vec![ProductConfig::new("1-day-1-park", "special deal", "TKITK6061A", "TKITK6061C")];
    let report = price_coordinator(products, transport)
        .with_persistence(Arc::new(persistence_for(
            &target,
            &[OutputFormat::Json, OutputFormat::Csv],
        )))
        .run()
        .await
        .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(
        report.records,
        vec![DomainRecord::Price(PriceRecord {
            date: "2026-01-01".to_string(),
            deal_category: "special deal".to_string(),
            park_category: "1-day-1-park".to_string(),
            available: "Yes".to_string(),
            adult_price: "89".to_string(),
            child_price: "79".to_string(),
            range: "standard".to_string(),
        })]
    );

    let csv = std::fs::read_to_string(target.records_path(OutputFormat::Csv)).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "date,deal_category,park_category,available,adult_price,child_price,range",
            "2026-01-01,special deal,1-day-1-park,Yes,89,79,standard",
        ]
    );
}

/// Identical rows produced by different units are written once
#[tokio::test(start_paused = true)]
async fn test_duplicates_across_units_removed() {
    let transport = Arc::new(FakeTransport::new(Duration::from_millis(10), |_| {
        Reply::Json(calendar_body())
    }));

    let products = vec![
        ProductConfig::new("1-day-1-park", "special deal", "A1", "C1"),
        ProductConfig::new("1-day-1-park", "special deal", "A2", "C2"),
    ];
    let report = price_coordinator(products, Arc::clone(&transport))
        .run()
        .await
        .unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(report.summary.records_merged, 2);
    assert_eq!(report.summary.duplicates_removed, 1);
    assert_eq!(report.records.len(), 1);
}
