//! Integration tests for the HTTP transport
//!
//! These tests run the reqwest transport against a local mock server to
//! verify the request it sends and how responses and failures surface.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use park_fetcher::app::{
    ClientConfig, CoordinatorConfig, DomainRecord, HttpTransport, PacingPolicy, PayloadBuilder,
    PriceNormalizer, PricePayloadBuilder, ProductConfig, RunContext, RunCoordinator, RunState,
    SchedulePayloadBuilder, Transport, WorkUnit,
};
use park_fetcher::constants::api;
use park_fetcher::errors::TransportError;

fn test_client_config() -> ClientConfig {
    ClientConfig {
        user_agent: "park-fetcher-test/1.0".to_string(),
        ..ClientConfig::default()
    }
}

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()
}

/// The transport posts the payload body as JSON with its headers and the token
#[tokio::test]
async fn test_posts_json_with_headers_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("Origin", api::SITE_ORIGIN))
        .and(header("Authorization", "Token secret-token"))
        .and(header("User-Agent", "park-fetcher-test/1.0"))
        .and(body_partial_json(json!({
            "operationName": "activitySchedules",
            "variables": {"market": "nl-nl", "date": "2026-05-01"}
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"data":{"activitySchedules":[]}}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let builder = SchedulePayloadBuilder::with_endpoint(&format!("{}/query", server.uri())).unwrap();
    let payload = builder
        .build(
            &WorkUnit::Date(may_first()),
            &RunContext::new(may_first(), may_first()),
        )
        .unwrap();

    let transport =
        HttpTransport::new(&test_client_config().with_api_token("secret-token")).unwrap();
    let response = transport
        .send(&payload, Duration::from_secs(5))
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"{"data":{"activitySchedules":[]}}"#);
}

/// Non-2xx responses are returned to the caller, not turned into errors
#[tokio::test]
async fn test_non_success_status_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let builder = SchedulePayloadBuilder::with_endpoint(&server.uri()).unwrap();
    let payload = builder
        .build(
            &WorkUnit::Date(may_first()),
            &RunContext::new(may_first(), may_first()),
        )
        .unwrap();

    let response = HttpTransport::new(&test_client_config())
        .unwrap()
        .send(&payload, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert!(!response.is_success());
    assert_eq!(response.body, "busy");
}

/// A response slower than the deadline surfaces as a timeout
#[tokio::test]
async fn test_slow_response_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let builder = SchedulePayloadBuilder::with_endpoint(&server.uri()).unwrap();
    let payload = builder
        .build(
            &WorkUnit::Date(may_first()),
            &RunContext::new(may_first(), may_first()),
        )
        .unwrap();

    let result = HttpTransport::new(&test_client_config())
        .unwrap()
        .send(&payload, Duration::from_millis(200))
        .await;

    assert!(matches!(result, Err(TransportError::Timeout { .. })));
}

/// A refused connection is a transport error, not a timeout
#[tokio::test]
async fn test_connection_refused_is_http_error() {
    let builder = SchedulePayloadBuilder::with_endpoint("http://127.0.0.1:9/query").unwrap();
    let payload = builder
        .build(
            &WorkUnit::Date(may_first()),
            &RunContext::new(may_first(), may_first()),
        )
        .unwrap();

    let result = HttpTransport::new(&test_client_config())
        .unwrap()
        .send(&payload, Duration::from_secs(5))
        .await;

    match result {
        Err(error) => assert!(!matches!(error, TransportError::Timeout { .. })),
        Ok(response) => panic!("unexpected response with status {}", response.status),
    }
}

/// A full price run over HTTP: one failing answer is retried, then the row is written
#[tokio::test]
async fn test_price_run_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prices"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/prices"))
        .and(body_partial_json(json!({
            "startDate": "2026-05-01",
            "endDate": "2026-05-01",
            "products": [{"productType": "1-day-2-parks", "adultProductCode": "TKITHL001A"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "calendar": [{
                "date": "2026-05-01",
                "products": {"1-day-2-parks": {"available": false}}
            }]
        })))
        .mount(&server)
        .await;

    let products = vec![ProductConfig::new(
        "1-day-2-parks",
        "regular deal",
        "TKITHL001A",
        "TKITHL001C",
    )];
    let config = CoordinatorConfig::prices(products, may_first(), may_first())
        .with_pacing(PacingPolicy::None)
        .with_request_timeout(Duration::from_secs(5));

    let report = RunCoordinator::new(
        config,
        Arc::new(PricePayloadBuilder::with_endpoint(&format!("{}/prices", server.uri())).unwrap()),
        Arc::new(HttpTransport::new(&test_client_config()).unwrap()),
        Arc::new(PriceNormalizer::new()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.summary.succeeded_units, 1);
    match report.records.as_slice() {
        [DomainRecord::Price(record)] => {
            assert_eq!(record.available, "No");
            assert_eq!(record.park_category, "1-day-2-parks");
            assert!(record.adult_price.is_empty());
        }
        other => panic!("unexpected records {:?}", other),
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}
