#![cfg(feature = "ercot")]
//! ERCOT adapter tests against a local mock server.
//!
//! The adapter uses a blocking HTTP client, so every call runs inside
//! `spawn_blocking` while the mock server lives on the async runtime.

use chrono::NaiveDate;
use serde_json::{Value, json};
use sppcast::adapters::ercot::retry::RetryPolicy;
use sppcast::adapters::ercot::{ErcotAdapter, ErcotSettings};
use sppcast::domain::error::SppcastError;
use sppcast::domain::observation::Observation;
use sppcast::ports::price_port::PricePort;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPORT_PATH: &str = "/reports/spp";

fn settings(server: &MockServer) -> ErcotSettings {
    ErcotSettings {
        api_base: server.uri(),
        report_path: REPORT_PATH.to_string(),
        token_url: format!("{}/token", server.uri()),
        client_id: "client".to_string(),
        username: "user".to_string(),
        password: "secret".to_string(),
        subscription_key: "sub-key".to_string(),
        request_timeout: Duration::from_secs(5),
        page_size: 2,
        retry: RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        },
    }
}

async fn fetch(
    settings: ErcotSettings,
    day: NaiveDate,
) -> Result<Vec<Observation>, SppcastError> {
    tokio::task::spawn_blocking(move || {
        let adapter = ErcotAdapter::new(settings)?;
        adapter.fetch_day("HB_NORTH", day)
    })
    .await
    .unwrap()
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
}

fn page(rows: Value, current: u32, total: u32) -> Value {
    json!({
        "_meta": { "totalPages": total, "currentPage": current },
        "fields": [
            { "name": "deliveryDate" },
            { "name": "deliveryHour" },
            { "name": "deliveryInterval" },
            { "name": "settlementPoint" },
            { "name": "settlementPointType" },
            { "name": "settlementPointPrice" },
            { "name": "DSTFlag" }
        ],
        "data": rows
    })
}

async fn mount_token(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(query_param("grant_type", "password"))
        .and(query_param("username", "user"))
        .and(query_param("scope", "openid client offline_access"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id_token": token, "expires_in": "3600" })),
        )
        .mount(server)
        .await;
}

fn ts(h: u32, m: u32) -> chrono::NaiveDateTime {
    day().and_hms_opt(h, m, 0).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn fetches_all_pages() {
    let server = MockServer::start().await;
    mount_token(&server, "tok").await;

    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .and(query_param("page", "1"))
        .and(query_param("deliveryDateFrom", "2024-03-04"))
        .and(query_param("deliveryDateTo", "2024-03-04"))
        .and(query_param("settlementPoint", "HB_NORTH"))
        .and(header("Ocp-Apim-Subscription-Key", "sub-key"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([
                ["2024-03-04", 1, 2, "HB_NORTH", "HU", 21.0, false],
                ["2024-03-04", 1, 1, "HB_NORTH", "HU", "20.5", false]
            ]),
            1,
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([
                ["2024-03-04", 24, 4, "HB_NORTH", "HU", 30.0, false],
                ["2024-03-05", 1, 1, "HB_NORTH", "HU", 99.0, false],
                ["2024-03-04", 25, 1, "HB_NORTH", "HU", 1.0, false]
            ]),
            2,
            2,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let observations = fetch(settings(&server), day()).await.unwrap();

    assert_eq!(
        observations,
        vec![
            Observation::new(ts(0, 0), 20.5),
            Observation::new(ts(0, 15), 21.0),
            Observation::new(ts(23, 45), 30.0),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn reauthenticates_once_on_401() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            json!([["2024-03-04", 1, 1, "HB_NORTH", "HU", 5.0, false]]),
            1,
            1,
        )))
        .mount(&server)
        .await;

    let observations = fetch(settings(&server), day()).await.unwrap();
    assert_eq!(observations.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn persistent_401_is_auth_error() {
    let server = MockServer::start().await;
    mount_token(&server, "tok").await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
        .mount(&server)
        .await;

    let err = fetch(settings(&server), day()).await.unwrap_err();
    assert!(matches!(err, SppcastError::Auth { .. }), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn retries_transient_status() {
    let server = MockServer::start().await;
    mount_token(&server, "tok").await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]), 1, 1)))
        .mount(&server)
        .await;

    let observations = fetch(settings(&server), day()).await.unwrap();
    assert!(observations.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_upstream_status() {
    let server = MockServer::start().await;
    mount_token(&server, "tok").await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetch(settings(&server), day()).await.unwrap_err();
    match err {
        SppcastError::UpstreamStatus { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected UpstreamStatus, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_token_request_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let err = fetch(settings(&server), day()).await.unwrap_err();
    match err {
        SppcastError::Auth { reason } => assert!(reason.contains("invalid_grant")),
        other => panic!("expected Auth, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    mount_token(&server, "tok").await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = fetch(settings(&server), day()).await.unwrap_err();
    assert!(matches!(err, SppcastError::Decode { .. }), "got {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_response_is_timeout() {
    let server = MockServer::start().await;
    mount_token(&server, "tok").await;
    Mock::given(method("GET"))
        .and(path(REPORT_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(json!([]), 1, 1))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut s = settings(&server);
    s.request_timeout = Duration::from_millis(300);
    s.retry.max_retries = 0;

    let err = fetch(s, day()).await.unwrap_err();
    assert!(matches!(err, SppcastError::UpstreamTimeout { .. }), "got {err:?}");
}
