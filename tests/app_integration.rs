use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::fs;
use std::str::FromStr;
use std::sync::Arc;
use tower::ServiceExt;
use tracing::info;
use usdtwd::api::{FETCH_CONFIRMATION, app_router};
use usdtwd::core::clock::FixedClock;
use usdtwd::core::rate::{RateRecord, RateStore, StoreError};
use usdtwd::ingest::FeedFields;
use usdtwd::providers::TaifexSource;
use usdtwd::state::AppState;
use usdtwd::store::memory::MemoryRateStore;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const FEED_PATH: &str = "/v1/DailyForeignExchangeRates";

    pub async fn create_taifex_mock_server(mock_response: &str, status: u16) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(FEED_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// State with an in-memory store, a provider at `feed_url` and "today" fixed
/// to 2025-03-27.
fn test_state(feed_url: &str) -> (Arc<AppState>, Arc<MemoryRateStore>) {
    let store = Arc::new(MemoryRateStore::new());
    let state = AppState::new(
        Arc::new(TaifexSource::new(feed_url, reqwest::Client::new())),
        store.clone(),
        Arc::new(FixedClock::on(date(2025, 3, 27))),
        FeedFields::default(),
    );
    (state, store)
}

/// Store whose backend is unavailable.
struct UnavailableStore;

#[async_trait]
impl RateStore for UnavailableStore {
    async fn find_by_date(&self, _date: NaiveDate) -> Result<Option<RateRecord>, StoreError> {
        Err(StoreError::Backend("disk unavailable".to_string()))
    }

    async fn insert_if_absent(&self, _record: &RateRecord) -> Result<bool, StoreError> {
        Err(StoreError::Backend("disk unavailable".to_string()))
    }

    async fn find_in_range(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<RateRecord>, StoreError> {
        Err(StoreError::Backend("disk unavailable".to_string()))
    }
}

fn unavailable_store_state(feed_url: &str) -> Arc<AppState> {
    AppState::new(
        Arc::new(TaifexSource::new(feed_url, reqwest::Client::new())),
        Arc::new(UnavailableStore),
        Arc::new(FixedClock::on(date(2025, 3, 27))),
        FeedFields::default(),
    )
}

async fn post_query(state: Arc<AppState>, body: Value) -> (StatusCode, Value) {
    let response = app_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/exchangeRates/query")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, String) {
    let response = app_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[test_log::test(tokio::test)]
async fn test_query_success_scenario() {
    let (state, store) = test_state("http://127.0.0.1:9/unused");
    for (day, value) in [(date(2025, 3, 24), "31.01"), (date(2025, 3, 25), "31.016")] {
        store
            .insert_if_absent(&RateRecord::new(day, Decimal::from_str(value).unwrap()))
            .await
            .unwrap();
    }

    let (status, body) = post_query(
        state,
        json!({"startDate": "2025/03/24", "endDate": "2025/03/26", "currency": "usd"}),
    )
    .await;
    info!(?body, "Query response");

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "error": {"code": "0000", "message": "success"},
            "currency": [
                {"date": "20250324", "usd": "31.01"},
                {"date": "20250325", "usd": "31.02"}
            ]
        })
    );
}

#[test_log::test(tokio::test)]
async fn test_query_errors_are_bad_requests() {
    let cases = [
        (json!({"startDate": "2025/03/26", "endDate": "2025/03/24"}), "E001"),
        (json!({"startDate": "2024/03/26", "endDate": "2025/03/24"}), "E002"),
        (json!({"startDate": "2025/03/20", "endDate": "2025/03/27"}), "E002"),
        (json!({"startDate": "2025-03-20", "endDate": "2025/03/26"}), "E003"),
        (json!({"endDate": "2025/03/26"}), "E003"),
        (json!({"startDate": 20250324, "endDate": "2025/03/26"}), "E003"),
        (json!({"startDate": "2025/03/24", "endDate": ["2025/03/26"]}), "E003"),
        (json!({"startDate": null, "endDate": "2025/03/26"}), "E003"),
    ];

    for (request, code) in cases {
        let (state, _store) = test_state("http://127.0.0.1:9/unused");
        let (status, body) = post_query(state, request.clone()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{request}");
        assert_eq!(body["error"]["code"], code, "{request}");
        assert!(body["currency"].is_null(), "{request}");
    }
}

#[test_log::test(tokio::test)]
async fn test_fetch_endpoint_ingests_feed() {
    let feed = r#"[
        {"Date": "20250324", "USD/NTD": "31.01", "RMB/NTD": "4.52"},
        {"Date": "20250325", "USD/NTD": "31.016"},
        {"Date": "20250326"}
    ]"#;
    let mock_server = test_utils::create_taifex_mock_server(feed, 200).await;
    let url = format!("{}{}", mock_server.uri(), test_utils::FEED_PATH);
    let (state, store) = test_state(&url);

    let (status, body) = get(Arc::clone(&state), "/api/exchangeRates/fetch").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, FETCH_CONFIRMATION);
    assert_eq!(store.len().await, 2);

    // A second run over the same feed changes nothing
    let (status, _) = get(Arc::clone(&state), "/api/exchangeRates/fetch").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.len().await, 2);

    let (status, body) = post_query(
        state,
        json!({"startDate": "2025/03/24", "endDate": "2025/03/26"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currency"].as_array().unwrap().len(), 2);
}

#[test_log::test(tokio::test)]
async fn test_fetch_endpoint_reports_bad_feed() {
    let mock_server = test_utils::create_taifex_mock_server(r#"{"status": "down"}"#, 200).await;
    let url = format!("{}{}", mock_server.uri(), test_utils::FEED_PATH);
    let (state, store) = test_state(&url);

    let (status, body) = get(state, "/api/exchangeRates/fetch").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("not a JSON array"));
    assert!(store.is_empty().await);
}

#[test_log::test(tokio::test)]
async fn test_query_storage_failure_is_internal_error() {
    let state = unavailable_store_state("http://127.0.0.1:9/unused");

    let (status, body) = post_query(
        state,
        json!({"startDate": "2025/03/24", "endDate": "2025/03/26"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("disk unavailable"));
}

#[test_log::test(tokio::test)]
async fn test_fetch_storage_failure_is_internal_error() {
    let feed = r#"[{"Date": "20250324", "USD/NTD": "31.01"}]"#;
    let mock_server = test_utils::create_taifex_mock_server(feed, 200).await;
    let url = format!("{}{}", mock_server.uri(), test_utils::FEED_PATH);

    let (status, body) = get(unavailable_store_state(&url), "/api/exchangeRates/fetch").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("failed to store rates"));
}

#[test_log::test(tokio::test)]
async fn test_health() {
    let (state, _store) = test_state("http://127.0.0.1:9/unused");
    let (status, body) = get(state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({"status": "ok"})
    );
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let yesterday = chrono::Utc::now().date_naive() - chrono::Duration::days(2);
    let feed = format!(
        r#"[{{"Date": "{}", "USD/NTD": "32.105"}}]"#,
        yesterday.format("%Y%m%d")
    );
    let mock_server = test_utils::create_taifex_mock_server(&feed, 200).await;

    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    let config_content = format!(
        r#"
        provider:
          url: "{}{}"
        schedule:
          enabled: false
        utc_offset_hours: 0
        data_path: "{}"
    "#,
        mock_server.uri(),
        test_utils::FEED_PATH,
        data_dir.path().display()
    );
    fs::write(config_path, &config_content).expect("Failed to write config file");
    let config_path = config_path.to_str().unwrap();

    let result = usdtwd::run_command(usdtwd::AppCommand::Fetch, Some(config_path)).await;
    assert!(result.is_ok(), "Fetch failed with: {:?}", result.err());

    let day = yesterday.format("%Y/%m/%d").to_string();
    let result = usdtwd::run_command(
        usdtwd::AppCommand::Query {
            start: day.clone(),
            end: day,
            json: true,
        },
        Some(config_path),
    )
    .await;
    assert!(result.is_ok(), "Query failed with: {:?}", result.err());

    // Ranges outside the window surface the error code
    let result = usdtwd::run_command(
        usdtwd::AppCommand::Query {
            start: "2000/01/01".to_string(),
            end: "2000/01/02".to_string(),
            json: false,
        },
        Some(config_path),
    )
    .await;
    let err = result.expect_err("Out-of-window query should fail");
    assert!(err.to_string().starts_with("E002"));
}
