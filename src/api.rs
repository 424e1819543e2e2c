//! HTTP surface: translates requests into ingestion and query calls.

use crate::ingest::IngestError;
use crate::query::QueryResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub const FETCH_CONFIRMATION: &str = "USD/TWD exchange rates fetched and stored successfully";

/// Unified error type for API responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("upstream_error: {0}")]
    Upstream(String),
    #[error("internal_error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Fetch(_) | IngestError::Parse(_) => Self::Upstream(e.to_string()),
            IngestError::Storage(_) => Self::Internal(e.to_string()),
        }
    }
}

impl From<crate::core::rate::StoreError> for ApiError {
    fn from(e: crate::core::rate::StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub start_date: Option<Value>,
    #[serde(default)]
    pub end_date: Option<Value>,
    /// Accepted for compatibility; only USD/TWD is served.
    #[serde(default)]
    pub currency: Option<String>,
}

/// Request dates as text. Numbers keep their digits; anything else is empty
/// and fails date parsing.
fn date_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Assemble the application router.
pub fn app_router(state: Arc<AppState>) -> Router {
    let rates = Router::new()
        .route("/fetch", get(fetch_rates))
        .route("/query", post(query_rates));

    Router::new()
        .nest("/api/exchangeRates", rates)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn fetch_rates(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    info!("Manual rate fetch requested");
    state.ingest.fetch_and_store().await.map_err(|e| {
        error!(error = %e, "Manual rate fetch failed");
        ApiError::from(e)
    })?;
    Ok(FETCH_CONFIRMATION)
}

async fn query_rates(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<(StatusCode, Json<QueryResponse>), ApiError> {
    let response = state
        .query
        .query(
            &date_text(request.start_date.as_ref()),
            &date_text(request.end_date.as_ref()),
        )
        .await?;

    let status = if response.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(response)))
}
