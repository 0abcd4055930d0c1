//! REST API endpoints for the gasmon-service.
//!
//! - `POST /api/sensor-data`: classify and append one reading (the ingestion handler)
//! - `GET /api/history?limit=N`: most recent readings, newest first
//! - `GET /api/latest`: the most recent reading, or `null`
//! - `GET /api/health`: liveness check
//!
//! Any other method on the data endpoints answers `405 {"error": "Method not allowed"}`;
//! `OPTIONS` answers `200` so cross-origin callers always get CORS headers.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. Store errors
//! are logged in full and answered with a generic `500` body.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use gasmon_types::{Reading, SensorPayload};

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health).fallback(method_not_allowed))
        .route(
            "/api/sensor-data",
            post(ingest_reading)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/history",
            get(get_history)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/latest",
            get(get_latest)
                .options(preflight)
                .fallback(method_not_allowed),
        )
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Response to a successful ingestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub data: Reading,
    pub alert_flag: bool,
}

/// Classify a device payload and append it to the store.
///
/// Exactly one row is appended per successful call; duplicate submissions
/// produce duplicate rows.
async fn ingest_reading(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    let payload =
        SensorPayload::from_json(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;
    debug!(?payload, "Received sensor data");

    let classified = state.classifier.evaluate(&payload);

    // Publish under the lock so subscribers see inserts in store order
    let reading = {
        let store = state.store.lock().await;
        let reading = store.insert_reading(&classified)?;
        state.publish(&reading);
        reading
    };

    if reading.alert_flag {
        let channels: Vec<usize> = reading.danger_channels().collect();
        warn!(id = %reading.id, ?channels, "Gas level above threshold");
    } else {
        info!(id = %reading.id, "Stored reading");
    }

    Ok(Json(IngestResponse {
        success: true,
        alert_flag: reading.alert_flag,
        data: reading,
    }))
}

/// Query parameters for history.
///
/// `limit` is kept as a string so malformed values fall back to the default
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<String>,
}

/// Response for history queries.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub data: Vec<Reading>,
    pub count: usize,
}

/// Most recent readings, newest first, bounded by the configured ceiling.
async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, AppError> {
    let limit = state.config.history.resolve_limit(params.limit.as_deref());

    let readings = {
        let store = state.store.lock().await;
        store.recent_readings(limit)?
    };
    debug!(limit, count = readings.len(), "History fetched");

    Ok(Json(HistoryResponse {
        success: true,
        count: readings.len(),
        data: readings,
    }))
}

/// Response for the latest-reading endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct LatestResponse {
    pub success: bool,
    pub data: Option<Reading>,
}

async fn get_latest(State(state): State<Arc<AppState>>) -> Result<Json<LatestResponse>, AppError> {
    let reading = {
        let store = state.store.lock().await;
        store.latest_reading()?
    };

    Ok(Json(LatestResponse {
        success: true,
        data: reading,
    }))
}

/// API error type.
#[derive(Debug)]
pub enum AppError {
    /// The request body could not be decoded.
    BadRequest(String),
    /// Unsupported method on an existing endpoint.
    MethodNotAllowed,
    /// Read or write failure against the store.
    Store(gasmon_store::Error),
}

impl From<gasmon_store::Error> for AppError {
    fn from(e: gasmon_store::Error) -> Self {
        AppError::Store(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            ),
            AppError::Store(e) => {
                error!(error = %e, "Store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
