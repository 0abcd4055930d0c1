//! HTTP client for the gasmon-service REST API.
//!
//! # Example
//!
//! ```no_run
//! use gasmon_sync::ServiceClient;
//! use gasmon_types::SensorPayload;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ServiceClient::new("http://localhost:8080")?;
//!
//! let sent = client
//!     .send_reading(&SensorPayload { gas1: 512.0, ..SensorPayload::default() })
//!     .await?;
//! println!("Stored {} (alert: {})", sent.data.id, sent.alert_flag);
//!
//! for reading in client.history(10).await? {
//!     println!("{} gas1={}", reading.created_at, reading.gas1);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use gasmon_types::{Reading, SensorPayload};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Result, SyncError};
use crate::source::ReadingSource;

/// Request timeout applied by [`ServiceClient::new`].
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the gasmon-service API.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
}

// ==========================================================================
// Response Types
// ==========================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Response to an ingested reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub data: Reading,
    pub alert_flag: bool,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    data: Vec<Reading>,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    data: Option<Reading>,
}

// ==========================================================================
// ServiceClient Implementation
// ==========================================================================

impl ServiceClient {
    /// Create a new service client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the gasmon-service (e.g., "http://localhost:8080")
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SyncError::Request)?;

        Self::with_client(base_url, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        // Normalize URL (remove trailing slash)
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(SyncError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the push channel WebSocket.
    pub fn ws_url(&self) -> String {
        let ws_base = self
            .base_url
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| {
                self.base_url
                    .strip_prefix("http://")
                    .map(|rest| format!("ws://{rest}"))
            })
            .unwrap_or_else(|| self.base_url.clone());
        format!("{ws_base}/api/ws")
    }

    /// Check if the service is reachable.
    pub async fn is_reachable(&self) -> bool {
        self.health().await.is_ok()
    }

    /// Get service health.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/api/health", self.base_url);
        self.get(&url).await
    }

    /// The most recent reading, if any.
    pub async fn latest(&self) -> Result<Option<Reading>> {
        let url = format!("{}/api/latest", self.base_url);
        let response: LatestResponse = self.get(&url).await?;
        Ok(response.data)
    }

    /// Up to `limit` recent readings, newest first.
    ///
    /// The service clamps `limit` to its own ceiling.
    pub async fn history(&self, limit: u32) -> Result<Vec<Reading>> {
        let url = format!("{}/api/history?limit={}", self.base_url, limit);
        let response: HistoryResponse = self.get(&url).await?;
        Ok(response.data)
    }

    /// Submit a sensor sample, as a device would.
    pub async fn send_reading(&self, payload: &SensorPayload) -> Result<IngestResponse> {
        let url = format!("{}/api/sensor-data", self.base_url);
        let response = self.client.post(&url).json(payload).send().await.map_err(|e| {
            SyncError::NotReachable {
                url: url.clone(),
                source: e,
            }
        })?;

        self.handle_response(response).await
    }

    // ======================================================================
    // Internal HTTP helpers
    // ======================================================================

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| SyncError::NotReachable {
                    url: url.to_string(),
                    source: e,
                })?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            response.json().await.map_err(SyncError::Request)
        } else {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or_else(|| status.to_string());

            Err(SyncError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ReadingSource for ServiceClient {
    async fn fetch_latest(&self) -> Result<Option<Reading>> {
        self.latest().await
    }

    async fn fetch_history(&self, limit: u32) -> Result<Vec<Reading>> {
        self.history(limit).await
    }
}
