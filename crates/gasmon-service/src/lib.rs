//! Ingestion and history HTTP service for gas sensor readings.
//!
//! This crate provides a service that:
//! - Accepts raw readings from sensor devices and classifies each gas channel
//! - Appends the classified reading to the local store
//! - Serves bounded, newest-first history and the latest reading
//! - Pushes every inserted reading to WebSocket subscribers
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `POST /api/sensor-data` - Ingest one reading
//! - `GET /api/history?limit=N` - Recent readings (default 50, at most 100)
//! - `GET /api/latest` - Most recent reading
//! - `WS /api/ws` - Inserted-reading stream
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/gasmon/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//! broadcast_buffer = 100
//!
//! [storage]
//! path = "~/.local/share/gasmon/readings.db"
//!
//! [classifier]
//! gas_threshold = 400.0
//!
//! [history]
//! default_limit = 50
//! max_limit = 100
//! ```

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, header};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod state;
pub mod ws;

pub use config::{
    ClassifierConfig, Config, ConfigError, HistoryConfig, ServerConfig, StorageConfig,
};
pub use state::AppState;

/// Build the complete application: API and push routes with tracing and
/// permissive CORS.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::router())
        .merge(ws::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
        .with_state(state)
}

/// CORS policy: any origin and method, plus the headers browser clients send.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}
