//! Error types for the sync engine and its data sources.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while fetching readings or maintaining a push subscription.
///
/// The [`SyncEngine`](crate::SyncEngine) never returns these to its caller.
/// It records them in [`SyncState`](crate::SyncState) and keeps running.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    /// A fetch did not resolve within the configured timeout.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        operation: &'static str,
        duration: Duration,
    },

    /// The service is not reachable.
    #[error("Service not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid service URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The push subscription failed.
    #[error("Push channel error: {0}")]
    Push(String),

    /// Invalid sync configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from {path}: {message}")]
    ConfigFile { path: String, message: String },
}

/// Result type alias using the sync crate's error type.
pub type Result<T> = std::result::Result<T, SyncError>;
