//! Sync engine configuration.
//!
//! All durations are whole seconds so the TOML form stays readable:
//!
//! ```toml
//! base_interval = 5
//! max_interval = 30
//! fetch_timeout = 10
//! stale_after = 30
//! history_limit = 50
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backoff::BackoffPolicy;
use crate::error::{Result, SyncError};

/// Tuning for a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Poll interval after a success, in seconds.
    pub base_interval: u64,
    /// Upper bound of the backed-off poll interval, in seconds.
    pub max_interval: u64,
    /// Per-fetch timeout, in seconds.
    pub fetch_timeout: u64,
    /// Freshness window for the connection status, in seconds.
    pub stale_after: u64,
    /// Number of readings kept in the history buffer.
    pub history_limit: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_interval: 5,
            max_interval: 30,
            fetch_timeout: 10,
            stale_after: 30,
            history_limit: 50,
        }
    }
}

impl SyncConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file_error = |message: String| SyncError::ConfigFile {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let config: Self = toml::from_str(&content).map_err(|e| file_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every interval is non-zero and the backoff range is sane.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("base_interval", self.base_interval),
            ("max_interval", self.max_interval),
            ("fetch_timeout", self.fetch_timeout),
            ("stale_after", self.stale_after),
            ("history_limit", u64::from(self.history_limit)),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| *value == 0) {
            return Err(SyncError::InvalidConfig(format!("{name} must be greater than 0")));
        }
        if self.max_interval < self.base_interval {
            return Err(SyncError::InvalidConfig(format!(
                "max_interval ({}) must be at least base_interval ({})",
                self.max_interval, self.base_interval
            )));
        }
        Ok(())
    }

    /// Backoff policy derived from the interval bounds.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(self.base_interval),
            Duration::from_secs(self.max_interval),
        )
    }

    /// Per-fetch timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }

    /// Freshness window as a [`Duration`].
    pub fn stale_window(&self) -> Duration {
        Duration::from_secs(self.stale_after)
    }
}
