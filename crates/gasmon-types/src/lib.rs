//! Reading model and safety classification for gas sensor monitoring.
//!
//! This crate holds the types shared by the ingestion service, the store and
//! the client-side sync engine:
//!
//! - [`SensorPayload`]: the raw values a device submits
//! - [`Classifier`]: per-channel [`GasStatus`] and the aggregate alert flag
//! - [`Reading`]: the persisted, classified record
//! - [`ReadingEvent`]: push-channel notifications
//! - [`conditions`]: derived tank level and comfort bands
//!
//! # Example
//!
//! ```
//! use gasmon_types::{Classifier, GasStatus, SensorPayload};
//!
//! let payload = SensorPayload { gas1: 500.0, ..SensorPayload::default() };
//! let reading = Classifier::default().evaluate(&payload);
//!
//! assert_eq!(reading.gas1_status, GasStatus::Danger);
//! assert!(reading.alert_flag);
//! ```

pub mod classify;
pub mod conditions;
pub mod error;
pub mod types;

pub use classify::{Classifier, DEFAULT_GAS_THRESHOLD, aggregate_alert, classify};
pub use conditions::{
    DEFAULT_TANK_DEPTH_CM, EnvironmentConditions, HumidityComfort, LevelStatus, TemperatureComfort,
};
pub use error::{PayloadError, PayloadResult};
pub use types::{GasStatus, NewReading, Reading, ReadingEvent, SensorPayload};
