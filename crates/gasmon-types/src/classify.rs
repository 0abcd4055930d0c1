//! Gas channel safety classification.
//!
//! A channel is [`GasStatus::Danger`] if and only if its value strictly
//! exceeds the threshold (400 ppm by default). The aggregate alert flag is the
//! logical OR of the four channel statuses and is always recomputed here,
//! never taken from input.
//!
//! # Example
//!
//! ```
//! use gasmon_types::{GasStatus, aggregate_alert, classify};
//!
//! assert_eq!(classify(400.0), GasStatus::Safe);
//! assert_eq!(classify(400.5), GasStatus::Danger);
//!
//! let statuses = [GasStatus::Safe, GasStatus::Danger, GasStatus::Safe, GasStatus::Safe];
//! assert!(aggregate_alert(statuses));
//! ```

use crate::types::{GasStatus, NewReading, SensorPayload};

/// Default gas threshold in ppm.
pub const DEFAULT_GAS_THRESHOLD: f64 = 400.0;

/// Classify a channel value against [`DEFAULT_GAS_THRESHOLD`].
#[must_use]
pub fn classify(value: f64) -> GasStatus {
    classify_with(value, DEFAULT_GAS_THRESHOLD)
}

/// Classify a channel value against an explicit threshold.
#[must_use]
pub fn classify_with(value: f64, threshold: f64) -> GasStatus {
    if value > threshold {
        GasStatus::Danger
    } else {
        GasStatus::Safe
    }
}

/// `true` iff at least one status is [`GasStatus::Danger`].
#[must_use]
pub fn aggregate_alert(statuses: [GasStatus; 4]) -> bool {
    statuses.iter().any(GasStatus::is_danger)
}

/// Threshold evaluator for incoming payloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    threshold: f64,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_GAS_THRESHOLD)
    }
}

impl Classifier {
    /// Create a classifier with the given threshold (ppm).
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify one channel value.
    pub fn classify(&self, value: f64) -> GasStatus {
        classify_with(value, self.threshold)
    }

    /// Derive the four statuses and the alert flag for a payload.
    pub fn evaluate(&self, payload: &SensorPayload) -> NewReading {
        let [s1, s2, s3, s4] = payload.gas_values().map(|v| self.classify(v));

        NewReading {
            gas1: payload.gas1,
            gas2: payload.gas2,
            gas3: payload.gas3,
            gas4: payload.gas4,
            temperature: payload.temperature,
            humidity: payload.humidity,
            distance: payload.distance,
            gas1_status: s1,
            gas2_status: s2,
            gas3_status: s3,
            gas4_status: s4,
            alert_flag: aggregate_alert([s1, s2, s3, s4]),
        }
    }
}
