//! Derived environment conditions.
//!
//! Pure helpers that turn the non-gas channels of a [`Reading`] into
//! operator-facing bands: tank fill level from the distance sensor, and
//! comfort bands for temperature and humidity.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::Reading;

/// Default depth of the monitored tank (cm).
pub const DEFAULT_TANK_DEPTH_CM: f64 = 200.0;

/// Fill percentage for a distance-to-surface measurement, clamped to `0..=100`.
///
/// A non-positive `depth_cm` yields `0.0`.
///
/// ```
/// use gasmon_types::conditions::fill_percent;
///
/// assert_eq!(fill_percent(100.0, 200.0), 50.0);
/// assert_eq!(fill_percent(250.0, 200.0), 0.0);
/// assert_eq!(fill_percent(-10.0, 200.0), 100.0);
/// ```
#[must_use]
pub fn fill_percent(distance_cm: f64, depth_cm: f64) -> f64 {
    if depth_cm <= 0.0 || !depth_cm.is_finite() {
        return 0.0;
    }
    ((depth_cm - distance_cm) * 100.0 / depth_cm).clamp(0.0, 100.0)
}

/// Tank level band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LevelStatus {
    Normal,
    Warning,
    Critical,
}

impl LevelStatus {
    /// Band for a fill percentage (`> 80` critical, `> 60` warning).
    pub fn from_fill(percent: f64) -> Self {
        if percent > 80.0 {
            LevelStatus::Critical
        } else if percent > 60.0 {
            LevelStatus::Warning
        } else {
            LevelStatus::Normal
        }
    }

    /// Get a human-readable description of the level.
    pub fn description(&self) -> &'static str {
        match self {
            LevelStatus::Normal => "Normal - level within capacity",
            LevelStatus::Warning => "Warning - tank filling up",
            LevelStatus::Critical => "Critical - schedule emptying now",
        }
    }
}

/// Temperature comfort band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TemperatureComfort {
    Cold,
    Normal,
    Hot,
}

impl TemperatureComfort {
    /// Band for a temperature in degrees Celsius.
    pub fn from_celsius(celsius: f64) -> Self {
        if celsius < 18.0 {
            TemperatureComfort::Cold
        } else if celsius > 35.0 {
            TemperatureComfort::Hot
        } else {
            TemperatureComfort::Normal
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TemperatureComfort::Cold => "Cold",
            TemperatureComfort::Normal => "Normal",
            TemperatureComfort::Hot => "Hot",
        }
    }
}

/// Humidity comfort band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HumidityComfort {
    Dry,
    Normal,
    Humid,
}

impl HumidityComfort {
    /// Band for a relative humidity percentage.
    pub fn from_percent(percent: f64) -> Self {
        if percent < 30.0 {
            HumidityComfort::Dry
        } else if percent > 70.0 {
            HumidityComfort::Humid
        } else {
            HumidityComfort::Normal
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            HumidityComfort::Dry => "Dry",
            HumidityComfort::Normal => "Normal",
            HumidityComfort::Humid => "Humid",
        }
    }
}

/// All derived bands for one reading.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvironmentConditions {
    pub fill_percent: f64,
    pub level: LevelStatus,
    pub temperature: TemperatureComfort,
    pub humidity: HumidityComfort,
}

impl EnvironmentConditions {
    /// Derive conditions using [`DEFAULT_TANK_DEPTH_CM`].
    pub fn from_reading(reading: &Reading) -> Self {
        Self::with_depth(reading, DEFAULT_TANK_DEPTH_CM)
    }

    /// Derive conditions for a tank of the given depth.
    pub fn with_depth(reading: &Reading, depth_cm: f64) -> Self {
        let fill = fill_percent(reading.distance, depth_cm);
        Self {
            fill_percent: fill,
            level: LevelStatus::from_fill(fill),
            temperature: TemperatureComfort::from_celsius(reading.temperature),
            humidity: HumidityComfort::from_percent(reading.humidity),
        }
    }
}
