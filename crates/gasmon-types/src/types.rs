//! Core types for gas sensor readings.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::PayloadError;

/// Safety classification of a single gas channel.
///
/// Serialized as `"SAFE"` / `"DANGER"` on the wire and in storage.
/// Ordered by severity so `status >= GasStatus::Danger` reads naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum GasStatus {
    /// Value at or below the threshold.
    #[default]
    Safe,
    /// Value strictly above the threshold.
    Danger,
}

impl GasStatus {
    /// The wire representation of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GasStatus::Safe => "SAFE",
            GasStatus::Danger => "DANGER",
        }
    }

    /// Returns `true` for [`GasStatus::Danger`].
    #[must_use]
    pub fn is_danger(&self) -> bool {
        matches!(self, GasStatus::Danger)
    }
}

impl fmt::Display for GasStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GasStatus {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAFE" => Ok(GasStatus::Safe),
            "DANGER" => Ok(GasStatus::Danger),
            other => Err(PayloadError::UnknownStatus(other.to_string())),
        }
    }
}

/// Raw values submitted by a sensor device.
///
/// Every field is optional on the wire. Absent fields, `null`, and values that
/// are neither numbers nor numeric strings all decode as `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorPayload {
    /// Gas channel 1 (ppm).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_number"))]
    pub gas1: f64,
    /// Gas channel 2 (ppm).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_number"))]
    pub gas2: f64,
    /// Gas channel 3 (ppm).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_number"))]
    pub gas3: f64,
    /// Gas channel 4 (ppm).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_number"))]
    pub gas4: f64,
    /// Temperature in degrees Celsius.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_number"))]
    pub temperature: f64,
    /// Relative humidity (%).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_number"))]
    pub humidity: f64,
    /// Distance from the level sensor to the surface (cm).
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_number"))]
    pub distance: f64,
}

impl SensorPayload {
    /// Decode a request body.
    ///
    /// The body must be a JSON object; its fields are coerced leniently.
    ///
    /// # Examples
    ///
    /// ```
    /// use gasmon_types::SensorPayload;
    ///
    /// let payload = SensorPayload::from_json(br#"{"gas1": "512", "humidity": null}"#).unwrap();
    /// assert_eq!(payload.gas1, 512.0);
    /// assert_eq!(payload.humidity, 0.0);
    ///
    /// assert!(SensorPayload::from_json(b"[1, 2, 3]").is_err());
    /// ```
    #[cfg(feature = "serde")]
    pub fn from_json(body: &[u8]) -> Result<Self, PayloadError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;
        if !value.is_object() {
            return Err(PayloadError::NotAnObject);
        }
        serde_json::from_value(value).map_err(|e| PayloadError::InvalidJson(e.to_string()))
    }

    /// The four gas channel values in channel order.
    #[must_use]
    pub fn gas_values(&self) -> [f64; 4] {
        [self.gas1, self.gas2, self.gas3, self.gas4]
    }
}

#[cfg(feature = "serde")]
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    let value = match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Raw::Other(_) => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

/// A classified reading that has not been persisted yet.
///
/// Produced by [`Classifier::evaluate`](crate::Classifier::evaluate); the store
/// assigns the identifier and creation timestamp on insert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewReading {
    pub gas1: f64,
    pub gas2: f64,
    pub gas3: f64,
    pub gas4: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub distance: f64,
    pub gas1_status: GasStatus,
    pub gas2_status: GasStatus,
    pub gas3_status: GasStatus,
    pub gas4_status: GasStatus,
    pub alert_flag: bool,
}

impl NewReading {
    /// Attach the store-assigned identity, producing the persisted record.
    #[must_use]
    pub fn into_reading(self, id: String, created_at: OffsetDateTime) -> Reading {
        Reading {
            id,
            gas1: self.gas1,
            gas2: self.gas2,
            gas3: self.gas3,
            gas4: self.gas4,
            temperature: self.temperature,
            humidity: self.humidity,
            distance: self.distance,
            gas1_status: self.gas1_status,
            gas2_status: self.gas2_status,
            gas3_status: self.gas3_status,
            gas4_status: self.gas4_status,
            alert_flag: self.alert_flag,
            created_at,
        }
    }
}

/// One persisted sensor sample with its derived safety classification.
///
/// Readings are append-only. They are ordered by `created_at`, with ties
/// broken by insertion order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Store-assigned opaque identifier.
    pub id: String,
    pub gas1: f64,
    pub gas2: f64,
    pub gas3: f64,
    pub gas4: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity (%).
    pub humidity: f64,
    /// Distance to surface (cm).
    pub distance: f64,
    pub gas1_status: GasStatus,
    pub gas2_status: GasStatus,
    pub gas3_status: GasStatus,
    pub gas4_status: GasStatus,
    /// `true` iff at least one channel is [`GasStatus::Danger`].
    pub alert_flag: bool,
    /// Store-assigned creation time.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
}

impl Reading {
    /// The four gas channel values in channel order.
    #[must_use]
    pub fn gas_values(&self) -> [f64; 4] {
        [self.gas1, self.gas2, self.gas3, self.gas4]
    }

    /// The four channel statuses in channel order.
    #[must_use]
    pub fn statuses(&self) -> [GasStatus; 4] {
        [
            self.gas1_status,
            self.gas2_status,
            self.gas3_status,
            self.gas4_status,
        ]
    }

    /// Channel numbers (1-based) currently classified as danger.
    pub fn danger_channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.statuses()
            .into_iter()
            .enumerate()
            .filter(|(_, status)| status.is_danger())
            .map(|(i, _)| i + 1)
    }
}

/// Notification delivered on the push channel.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
#[non_exhaustive]
pub enum ReadingEvent {
    /// A reading was appended to the store.
    Inserted { reading: Reading },
}

impl ReadingEvent {
    /// The reading carried by this event.
    #[must_use]
    pub fn reading(&self) -> &Reading {
        match self {
            ReadingEvent::Inserted { reading } => reading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_reading() -> Reading {
        Reading {
            id: "r-1".to_string(),
            gas1: 512.0,
            gas2: 0.0,
            gas3: 120.5,
            gas4: 401.0,
            temperature: 21.5,
            humidity: 48.0,
            distance: 90.0,
            gas1_status: GasStatus::Danger,
            gas2_status: GasStatus::Safe,
            gas3_status: GasStatus::Safe,
            gas4_status: GasStatus::Danger,
            alert_flag: true,
            created_at: datetime!(2024-03-01 12:00:00 UTC),
        }
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&GasStatus::Safe).unwrap(), "\"SAFE\"");
        assert_eq!(
            serde_json::to_string(&GasStatus::Danger).unwrap(),
            "\"DANGER\""
        );
        assert_eq!("DANGER".parse::<GasStatus>().unwrap(), GasStatus::Danger);
        assert!("danger".parse::<GasStatus>().is_err());
    }

    #[test]
    fn test_status_ordering() {
        assert!(GasStatus::Danger > GasStatus::Safe);
        assert_eq!(GasStatus::default(), GasStatus::Safe);
    }

    #[test]
    fn test_payload_empty_object_defaults_to_zero() {
        let payload = SensorPayload::from_json(b"{}").unwrap();
        assert_eq!(payload, SensorPayload::default());
    }

    #[test]
    fn test_payload_coerces_non_numeric_values() {
        let body = br#"{
            "gas1": " 450.5 ",
            "gas2": "abc",
            "gas3": true,
            "gas4": [1],
            "temperature": null,
            "humidity": 55,
            "distance": {"cm": 3}
        }"#;
        let payload = SensorPayload::from_json(body).unwrap();

        assert_eq!(payload.gas1, 450.5);
        assert_eq!(payload.gas2, 0.0);
        assert_eq!(payload.gas3, 0.0);
        assert_eq!(payload.gas4, 0.0);
        assert_eq!(payload.temperature, 0.0);
        assert_eq!(payload.humidity, 55.0);
        assert_eq!(payload.distance, 0.0);
    }

    #[test]
    fn test_payload_ignores_client_supplied_derived_fields() {
        let body = br#"{"gas1": 10, "alert_flag": true, "gas1_status": "DANGER", "id": "x"}"#;
        let payload = SensorPayload::from_json(body).unwrap();
        assert_eq!(payload.gas1, 10.0);
    }

    #[test]
    fn test_payload_rejects_non_object_bodies() {
        assert_eq!(
            SensorPayload::from_json(b"42"),
            Err(PayloadError::NotAnObject)
        );
        assert_eq!(
            SensorPayload::from_json(b"null"),
            Err(PayloadError::NotAnObject)
        );
        assert!(matches!(
            SensorPayload::from_json(b"{gas1: 1"),
            Err(PayloadError::InvalidJson(_))
        ));
        assert!(matches!(
            SensorPayload::from_json(b""),
            Err(PayloadError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_reading_wire_format() {
        let json = serde_json::to_value(sample_reading()).unwrap();

        assert_eq!(json["id"], "r-1");
        assert_eq!(json["gas1_status"], "DANGER");
        assert_eq!(json["gas2_status"], "SAFE");
        assert_eq!(json["alert_flag"], true);
        assert_eq!(json["created_at"], "2024-03-01T12:00:00Z");
    }

    #[test]
    fn test_reading_parses_offset_timestamps() {
        let mut json = serde_json::to_value(sample_reading()).unwrap();
        json["created_at"] = "2024-03-01T13:00:00+01:00".into();

        let reading: Reading = serde_json::from_value(json).unwrap();
        assert_eq!(reading.created_at, datetime!(2024-03-01 12:00:00 UTC));
    }

    #[test]
    fn test_danger_channels() {
        let channels: Vec<usize> = sample_reading().danger_channels().collect();
        assert_eq!(channels, vec![1, 4]);
    }

    #[test]
    fn test_event_is_tagged() {
        let event = ReadingEvent::Inserted {
            reading: sample_reading(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "inserted");
        assert_eq!(json["reading"]["id"], "r-1");

        let back: ReadingEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.reading(), &sample_reading());
    }
}
