//! Damage events derived from sensor readings.

use super::sensor::SensorReading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity grades for a damage event.
///
/// The detector only ever emits the first three grades; `Unknown`
/// exists so that a foreign payload with an unrecognized severity can
/// still be consumed (the order service maps it to
/// `damage_detected_unknown` instead of poisoning the delivery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Threshold crossed, no aggravating conditions
    Minor,
    /// Elevated temperature or humidity
    Major,
    /// Extreme temperature or humidity
    Critical,
    /// Unrecognized grade on a received event
    Unknown,
}

impl Severity {
    /// Derive severity from a reading.
    ///
    /// Pure in `(temperature, humidity)`: two readings with equal values
    /// always grade the same regardless of arrival order. Never returns
    /// [`Severity::Unknown`].
    pub fn from_reading(temperature: f64, humidity: f64) -> Self {
        if temperature >= 40.0 || humidity >= 90.0 {
            Severity::Critical
        } else if temperature >= 30.0 || humidity >= 80.0 {
            Severity::Major
        } else {
            Severity::Minor
        }
    }

    /// Parse a wire severity, mapping unrecognized grades to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "minor" => Severity::Minor,
            "major" => Severity::Major,
            "critical" => Severity::Critical,
            _ => Severity::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Severity::parse(&raw))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Minor => "minor",
            Severity::Major => "major",
            Severity::Critical => "critical",
            Severity::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Sensor measurements carried along with a damage event for triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageDetails {
    /// Temperature at detection time
    pub temperature: f64,
    /// Humidity at detection time
    pub humidity: f64,
    /// Sensor status string
    pub status: String,
    /// MQTT topic the reading arrived on
    pub source_topic: String,
}

/// Event emitted when a sensor reading crosses the damage threshold.
///
/// The reading id becomes both `event_id` and `order_id`, linking the
/// physical reading to the order whose goods it travelled with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageEvent {
    /// Unique event id (equal to the originating reading id)
    pub event_id: String,
    /// Always `order.damage`
    #[serde(rename = "type")]
    pub event_type: String,
    /// Producing detector instance
    pub source: String,
    /// When the damage was detected
    pub occurred_at: DateTime<Utc>,
    /// Order the damaged goods belong to
    pub order_id: String,
    /// Derived severity
    pub severity: Severity,
    /// Human-readable description of the trigger
    pub description: String,
    /// Measurements at detection time
    pub details: DamageDetails,
}

/// Event type constant for damage events.
pub const DAMAGE_EVENT_TYPE: &str = "order.damage";

impl DamageEvent {
    /// Build a damage event from a triggering reading.
    pub fn from_reading(reading: &SensorReading, detector: &str, source_topic: &str) -> Self {
        let severity = Severity::from_reading(reading.temperature, reading.humidity);
        Self {
            event_id: reading.id.clone(),
            event_type: DAMAGE_EVENT_TYPE.to_string(),
            source: detector.to_string(),
            occurred_at: Utc::now(),
            order_id: reading.id.clone(),
            severity,
            description: format!(
                "temperature {:.2}C outside permitted range (humidity {:.1}%)",
                reading.temperature, reading.humidity
            ),
            details: DamageDetails {
                temperature: reading.temperature,
                humidity: reading.humidity,
                status: reading.status.clone(),
                source_topic: source_topic.to_string(),
            },
        }
    }
}
