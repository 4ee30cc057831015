//! Raw sensor readings as produced by the upstream simulator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single environmental reading from a cold-chain sensor.
///
/// Immutable value consumed by the damage detector only. The `id`
/// doubles as the order id for any damage event derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Reading id, e.g. `evt_1`
    pub id: String,
    /// Time the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Producing sensor or simulator instance
    pub source: String,
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Sensor-reported status string, passed through verbatim
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_round_trips_through_json() {
        let json = r#"{
            "id": "evt_1",
            "timestamp": "2025-06-01T12:00:00.000Z",
            "source": "sensor-sim-1",
            "temperature": 9.23,
            "humidity": 58.0,
            "status": "active"
        }"#;

        let reading: SensorReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.id, "evt_1");
        assert_eq!(reading.temperature, 9.23);

        let encoded = serde_json::to_string(&reading).unwrap();
        let decoded: SensorReading = serde_json::from_str(&encoded).unwrap();
        assert_eq!(reading, decoded);
    }
}
