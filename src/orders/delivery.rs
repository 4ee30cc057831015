//! Decoding of queue deliveries into damage events.

use crate::domain::DamageEvent;
use crate::fabric::topics;
use crate::{ColdchainError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Bridge wrapper around an MQTT message forwarded onto the queue
/// broker: the original payload travels as a string keyed by topic.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedDelivery {
    /// Topic the bridged message was read from
    pub mqtt_topic: String,
    /// Stringified original payload
    pub payload: String,
    /// Bridge receive time
    pub timestamp: Option<DateTime<Utc>>,
}

/// A delivery on the damage queue.
///
/// The producer side is heterogeneous: the detector publishes bare
/// [`DamageEvent`]s while the MQTT bridge wraps them. Both shapes decode
/// through [`DamageDelivery::decode`], the single entry point the
/// consumer uses.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DamageDelivery {
    /// A bare damage event
    Damage(DamageEvent),
    /// A bridge-wrapped damage event
    Wrapped(WrappedDelivery),
}

impl DamageDelivery {
    /// Decode a queue payload into a damage event.
    ///
    /// Wrapped deliveries are only unwrapped when their source topic is
    /// the damage topic; anything else is poison.
    pub fn decode(payload: &[u8]) -> Result<DamageEvent> {
        let delivery: DamageDelivery = serde_json::from_slice(payload)?;
        match delivery {
            DamageDelivery::Damage(event) => Ok(event),
            DamageDelivery::Wrapped(wrapped) => {
                if wrapped.mqtt_topic != topics::MQTT_DAMAGE_TOPIC {
                    return Err(ColdchainError::Decode(format!(
                        "wrapped delivery from unexpected topic {:?}",
                        wrapped.mqtt_topic
                    )));
                }
                serde_json::from_str(&wrapped.payload).map_err(ColdchainError::from)
            }
        }
    }
}
