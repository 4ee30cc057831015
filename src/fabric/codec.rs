//! JSON codec helpers.
//!
//! All payloads on all three brokers are UTF-8 JSON; timestamps travel
//! as RFC 3339 with fractional seconds.

use crate::{ColdchainError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Encode a payload for publishing.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ColdchainError::Decode(format!("encode failed: {e}")))
}

/// Decode a broker payload.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    serde_json::from_slice(payload).map_err(ColdchainError::from)
}

/// Format a timestamp for message headers.
pub fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
