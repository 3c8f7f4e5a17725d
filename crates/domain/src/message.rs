//! Wire messages exchanged over the transport.
//!
//! Payloads are JSON objects. Some device firmware publishes Python-style
//! single-quoted objects, so [`decode`] falls back to normalizing quotes
//! when a payload is not valid JSON as sent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::id::RequestId;
use crate::sensor::SensorReading;

/// Request sent down the tree, e.g. `{"request_id": "…", "request": "status"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub request_id: RequestId,
    pub request: String,
}

/// Reply to a [`RequestMessage`], echoing its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub request_id: RequestId,
    #[serde(default)]
    pub response: Vec<SensorReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thing_id: Option<serde_json::Value>,
}

/// Unsolicited reading pushed by a device when a watched pin changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptMessage {
    pub interrupt: SensorReading,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thing_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thing_name: Option<String>,
}

/// The request every device understands.
pub const STATUS_REQUEST: &str = "status";

/// Decode a raw payload.
///
/// The payload is parsed as sent first. Only when that fails and it holds
/// single quotes are they rewritten to double quotes for a second attempt.
///
/// # Errors
///
/// Returns the JSON error when the payload is not valid UTF-8 or does not
/// describe a `T`.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, serde_json::Error> {
    let err = match serde_json::from_slice(payload) {
        Ok(message) => return Ok(message),
        Err(err) => err,
    };
    match std::str::from_utf8(payload) {
        Ok(text) if text.contains('\'') => serde_json::from_str(&text.replace('\'', "\"")),
        _ => Err(err),
    }
}

/// Encode a message as a JSON payload.
///
/// # Errors
///
/// Returns the JSON error if `message` cannot be serialized.
pub fn encode<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
