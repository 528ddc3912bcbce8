//! Frame decoding and control-frame encoding
//!
//! Inbound frames are JSON objects:
//!
//! ```text
//! { "type": "check_in",
//!   "payload": { "attendeeId": "A-17", ... },
//!   "timestamp": "2026-03-01T18:04:05Z",
//!   "eventId": "E1",
//!   "userId": "U9" }
//! ```
//!
//! `payload` defaults to `{}` and `timestamp` to the receive time when
//! absent. Everything else that is wrong fails the frame.

use super::message::{Message, MessageType};
use super::payload::Payload;
use crate::traits::{DecodeError, WsMessage};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Outbound frames originated by the client itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFrame {
    Ping,
}

impl ControlFrame {
    pub fn kind(&self) -> MessageType {
        match self {
            ControlFrame::Ping => MessageType::Ping,
        }
    }
}

/// Decode one transport frame into a typed message
pub fn decode(frame: &WsMessage) -> Result<Message, DecodeError> {
    let text = match frame {
        WsMessage::Text(text) => text,
        WsMessage::Binary(data) => return Err(DecodeError::BinaryFrame(data.len())),
    };
    decode_str(text)
}

/// Decode a JSON text frame
pub fn decode_str(text: &str) -> Result<Message, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

    let mut object = match value {
        Value::Object(object) => object,
        _ => return Err(DecodeError::NotAnObject),
    };

    let kind = match object.get("type") {
        Some(Value::String(name)) => name
            .parse::<MessageType>()
            .map_err(DecodeError::UnknownType)?,
        _ => return Err(DecodeError::MissingType),
    };

    let payload_value = match object.remove("payload") {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    };
    let payload =
        Payload::from_value(kind, payload_value).map_err(|e| DecodeError::InvalidPayload {
            kind: kind.to_string(),
            reason: e.to_string(),
        })?;

    let timestamp = match object.get("timestamp") {
        None | Some(Value::Null) => Utc::now(),
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|_| DecodeError::InvalidTimestamp(raw.clone()))?,
        Some(other) => return Err(DecodeError::InvalidTimestamp(other.to_string())),
    };

    Ok(Message {
        payload,
        timestamp,
        event_id: correlation(&object, "eventId")?,
        user_id: correlation(&object, "userId")?,
    })
}

/// Correlation ids may arrive as strings or numbers; both compare as strings
fn correlation(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, DecodeError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(id.clone())),
        Some(Value::Number(id)) => Ok(Some(id.to_string())),
        Some(_) => Err(DecodeError::InvalidCorrelation(field)),
    }
}

/// Encode a control frame for the transport
pub fn encode(frame: &ControlFrame) -> WsMessage {
    encode_at(frame, Utc::now())
}

pub(crate) fn encode_at(frame: &ControlFrame, timestamp: DateTime<Utc>) -> WsMessage {
    let value = serde_json::json!({
        "type": frame.kind().as_str(),
        "timestamp": timestamp.to_rfc3339(),
    });
    WsMessage::Text(value.to_string())
}
