use super::payload::Payload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of message kinds the server may push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Connection,
    EventUpdate,
    TicketUpdate,
    AttendeeUpdate,
    Notification,
    AnalyticsUpdate,
    CheckIn,
    PaymentUpdate,
    Error,
    Ping,
    Pong,
}

impl MessageType {
    pub const ALL: [MessageType; 11] = [
        MessageType::Connection,
        MessageType::EventUpdate,
        MessageType::TicketUpdate,
        MessageType::AttendeeUpdate,
        MessageType::Notification,
        MessageType::AnalyticsUpdate,
        MessageType::CheckIn,
        MessageType::PaymentUpdate,
        MessageType::Error,
        MessageType::Ping,
        MessageType::Pong,
    ];

    /// Wire name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Connection => "connection",
            MessageType::EventUpdate => "event_update",
            MessageType::TicketUpdate => "ticket_update",
            MessageType::AttendeeUpdate => "attendee_update",
            MessageType::Notification => "notification",
            MessageType::AnalyticsUpdate => "analytics_update",
            MessageType::CheckIn => "check_in",
            MessageType::PaymentUpdate => "payment_update",
            MessageType::Error => "error",
            MessageType::Ping => "ping",
            MessageType::Pong => "pong",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// A decoded server message
///
/// The type is carried by the payload variant, so the two can never
/// disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
    pub event_id: Option<String>,
    pub user_id: Option<String>,
}

impl Message {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
            event_id: None,
            user_id: None,
        }
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[inline]
    pub fn kind(&self) -> MessageType {
        self.payload.kind()
    }

    pub fn event_id(&self) -> Option<&str> {
        self.event_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for kind in MessageType::ALL {
            assert_eq!(kind.as_str().parse::<MessageType>(), Ok(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_unknown_wire_name() {
        assert_eq!("checkin".parse::<MessageType>(), Err("checkin".to_string()));
    }

    #[test]
    fn test_kind_follows_payload() {
        let message = Message::new(Payload::Pong).with_event_id("E1");
        assert_eq!(message.kind(), MessageType::Pong);
        assert_eq!(message.event_id(), Some("E1"));
        assert_eq!(message.user_id(), None);
    }
}
