//! Payload shapes, one per message type

use super::message::MessageType;
use serde::{Deserialize, Serialize};

/// Handshake / status frame sent by the server on connect
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPayload {
    pub status: Option<String>,
    pub client_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdatePayload {
    pub name: Option<String>,
    pub status: Option<String>,
    pub capacity: Option<u32>,
    #[serde(default)]
    pub changed_fields: Vec<String>,
}

/// Ticket sale (or refund, with a negative amount)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketUpdatePayload {
    pub ticket_type_id: Option<String>,
    pub ticket_type: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub amount: f64,
    pub remaining: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendeeAction {
    Registered,
    Updated,
    Cancelled,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeUpdatePayload {
    pub attendee_id: String,
    pub action: AttendeeAction,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Server-assigned id; the inbox generates one when absent
    pub id: Option<String>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub level: NotificationLevel,
    pub action_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsUpdatePayload {
    pub metric: String,
    pub value: f64,
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInPayload {
    pub attendee_id: String,
    pub attendee_name: Option<String>,
    pub ticket_type: Option<String>,
    pub gate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdatePayload {
    pub payment_id: String,
    pub status: String,
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: Option<String>,
    pub message: String,
}

/// Typed payload, discriminated by the frame's `type`
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Connection(ConnectionPayload),
    EventUpdate(EventUpdatePayload),
    TicketUpdate(TicketUpdatePayload),
    AttendeeUpdate(AttendeeUpdatePayload),
    Notification(NotificationPayload),
    AnalyticsUpdate(AnalyticsUpdatePayload),
    CheckIn(CheckInPayload),
    PaymentUpdate(PaymentUpdatePayload),
    Error(ErrorPayload),
    Ping,
    Pong,
}

impl Payload {
    pub fn kind(&self) -> MessageType {
        match self {
            Payload::Connection(_) => MessageType::Connection,
            Payload::EventUpdate(_) => MessageType::EventUpdate,
            Payload::TicketUpdate(_) => MessageType::TicketUpdate,
            Payload::AttendeeUpdate(_) => MessageType::AttendeeUpdate,
            Payload::Notification(_) => MessageType::Notification,
            Payload::AnalyticsUpdate(_) => MessageType::AnalyticsUpdate,
            Payload::CheckIn(_) => MessageType::CheckIn,
            Payload::PaymentUpdate(_) => MessageType::PaymentUpdate,
            Payload::Error(_) => MessageType::Error,
            Payload::Ping => MessageType::Ping,
            Payload::Pong => MessageType::Pong,
        }
    }

    /// Deserialize the raw `payload` value for the given type
    pub(crate) fn from_value(
        kind: MessageType,
        value: serde_json::Value,
    ) -> std::result::Result<Self, serde_json::Error> {
        use serde_json::from_value;

        Ok(match kind {
            MessageType::Connection => Payload::Connection(from_value(value)?),
            MessageType::EventUpdate => Payload::EventUpdate(from_value(value)?),
            MessageType::TicketUpdate => Payload::TicketUpdate(from_value(value)?),
            MessageType::AttendeeUpdate => Payload::AttendeeUpdate(from_value(value)?),
            MessageType::Notification => Payload::Notification(from_value(value)?),
            MessageType::AnalyticsUpdate => Payload::AnalyticsUpdate(from_value(value)?),
            MessageType::CheckIn => Payload::CheckIn(from_value(value)?),
            MessageType::PaymentUpdate => Payload::PaymentUpdate(from_value(value)?),
            MessageType::Error => Payload::Error(from_value(value)?),
            MessageType::Ping => Payload::Ping,
            MessageType::Pong => Payload::Pong,
        })
    }
}
