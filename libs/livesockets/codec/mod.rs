//! Message codec
//!
//! Turns transport frames into typed [`Message`]s and builds the `ping`
//! control frame sent by the heartbeat.

pub mod message;
pub mod payload;
pub mod wire;

pub use message::{Message, MessageType};
pub use payload::{
    AnalyticsUpdatePayload, AttendeeAction, AttendeeUpdatePayload, CheckInPayload,
    ConnectionPayload, ErrorPayload, EventUpdatePayload, NotificationLevel, NotificationPayload,
    Payload, PaymentUpdatePayload, TicketUpdatePayload,
};
pub use wire::{decode, decode_str, encode, ControlFrame};
