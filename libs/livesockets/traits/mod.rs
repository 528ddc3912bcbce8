//! # Traits
//!
//! Seams of the realtime client:
//!
//! - **MessageHandler**: subscriber callback for a message type
//! - **ReconnectionStrategy**: backoff policy between connection attempts
//! - **HeaderProvider**: per-attempt HTTP headers for the upgrade request
//!
//! plus the shared error taxonomy and the transport frame type.

pub mod error;
pub mod frame;
pub mod handler;
pub mod headers;
pub mod reconnect;

pub use error::{DecodeError, LiveError, Result};
pub use frame::WsMessage;
pub use handler::MessageHandler;
pub use headers::{BearerToken, HeaderProvider, Headers, NoHeaders};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
