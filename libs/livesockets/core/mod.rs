//! # Connection manager
//!
//! One tokio task per client owns the socket and runs the lifecycle
//! state machine (see [`connection_state`]); the [`RealtimeClient`] handle
//! talks to it through a command channel.
//!
//! ## Example
//!
//! ```rust,ignore
//! use livesockets::{MessageType, Message};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> livesockets::Result<()> {
//!     let client = livesockets::builder()
//!         .url("wss://live.example.com/ws")
//!         .bearer_token("session-token")
//!         .heartbeat(Duration::from_secs(30), Duration::from_secs(10))
//!         .backoff(Duration::from_secs(1), Duration::from_secs(30), Some(10), 0.2)
//!         .build()
//!         .await?;
//!
//!     let _sub = client.subscribe(MessageType::CheckIn, |message: &Message| -> livesockets::Result<()> {
//!         println!("check-in for {:?}", message.event_id());
//!         Ok(())
//!     });
//!
//!     while let Ok(event) = client.recv_event() {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod heartbeat;
pub mod liveness;

// Re-export main types
pub use builder::{states, RealtimeClientBuilder};
pub use client::{ClientEvent, Metrics, RealtimeClient};
pub use config::ClientConfig;
pub use connection_state::{AtomicMetrics, ConnectionState, ConnectionStatus};
pub use heartbeat::HeartbeatConfig;
pub use liveness::LivenessTracker;

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new realtime client builder
///
/// # Example
/// ```ignore
/// let client = livesockets::builder()
///     .url("wss://live.example.com/ws")
///     .require_handshake(true)
///     .build()
///     .await?;
/// ```
pub fn builder() -> RealtimeClientBuilder<builder::states::NoUrl> {
    RealtimeClientBuilder::new()
}
