//! # livesockets
//!
//! Real-time messaging client for live event dashboards.
//!
//! ## Features
//!
//! - **Typed codec**: inbound JSON frames decode into a closed `Payload` enum; bad frames are dropped, never fatal
//! - **Self-healing connection**: exponential backoff with jitter, heartbeat liveness, explicit state machine
//! - **Subscription registry**: ordered, isolated, synchronous dispatch with RAII unsubscribe handles
//! - **Notification inbox**: newest-first store with explicit dismissal plus a transient presentation stream
//! - **Domain hooks**: correlation-filtered aggregates (event stats, analytics, notification feeds)

pub mod codec;
pub mod core;
pub mod hooks;
pub mod inbox;
pub mod registry;
pub mod traits;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connection_state, heartbeat, liveness,
    builder::{states, RealtimeClientBuilder},
    client::{ClientEvent, Metrics, RealtimeClient},
    config::ClientConfig,
    connection_state::{AtomicMetrics, ConnectionState, ConnectionStatus},
    heartbeat::HeartbeatConfig,
    liveness::LivenessTracker,
};

pub use codec::{ControlFrame, Message, MessageType, Payload};
pub use hooks::{
    AnalyticsHook, Correlation, EventStats, EventStatsHook, LiveHook, NotificationFeed,
    NotificationFeedHook,
};
pub use inbox::{NotificationInbox, NotificationRecord};
pub use registry::{DispatchReport, Subscription, SubscriptionRegistry};

// Convenience function
pub use self::core::builder as client_builder;
