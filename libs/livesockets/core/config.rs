use crate::heartbeat::HeartbeatConfig;
use crate::inbox::NotificationInbox;
use crate::registry::SubscriptionRegistry;
use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for [`RealtimeClient`](crate::client::RealtimeClient)
///
/// Produced by the type-state builder; the URL is guaranteed to be set and
/// validated by the time this exists.
pub struct ClientConfig {
    /// WebSocket URL (wss:// or ws://)
    pub(crate) url: String,

    /// Optional header provider, consulted on every connection attempt
    pub(crate) headers: Option<Arc<dyn HeaderProvider>>,

    /// Ping cadence and liveness timeout; `None` disables the heartbeat
    pub(crate) heartbeat: Option<HeartbeatConfig>,

    /// Reconnection strategy
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,

    /// Upper bound on opening the transport (and on the handshake, if required)
    pub(crate) connect_timeout: Duration,

    /// Stay in `Connecting` until the server sends a `connection` message
    pub(crate) require_handshake: bool,

    /// Registry every decoded message is dispatched to
    pub(crate) registry: SubscriptionRegistry,

    /// Inbox fed from `notification` messages
    pub(crate) inbox: NotificationInbox,
}

impl ClientConfig {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn has_headers(&self) -> bool {
        self.headers.is_some()
    }

    pub fn heartbeat(&self) -> Option<HeartbeatConfig> {
        self.heartbeat
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn requires_handshake(&self) -> bool {
        self.require_handshake
    }

    /// Consecutive failures tolerated before giving up
    pub fn max_attempts(&self) -> Option<usize> {
        self.reconnect_strategy.max_attempts()
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("has_headers", &self.has_headers())
            .field("heartbeat", &self.heartbeat)
            .field("max_attempts", &self.max_attempts())
            .field("connect_timeout", &self.connect_timeout)
            .field("require_handshake", &self.require_handshake)
            .finish()
    }
}
