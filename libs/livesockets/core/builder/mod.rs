pub mod states;

use crate::client::RealtimeClient;
use crate::config::ClientConfig;
use crate::heartbeat::HeartbeatConfig;
use crate::inbox::NotificationInbox;
use crate::registry::SubscriptionRegistry;
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on opening the transport
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default buffer of the notification presentation broadcast
pub const DEFAULT_PRESENTATION_CAPACITY: usize = 64;

/// Type-state builder for [`RealtimeClient`]
///
/// The URL must be set before `build()` is available.
pub struct RealtimeClientBuilder<U>
where
    U: UrlState,
{
    _state: TypeState<U>,
    url: Option<String>,
    headers: Option<Arc<dyn HeaderProvider>>,
    heartbeat: Option<HeartbeatConfig>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    connect_timeout: Duration,
    require_handshake: bool,
    registry: Option<SubscriptionRegistry>,
    presentation_capacity: usize,
}

impl RealtimeClientBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            headers: None,
            heartbeat: Some(HeartbeatConfig::default()),
            reconnect_strategy: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            require_handshake: false,
            registry: None,
            presentation_capacity: DEFAULT_PRESENTATION_CAPACITY,
        }
    }

    pub fn url(self, url: impl Into<String>) -> RealtimeClientBuilder<HasUrl> {
        RealtimeClientBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            headers: self.headers,
            heartbeat: self.heartbeat,
            reconnect_strategy: self.reconnect_strategy,
            connect_timeout: self.connect_timeout,
            require_handshake: self.require_handshake,
            registry: self.registry,
            presentation_capacity: self.presentation_capacity,
        }
    }
}

impl Default for RealtimeClientBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<U> RealtimeClientBuilder<U>
where
    U: UrlState,
{
    pub fn headers(mut self, provider: impl HeaderProvider + 'static) -> Self {
        self.headers = Some(Arc::new(provider));
        self
    }

    /// Send `Authorization: Bearer <token>` on every connection attempt
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.headers(BearerToken::new(token))
    }

    /// Ping every `interval`; reconnect when a ping goes unanswered for `timeout`
    pub fn heartbeat(mut self, interval: Duration, timeout: Duration) -> Self {
        self.heartbeat = Some(HeartbeatConfig { interval, timeout });
        self
    }

    pub fn no_heartbeat(mut self) -> Self {
        self.heartbeat = None;
        self
    }

    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Shorthand for [`ExponentialBackoff`] with jitter
    pub fn backoff(
        self,
        base_delay: Duration,
        max_delay: Duration,
        max_attempts: Option<usize>,
        jitter: f64,
    ) -> Self {
        self.reconnect_strategy(
            ExponentialBackoff::new(base_delay, max_delay, max_attempts).with_jitter(jitter),
        )
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Only enter `Connected` once the server has sent a `connection` message
    pub fn require_handshake(mut self, required: bool) -> Self {
        self.require_handshake = required;
        self
    }

    /// Dispatch into an existing registry instead of a fresh one
    ///
    /// Lets subscriptions be installed before the first frame can arrive.
    pub fn registry(mut self, registry: SubscriptionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn presentation_capacity(mut self, capacity: usize) -> Self {
        self.presentation_capacity = capacity;
        self
    }
}

// Build method - only available once the URL is set
impl RealtimeClientBuilder<HasUrl> {
    /// Validate the configuration and start the connection task
    ///
    /// Must be called from within a tokio runtime. Returns as soon as the
    /// task is spawned; watch [`RealtimeClient::watch_status`] for `Connected`.
    pub async fn build(self) -> Result<RealtimeClient> {
        let url = self
            .url
            .ok_or_else(|| LiveError::Configuration("URL must be set".into()))?;

        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(LiveError::Configuration(format!(
                "URL must use ws:// or wss://, got '{}'",
                url
            )));
        }

        if let Some(heartbeat) = &self.heartbeat {
            if heartbeat.interval.is_zero() || heartbeat.timeout.is_zero() {
                return Err(LiveError::Configuration(
                    "heartbeat interval and timeout must be non-zero".into(),
                ));
            }
        }

        if self.connect_timeout.is_zero() {
            return Err(LiveError::Configuration(
                "connect timeout must be non-zero".into(),
            ));
        }

        let reconnect_strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(ExponentialBackoff::default()));

        let config = ClientConfig {
            url,
            headers: self.headers,
            heartbeat: self.heartbeat,
            reconnect_strategy,
            connect_timeout: self.connect_timeout,
            require_handshake: self.require_handshake,
            registry: self.registry.unwrap_or_default(),
            inbox: NotificationInbox::new(self.presentation_capacity),
        };

        Ok(RealtimeClient::start(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_websocket_url() {
        let result = RealtimeClientBuilder::new()
            .url("https://example.com/live")
            .build()
            .await;
        assert!(matches!(result, Err(LiveError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_rejects_zero_heartbeat() {
        let result = RealtimeClientBuilder::new()
            .url("ws://127.0.0.1:9")
            .heartbeat(Duration::ZERO, Duration::from_secs(1))
            .build()
            .await;
        assert!(matches!(result, Err(LiveError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_rejects_zero_connect_timeout() {
        let result = RealtimeClientBuilder::new()
            .url("ws://127.0.0.1:9")
            .connect_timeout(Duration::ZERO)
            .build()
            .await;
        assert!(matches!(result, Err(LiveError::Configuration(_))));
    }
}
