//! Connection lifecycle state and the status signal
//!
//! ```text
//!            ┌──────────── reconnect() from any state ─────────────┐
//!            ▼                                                     │
//!       Connecting ──open──▶ Connected ──disconnect()──▶ Disconnected
//!         ▲   │                  │
//!  backoff│   │ failure          │ close / error / heartbeat timeout
//!         │   ▼                  ▼
//!       Reconnecting ◀───────────┘
//!            │ ceiling reached
//!            ▼
//!          Error
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Connected = 1,
    Disconnected = 2,
    Reconnecting = 3,
    Error = 4,
}

impl ConnectionState {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Connected,
            2 => ConnectionState::Disconnected,
            3 => ConnectionState::Reconnecting,
            _ => ConnectionState::Error,
        }
    }

    /// No automatic transition leaves this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current connection state plus a watch channel announcing every change
///
/// Reads are a single atomic load. Writes are performed only by the
/// connection task.
pub struct ConnectionStatus {
    state: AtomicU8,
    signal: watch::Sender<ConnectionState>,
}

impl ConnectionStatus {
    pub fn new(initial: ConnectionState) -> Self {
        let (signal, _) = watch::channel(initial);
        Self {
            state: AtomicU8::new(initial as u8),
            signal,
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Set the state, returning the previous one
    ///
    /// Watchers are only woken when the value actually changes.
    pub fn set(&self, state: ConnectionState) -> ConnectionState {
        let previous = ConnectionState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        self.signal.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        previous
    }

    /// Subscribe to state changes
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.signal.subscribe()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }
}

/// Lock-free counters for the client
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    messages_received: AtomicU64,
    messages_sent: AtomicU64,
    decode_errors: AtomicU64,
    handler_failures: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_decode_errors(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_handler_failures(&self, count: u64) {
        self.handler_failures.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    pub fn handler_failures(&self) -> u64 {
        self.handler_failures.load(Ordering::Relaxed)
    }

    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_returns_previous() {
        let status = ConnectionStatus::new(ConnectionState::Connecting);
        assert_eq!(status.set(ConnectionState::Connected), ConnectionState::Connecting);
        assert_eq!(status.get(), ConnectionState::Connected);
        assert!(status.is_connected());
    }

    #[test]
    fn test_watch_sees_only_changes() {
        let status = ConnectionStatus::new(ConnectionState::Connecting);
        let mut rx = status.watch();

        status.set(ConnectionState::Connecting);
        assert!(!rx.has_changed().unwrap());

        status.set(ConnectionState::Reconnecting);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Reconnecting);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ConnectionState::Disconnected.is_terminal());
        assert!(ConnectionState::Error.is_terminal());
        assert!(!ConnectionState::Reconnecting.is_terminal());
        assert!(!ConnectionState::Connecting.is_terminal());
    }

    #[test]
    fn test_metrics_counters() {
        let metrics = AtomicMetrics::new();
        metrics.increment_received();
        metrics.increment_received();
        metrics.increment_decode_errors();
        metrics.add_handler_failures(3);
        assert_eq!(metrics.messages_received(), 2);
        assert_eq!(metrics.decode_errors(), 1);
        assert_eq!(metrics.handler_failures(), 3);
        assert_eq!(metrics.messages_sent(), 0);
    }
}
