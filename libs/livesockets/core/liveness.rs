//! Connection liveness tracking
//!
//! A connection is considered dead when a ping was sent and no inbound
//! traffic at all (pong or any other frame) arrived within the timeout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Tracks outbound pings against inbound traffic
///
/// Timestamps are stored as milliseconds since an internal epoch, offset by
/// one so that zero always means "never".
pub struct LivenessTracker {
    epoch: Instant,
    last_ping_sent_ms: AtomicU64,
    last_traffic_ms: AtomicU64,
    timeout: Duration,
}

impl LivenessTracker {
    /// # Arguments
    /// * `timeout` - How long after a ping the connection may stay silent
    pub fn new(timeout: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            last_ping_sent_ms: AtomicU64::new(0),
            last_traffic_ms: AtomicU64::new(0),
            timeout,
        }
    }

    #[inline]
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64 + 1
    }

    pub fn record_ping_sent(&self) {
        self.last_ping_sent_ms.store(self.now_ms(), Ordering::Release);
    }

    /// Record any inbound frame, decodable or not
    pub fn record_traffic(&self) {
        self.last_traffic_ms.store(self.now_ms(), Ordering::Release);
    }

    /// Healthy unless a ping is outstanding for longer than the timeout
    pub fn is_healthy(&self) -> bool {
        self.silence_after_ping()
            .map_or(true, |silence| silence < self.timeout)
    }

    /// Time since the outstanding ping, if no traffic followed it
    pub fn silence_after_ping(&self) -> Option<Duration> {
        let ping_ms = self.last_ping_sent_ms.load(Ordering::Acquire);
        let traffic_ms = self.last_traffic_ms.load(Ordering::Acquire);

        if ping_ms == 0 || traffic_ms >= ping_ms {
            return None;
        }
        Some(Duration::from_millis(self.now_ms().saturating_sub(ping_ms)))
    }

    pub fn time_since_last_traffic(&self) -> Option<Duration> {
        let traffic_ms = self.last_traffic_ms.load(Ordering::Acquire);
        if traffic_ms == 0 {
            return None;
        }
        Some(Duration::from_millis(self.now_ms().saturating_sub(traffic_ms)))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Call on every new connection
    pub fn reset(&self) {
        self.last_ping_sent_ms.store(0, Ordering::Release);
        self.last_traffic_ms.store(0, Ordering::Release);
    }
}
