use rand::Rng;
use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// The client keeps a counter of consecutive failed connection attempts.
/// After `n` failures it checks `should_reconnect(n)` and then waits
/// `next_delay(n - 1)`, so the first retry uses the base delay.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - Retries already scheduled in this run of failures (0 for the first retry)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting (ceiling reached)
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Reset the strategy state (called after successful connection)
    fn reset(&mut self);

    /// Check if we should continue reconnecting after `attempt` failures
    fn should_reconnect(&self, attempt: usize) -> bool;

    /// Ceiling on consecutive failures, if any
    fn max_attempts(&self) -> Option<usize>;
}

/// Exponential backoff reconnection strategy with jitter
///
/// Delay is `min(base * 2^attempt, cap)`, then reduced by a random
/// fraction in `[0, jitter]`. Jitter never pushes the delay past the cap.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy without jitter
    ///
    /// # Arguments
    /// * `base_delay` - Delay unit multiplied by `2^attempt`
    /// * `max_delay` - The maximum delay between reconnects
    /// * `max_attempts` - Consecutive failures before giving up (None = unlimited)
    pub fn new(base_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            base_delay,
            max_delay,
            max_attempts,
            jitter: 0.0,
        }
    }

    /// Set the jitter ratio, clamped to `[0, 1]`
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay before jitter is applied
    pub fn raw_delay(&self, attempt: usize) -> Duration {
        let factor = 2u64.saturating_pow(attempt.min(u32::MAX as usize) as u32);
        let delay = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay.as_millis() as u64))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30), Some(10)).with_jitter(0.2)
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let delay = self.raw_delay(attempt);
        if self.jitter <= 0.0 {
            return Some(delay);
        }

        let reduction = rand::thread_rng().gen_range(0.0..=self.jitter);
        Some(delay.mul_f64(1.0 - reduction))
    }

    fn reset(&mut self) {
        // Stateless: the attempt counter lives in the client
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }
}

/// Fixed delay reconnection strategy
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn reset(&mut self) {}

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    fn max_attempts(&self) -> Option<usize> {
        self.max_attempts
    }
}

/// Never reconnect strategy
///
/// The first failure moves the client straight to the terminal error state.
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn reset(&mut self) {}

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }

    fn max_attempts(&self) -> Option<usize> {
        Some(0)
    }
}
