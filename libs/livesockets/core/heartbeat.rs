//! Heartbeat mechanism
//!
//! ```text
//! ┌─────────────────────┐
//! │  Heartbeat Task     │
//! │  (Tokio spawn)      │
//! │                     │
//! │  Every interval:    │
//! │  1. Wait for tick   │
//! │  2. Emit Ping ──────┼──> mpsc ──> Connection loop ──> encode ──> WebSocket
//! │  3. Repeat          │
//! └─────────────────────┘
//! ```
//!
//! The task is spawned when the client enters `Connected` and stopped when
//! that connection ends, so pings never go out on a dead or pending socket.

use crate::codec::ControlFrame;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Heartbeat timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between pings
    pub interval: Duration,
    /// Maximum silence after a ping before the connection is declared dead
    pub timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Heartbeat task that emits a ping control frame every `interval`
///
/// The first tick is skipped so the first ping goes out one full interval
/// after the connection opened.
pub async fn heartbeat_task(
    interval: Duration,
    heartbeat_tx: mpsc::UnboundedSender<ControlFrame>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    debug!("Heartbeat task started with interval: {:?}", interval);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("Heartbeat task received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                if heartbeat_tx.send(ControlFrame::Ping).is_err() {
                    debug!("Heartbeat channel closed, shutting down heartbeat task");
                    break;
                }
            }
        }
    }

    debug!("Heartbeat task exiting");
}

/// Running heartbeat; stopped on drop
pub struct Heartbeat {
    handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    pub(crate) frames: mpsc::UnboundedReceiver<ControlFrame>,
}

impl Heartbeat {
    pub fn spawn(interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (heartbeat_tx, frames) = mpsc::unbounded_channel();

        let handle = tokio::spawn(heartbeat_task(interval, heartbeat_tx, shutdown_rx));

        Self {
            handle: Some(handle),
            shutdown_tx: Some(shutdown_tx),
            frames,
        }
    }

    /// Wait for the next ping to send
    pub async fn next(&mut self) -> Option<ControlFrame> {
        self.frames.recv().await
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
