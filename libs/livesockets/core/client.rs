use crate::codec::{self, Message, MessageType};
use crate::config::ClientConfig;
use crate::connection_state::{AtomicMetrics, ConnectionState, ConnectionStatus};
use crate::heartbeat::Heartbeat;
use crate::inbox::{NotificationInbox, NotificationRecord};
use crate::liveness::LivenessTracker;
use crate::registry::{Subscription, SubscriptionRegistry};
use crate::traits::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{http, Message as TungsteniteMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, TungsteniteMessage>;

/// How long a closing handshake may take before the socket is just dropped
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Internal command messages for client control
#[derive(Debug)]
enum ClientCommand {
    /// Send a message to the WebSocket
    Send(WsMessage),
    /// Drop the transport and start over with a fresh failure counter
    Reconnect,
    /// Manual close, no automatic retry
    Disconnect,
    /// Close and stop the connection task
    Shutdown,
}

/// Lifecycle events from the connection task
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Opening the transport (`attempt` = consecutive failures so far)
    Connecting { attempt: usize },
    /// Connected to the server
    Connected,
    /// Manually closed
    Disconnected,
    /// Waiting `delay` before the next attempt
    Reconnecting { attempt: usize, delay: Duration },
    /// Reconnection ceiling reached; the client is in `Error`
    GaveUp { attempts: usize },
    /// A connection attempt or live connection failed
    Error(String),
}

/// Client metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub decode_errors: u64,
    pub handler_failures: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

/// Real-time messaging client
///
/// One background tokio task owns the socket. It decodes every inbound
/// frame and dispatches it synchronously, in arrival order, to the
/// [`SubscriptionRegistry`]. Everything else talks to that task through a
/// command channel, so the handle itself is cheap to share behind an `Arc`.
///
/// `notification` messages also land in the built-in [`NotificationInbox`].
pub struct RealtimeClient {
    url: String,
    status: Arc<ConnectionStatus>,
    metrics: Arc<AtomicMetrics>,
    registry: SubscriptionRegistry,
    inbox: NotificationInbox,
    _inbox_subscription: Subscription,
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    event_rx: Receiver<ClientEvent>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeClient {
    /// Spawn the connection task
    ///
    /// Called by the builder's `build()`; use [`crate::builder`] to create
    /// a client.
    pub(crate) fn start(config: ClientConfig) -> Self {
        let url = config.url.clone();
        let status = Arc::new(ConnectionStatus::new(ConnectionState::Connecting));
        let metrics = Arc::new(AtomicMetrics::new());
        let registry = config.registry.clone();
        let inbox = config.inbox.clone();
        let inbox_subscription = inbox.attach(&registry);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();

        let task = ConnectionTask {
            config,
            status: Arc::clone(&status),
            metrics: Arc::clone(&metrics),
            events: event_tx,
            commands: command_rx,
        };
        let task_handle = tokio::spawn(task.run());

        Self {
            url,
            status,
            metrics,
            registry,
            inbox,
            _inbox_subscription: inbox_subscription,
            command_tx,
            event_rx,
            task_handle: Mutex::new(Some(task_handle)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current connection state
    #[inline]
    pub fn status(&self) -> ConnectionState {
        self.status.get()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    /// Receiver notified on every state change
    pub fn watch_status(&self) -> watch::Receiver<ConnectionState> {
        self.status.watch()
    }

    /// Register `handler` for messages of `kind`
    ///
    /// Dropping the returned handle unsubscribes.
    pub fn subscribe<H>(&self, kind: MessageType, handler: H) -> Subscription
    where
        H: MessageHandler,
    {
        self.registry.subscribe(kind, handler)
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Drop any live transport and connect again from attempt zero
    ///
    /// Valid from every state, including `Error` and `Disconnected`.
    pub fn reconnect(&self) -> Result<()> {
        self.command(ClientCommand::Reconnect)
    }

    /// Close the connection without retrying
    pub fn disconnect(&self) -> Result<()> {
        self.command(ClientCommand::Disconnect)
    }

    /// Send a message through the WebSocket
    ///
    /// Only accepted while `Connected`.
    pub fn send(&self, message: WsMessage) -> Result<()> {
        let state = self.status.get();
        if state != ConnectionState::Connected {
            return Err(LiveError::NotConnected(state.to_string()));
        }
        self.command(ClientCommand::Send(message))
    }

    /// Undismissed notifications, newest first
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.inbox.notifications()
    }

    pub fn clear_notification(&self, id: &str) -> bool {
        self.inbox.clear_notification(id)
    }

    pub fn clear_all_notifications(&self) -> usize {
        self.inbox.clear_all_notifications()
    }

    pub fn unread_count(&self) -> usize {
        self.inbox.unread_count()
    }

    pub fn inbox(&self) -> &NotificationInbox {
        &self.inbox
    }

    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            decode_errors: self.metrics.decode_errors(),
            handler_failures: self.metrics.handler_failures(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.status.get(),
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Close the connection and wait for the connection task to exit
    ///
    /// Further commands fail with `ChannelSend`.
    pub async fn shutdown(&self) -> Result<()> {
        info!(url = %self.url, "Shutting down realtime client");

        let handle = self.task_handle.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };

        let _ = self.command_tx.send(ClientCommand::Shutdown);
        handle
            .await
            .map_err(|e| LiveError::Transport(format!("connection task failed: {}", e)))?;

        info!("Realtime client shut down");
        Ok(())
    }

    fn command(&self, command: ClientCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| LiveError::ChannelSend(e.to_string()))
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        let _ = self.command_tx.send(ClientCommand::Shutdown);
    }
}

/// How a connection attempt or live session ended
enum SessionEnd {
    Failed(LiveError),
    Restart,
    Disconnect,
    Shutdown,
}

/// What the connection task does next
enum Phase {
    Connect,
    Backoff(LiveError),
    /// `Disconnected` or `Error`: idle until a command arrives
    Parked,
    Exit,
}

/// State owned by the spawned connection task
struct ConnectionTask {
    config: ClientConfig,
    status: Arc<ConnectionStatus>,
    metrics: Arc<AtomicMetrics>,
    events: Sender<ClientEvent>,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
}

impl ConnectionTask {
    async fn run(mut self) {
        let mut failures = 0usize;
        let mut phase = Phase::Connect;

        loop {
            phase = match phase {
                Phase::Connect => match self.session(&mut failures).await {
                    SessionEnd::Failed(err) => Phase::Backoff(err),
                    SessionEnd::Restart => {
                        failures = 0;
                        Phase::Connect
                    }
                    SessionEnd::Disconnect => self.disconnected(),
                    SessionEnd::Shutdown => Phase::Exit,
                },
                Phase::Backoff(err) => self.backoff(&mut failures, err).await,
                Phase::Parked => {
                    let next = self.parked().await;
                    if matches!(next, Phase::Connect) {
                        failures = 0;
                    }
                    next
                }
                Phase::Exit => break,
            };
        }

        if self.status.set(ConnectionState::Disconnected) != ConnectionState::Disconnected {
            self.emit(ClientEvent::Disconnected);
        }
        info!("Connection task exiting");
    }

    fn emit(&self, event: ClientEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn transition(&self, state: ConnectionState) {
        let previous = self.status.set(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    fn disconnected(&self) -> Phase {
        info!(url = %self.config.url, "Disconnected by request");
        self.transition(ConnectionState::Disconnected);
        self.emit(ClientEvent::Disconnected);
        Phase::Parked
    }

    /// Open the transport and drive it until it ends
    async fn session(&mut self, failures: &mut usize) -> SessionEnd {
        self.transition(ConnectionState::Connecting);
        self.emit(ClientEvent::Connecting { attempt: *failures });
        debug!(url = %self.config.url, attempt = *failures, "Opening transport");

        let stream = {
            let connect = open_transport(
                &self.config.url,
                self.config.headers.as_ref(),
                self.config.connect_timeout,
            );
            tokio::pin!(connect);

            loop {
                tokio::select! {
                    result = &mut connect => match result {
                        Ok(stream) => break stream,
                        Err(e) => return SessionEnd::Failed(e),
                    },
                    command = self.commands.recv() => match command {
                        Some(ClientCommand::Send(_)) => {
                            warn!("Dropping outbound message: transport not open");
                        }
                        Some(ClientCommand::Reconnect) => return SessionEnd::Restart,
                        Some(ClientCommand::Disconnect) => return SessionEnd::Disconnect,
                        Some(ClientCommand::Shutdown) | None => return SessionEnd::Shutdown,
                    },
                }
            }
        };

        self.drive(stream, failures).await
    }

    fn enter_connected(&mut self, failures: &mut usize) -> Option<Heartbeat> {
        *failures = 0;
        self.config.reconnect_strategy.reset();
        self.transition(ConnectionState::Connected);
        self.emit(ClientEvent::Connected);
        info!(url = %self.config.url, "Connected");

        self.config
            .heartbeat
            .map(|heartbeat| Heartbeat::spawn(heartbeat.interval))
    }

    /// Main message loop for one open transport
    async fn drive(&mut self, stream: WsStream, failures: &mut usize) -> SessionEnd {
        let (mut write, mut read) = stream.split();

        let heartbeat_config = self.config.heartbeat;
        let liveness = LivenessTracker::new(
            heartbeat_config.map_or(Duration::MAX, |heartbeat| heartbeat.timeout),
        );
        let mut liveness_check = tokio::time::interval(heartbeat_config.map_or(
            Duration::from_secs(1),
            |heartbeat| (heartbeat.timeout / 4).max(Duration::from_millis(10)),
        ));
        liveness_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let handshake_deadline = tokio::time::sleep(self.config.connect_timeout);
        tokio::pin!(handshake_deadline);

        let mut connected = !self.config.require_handshake;
        let mut heartbeat = if connected {
            self.enter_connected(failures)
        } else {
            debug!("Transport open, waiting for connection handshake");
            None
        };

        loop {
            tokio::select! {
                frame = read.next() => {
                    let frame = match frame {
                        Some(Ok(frame)) => frame,
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break SessionEnd::Failed(LiveError::Transport(e.to_string()));
                        }
                        None => {
                            break SessionEnd::Failed(LiveError::ConnectionClosed("stream ended".into()));
                        }
                    };
                    liveness.record_traffic();

                    let frame = match frame {
                        TungsteniteMessage::Text(text) => WsMessage::Text(text),
                        TungsteniteMessage::Binary(data) => WsMessage::Binary(data),
                        TungsteniteMessage::Close(close) => {
                            let reason = close
                                .map(|c| format!("{} {}", c.code, c.reason))
                                .unwrap_or_else(|| "no close frame".into());
                            break SessionEnd::Failed(LiveError::ConnectionClosed(reason));
                        }
                        TungsteniteMessage::Ping(_)
                        | TungsteniteMessage::Pong(_)
                        | TungsteniteMessage::Frame(_) => continue,
                    };

                    if let Some(message) = self.handle_frame(&frame) {
                        if !connected && message.kind() == MessageType::Connection {
                            connected = true;
                            heartbeat = self.enter_connected(failures);
                        }
                    }
                }

                command = self.commands.recv() => match command {
                    Some(ClientCommand::Send(message)) => {
                        if !connected {
                            warn!("Dropping outbound message: handshake not complete");
                            continue;
                        }
                        if let Err(e) = write.send(to_tungstenite(message)).await {
                            break SessionEnd::Failed(LiveError::Transport(e.to_string()));
                        }
                        self.metrics.increment_sent();
                    }
                    Some(ClientCommand::Reconnect) => {
                        info!("Reconnect requested, dropping transport");
                        close_quietly(&mut write).await;
                        break SessionEnd::Restart;
                    }
                    Some(ClientCommand::Disconnect) => {
                        close_quietly(&mut write).await;
                        break SessionEnd::Disconnect;
                    }
                    Some(ClientCommand::Shutdown) | None => {
                        close_quietly(&mut write).await;
                        break SessionEnd::Shutdown;
                    }
                },

                Some(ping) = next_ping(&mut heartbeat) => {
                    if let Err(e) = write.send(to_tungstenite(codec::encode(&ping))).await {
                        break SessionEnd::Failed(LiveError::Transport(format!("failed to send ping: {}", e)));
                    }
                    liveness.record_ping_sent();
                    self.metrics.increment_sent();
                    debug!("Heartbeat ping sent");
                }

                _ = liveness_check.tick(), if heartbeat.is_some() => {
                    if let Some(silence) = liveness.silence_after_ping() {
                        if !liveness.is_healthy() {
                            warn!(silence_ms = silence.as_millis() as u64, "Heartbeat timeout, closing transport");
                            close_quietly(&mut write).await;
                            break SessionEnd::Failed(LiveError::HeartbeatTimeout {
                                elapsed_ms: silence.as_millis() as u64,
                            });
                        }
                    }
                }

                _ = &mut handshake_deadline, if !connected => {
                    warn!("No connection handshake within {:?}", self.config.connect_timeout);
                    close_quietly(&mut write).await;
                    break SessionEnd::Failed(LiveError::Timeout("connection handshake".into()));
                }
            }
        }
    }

    /// Decode and dispatch one frame; undecodable frames are logged and dropped
    fn handle_frame(&self, frame: &WsMessage) -> Option<Message> {
        self.metrics.increment_received();

        let message = match codec::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                self.metrics.increment_decode_errors();
                warn!(error = %e, len = frame.len(), "Dropping undecodable frame");
                return None;
            }
        };

        let report = self.config.registry.dispatch(&message);
        if report.failed > 0 {
            self.metrics.add_handler_failures(report.failed as u64);
        }
        debug!(kind = ?message.kind(), delivered = report.delivered, "Message dispatched");

        Some(message)
    }

    async fn backoff(&mut self, failures: &mut usize, cause: LiveError) -> Phase {
        *failures += 1;
        let attempt = *failures;

        warn!(attempt, error = %cause, "Connection failed");
        self.emit(ClientEvent::Error(cause.to_string()));
        self.transition(ConnectionState::Reconnecting);

        // Ceiling counts failures; the first retry waits the base delay
        let strategy = &self.config.reconnect_strategy;
        let next = if strategy.should_reconnect(attempt) {
            strategy.next_delay(attempt - 1)
        } else {
            None
        };
        let Some(delay) = next else {
            let gave_up = LiveError::GaveUp { attempts: attempt };
            error!(url = %self.config.url, "{}", gave_up);
            self.transition(ConnectionState::Error);
            self.emit(ClientEvent::GaveUp { attempts: attempt });
            return Phase::Parked;
        };

        info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting after delay");
        self.metrics.increment_reconnects();
        self.emit(ClientEvent::Reconnecting { attempt, delay });

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return Phase::Connect,
                command = self.commands.recv() => match command {
                    Some(ClientCommand::Send(_)) => {
                        warn!("Dropping outbound message: reconnecting");
                    }
                    Some(ClientCommand::Reconnect) => {
                        *failures = 0;
                        return Phase::Connect;
                    }
                    Some(ClientCommand::Disconnect) => return self.disconnected(),
                    Some(ClientCommand::Shutdown) | None => return Phase::Exit,
                },
            }
        }
    }

    /// Wait in `Disconnected` or `Error` for a command
    async fn parked(&mut self) -> Phase {
        loop {
            match self.commands.recv().await {
                Some(ClientCommand::Reconnect) => {
                    info!(url = %self.config.url, "Reconnect requested");
                    return Phase::Connect;
                }
                Some(ClientCommand::Disconnect) => {
                    if self.status.get() != ConnectionState::Disconnected {
                        return self.disconnected();
                    }
                }
                Some(ClientCommand::Send(_)) => {
                    warn!(state = %self.status.get(), "Dropping outbound message");
                }
                Some(ClientCommand::Shutdown) | None => return Phase::Exit,
            }
        }
    }
}

async fn next_ping(heartbeat: &mut Option<Heartbeat>) -> Option<codec::ControlFrame> {
    match heartbeat {
        Some(heartbeat) => heartbeat.next().await,
        None => std::future::pending().await,
    }
}

/// Build the upgrade request (with provider headers) and connect within `timeout`
async fn open_transport(
    url: &str,
    headers: Option<&Arc<dyn HeaderProvider>>,
    timeout: Duration,
) -> Result<WsStream> {
    let mut request = url
        .into_client_request()
        .map_err(|e| LiveError::Configuration(format!("invalid URL '{}': {}", url, e)))?;

    if let Some(provider) = headers {
        for (key, value) in provider.get_headers().await {
            match (
                key.parse::<http::header::HeaderName>(),
                value.parse::<http::header::HeaderValue>(),
            ) {
                (Ok(name), Ok(value)) => {
                    request.headers_mut().insert(name, value);
                }
                _ => warn!(header = %key, "Skipping invalid header"),
            }
        }
    }

    match tokio::time::timeout(timeout, connect_async(request)).await {
        Ok(Ok((stream, _response))) => Ok(stream),
        Ok(Err(e)) => Err(LiveError::Transport(e.to_string())),
        Err(_) => Err(LiveError::Timeout(format!("connect after {:?}", timeout))),
    }
}

async fn close_quietly(write: &mut WsSink) {
    if tokio::time::timeout(CLOSE_GRACE, write.close()).await.is_err() {
        debug!("Close handshake timed out, dropping socket");
    }
}

/// Convert WsMessage to tungstenite Message
fn to_tungstenite(message: WsMessage) -> TungsteniteMessage {
    match message {
        WsMessage::Text(text) => TungsteniteMessage::Text(text),
        WsMessage::Binary(data) => TungsteniteMessage::Binary(data),
    }
}
