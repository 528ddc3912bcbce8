//! Common test utilities for livesockets integration tests
//!
//! A scriptable mock WebSocket server plus small polling helpers.

#![allow(dead_code)]

use livesockets::{ClientEvent, ConnectionState, RealtimeClient};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch, Notify};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Server behaviour
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Text frames sent to every client right after the handshake
    pub greeting: Vec<String>,
    /// Reply `{"type":"pong"}` to application-level pings
    pub answer_pings: bool,
}

#[derive(Debug, Clone)]
enum ServerAction {
    Push(String),
    Close,
}

/// Mock WebSocket server
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    actions: broadcast::Sender<ServerAction>,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    authorization: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockWsServer {
    /// Silent server: accepts connections and never speaks first
    pub async fn start() -> Self {
        Self::start_with(MockOptions::default()).await
    }

    /// Server that answers heartbeat pings
    pub async fn responsive() -> Self {
        Self::start_with(MockOptions {
            answer_pings: true,
            ..MockOptions::default()
        })
        .await
    }

    pub async fn start_with(options: MockOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let (actions, _) = broadcast::channel(64);
        let connections = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let authorization = Arc::new(Mutex::new(Vec::new()));

        let server = Self {
            addr,
            shutdown: Arc::clone(&shutdown),
            actions: actions.clone(),
            connections: Arc::clone(&connections),
            received: Arc::clone(&received),
            authorization: Arc::clone(&authorization),
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let connection = Connection {
                                    options: options.clone(),
                                    shutdown: Arc::clone(&shutdown),
                                    actions: actions.subscribe(),
                                    connections: Arc::clone(&connections),
                                    received: Arc::clone(&received),
                                    authorization: Arc::clone(&authorization),
                                };
                                tokio::spawn(connection.serve(stream));
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown.notified() => {
                        break;
                    }
                }
            }
        });

        server
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Send a text frame to every open connection
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.actions.send(ServerAction::Push(text.into()));
    }

    /// Close every open connection from the server side
    pub fn drop_connections(&self) {
        let _ = self.actions.send(ServerAction::Close);
    }

    /// Completed WebSocket handshakes so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Text frames received from clients
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// `Authorization` header of each upgrade request
    pub fn authorization_headers(&self) -> Vec<Option<String>> {
        self.authorization.lock().clone()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Connection {
    options: MockOptions,
    shutdown: Arc<Notify>,
    actions: broadcast::Receiver<ServerAction>,
    connections: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    authorization: Arc<Mutex<Vec<Option<String>>>>,
}

impl Connection {
    async fn serve(mut self, stream: tokio::net::TcpStream) {
        use futures::{SinkExt, StreamExt};

        let authorization = Arc::clone(&self.authorization);
        let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            let header = request
                .headers()
                .get("Authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            authorization.lock().push(header);
            Ok(response)
        };

        let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };
        self.connections.fetch_add(1, Ordering::SeqCst);

        let (mut write, mut read) = ws_stream.split();

        for text in &self.options.greeting {
            if write.send(Message::Text(text.clone())).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let is_ping = serde_json::from_str::<serde_json::Value>(&text)
                                .map(|value| value["type"] == "ping")
                                .unwrap_or(false);
                            self.received.lock().push(text);

                            if is_ping && self.options.answer_pings {
                                let pong = Message::Text(r#"{"type":"pong"}"#.to_string());
                                if write.send(pong).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                action = self.actions.recv() => {
                    match action {
                        Ok(ServerAction::Push(text)) => {
                            if write.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Ok(ServerAction::Close) => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = self.shutdown.notified() => {
                    break;
                }
            }
        }
    }
}

/// An address nothing listens on
pub fn unused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

/// Poll `condition` every 10ms until it holds or `within` elapses
pub async fn wait_until<F>(mut condition: F, within: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait for the status signal to report `target`
pub async fn wait_for_state(
    status: &mut watch::Receiver<ConnectionState>,
    target: ConnectionState,
    within: Duration,
) -> bool {
    matches!(
        tokio::time::timeout(within, status.wait_for(|state| *state == target)).await,
        Ok(Ok(_))
    )
}

/// Everything currently queued on the client's event channel
pub fn drain_events(client: &RealtimeClient) -> Vec<ClientEvent> {
    std::iter::from_fn(|| client.try_recv_event()).collect()
}

/// A frame in the server's wire format
pub fn frame(kind: &str, payload: serde_json::Value, event_id: Option<&str>) -> String {
    let mut frame = serde_json::json!({
        "type": kind,
        "payload": payload,
        "timestamp": "2026-05-01T12:00:00Z",
    });
    if let Some(event_id) = event_id {
        frame["eventId"] = serde_json::Value::String(event_id.to_string());
    }
    frame.to_string()
}
