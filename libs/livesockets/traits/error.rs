use thiserror::Error;

/// Reasons a frame failed to decode into a [`Message`](crate::codec::Message)
///
/// Decoding fails closed: any of these causes the frame to be dropped.
/// None of them is fatal to the connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Binary frames are not part of the protocol
    #[error("binary frame ({0} bytes) is not a valid message")]
    BinaryFrame(usize),

    /// Frame text is not valid JSON
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    /// Frame is JSON but not an object
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// Object has no string `type` field
    #[error("missing `type` field")]
    MissingType,

    /// `type` is outside the known enumeration
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// Payload does not match the shape of its message type
    #[error("invalid {kind} payload: {reason}")]
    InvalidPayload { kind: String, reason: String },

    /// `timestamp` is present but not RFC 3339
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A correlation field has the wrong JSON type
    #[error("invalid correlation field `{0}`")]
    InvalidCorrelation(&'static str),
}

/// Main error type for livesockets
#[derive(Error, Debug)]
pub enum LiveError {
    /// Frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Socket-level failure (connect, read or write)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// No traffic observed within the heartbeat timeout after a ping
    #[error("Heartbeat timeout: no traffic for {elapsed_ms}ms after ping")]
    HeartbeatTimeout { elapsed_ms: u64 },

    /// A subscriber returned an error or panicked
    #[error("Handler error: {0}")]
    Handler(String),

    /// Reconnection ceiling reached
    #[error("Gave up after {attempts} failed connection attempts")]
    GaveUp { attempts: usize },

    /// Operation requires a connected transport
    #[error("Not connected (state: {0})")]
    NotConnected(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl LiveError {
    /// Whether this error should move the client into `Reconnecting`
    pub fn triggers_reconnect(&self) -> bool {
        matches!(
            self,
            LiveError::Transport(_)
                | LiveError::ConnectionClosed(_)
                | LiveError::HeartbeatTimeout { .. }
                | LiveError::Timeout(_)
        )
    }
}

/// Result type for livesockets operations
pub type Result<T> = std::result::Result<T, LiveError>;
