//! Error types for the Consensus session client.

use thiserror::Error;

/// Errors that can occur inside the Consensus session client.
///
/// None of these are fatal to the caller. Connection-level errors are
/// surfaced through the diagnostic field of
/// [`ConnectionState`](crate::connection::ConnectionState); decoding errors are
/// logged and the offending frame is discarded.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection ended without a close handshake.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An inbound frame carried a `type` tag this client does not know.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// The hub endpoint could not be built from the configured base URL.
    #[error("invalid hub endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// The hub base URL does not use a WebSocket scheme.
    #[error("unsupported hub URL scheme: {0}")]
    UnsupportedScheme(String),

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for session client operations.
pub type Result<T> = std::result::Result<T, SessionError>;
