//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! [`WebSocketConnector`] opens a [`WebSocketTransport`] for a hub endpoint.
//! Both `ws://` and `wss://` URLs are supported; TLS is handled transparently
//! via [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), consensus_client::SessionError> {
//! use consensus_client::{Transport, WebSocketTransport};
//!
//! let mut transport =
//!     WebSocketTransport::connect("ws://localhost:8080/api/session/ab12cd/ws?name=alice").await?;
//! transport.send(r#"{"type":"set_ready","ready":true}"#.to_string()).await?;
//!
//! if let Some(Ok(msg)) = transport.recv().await {
//!     println!("hub said: {msg}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::SessionError;
use crate::transport::{Connector, Transport};

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// [`Connector`] that opens WebSocket connections with `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &str) -> Result<WebSocketTransport, SessionError> {
        WebSocketTransport::connect(url).await
    }
}

/// A [`Transport`] backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection to the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the URL is invalid or the connection
    /// cannot be established. When the underlying error is an I/O error its
    /// [`ErrorKind`](std::io::ErrorKind) is preserved.
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        tracing::debug!(url = %url, "connecting to hub");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            SessionError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "hub connection established");

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream, e.g. one opened with
    /// custom TLS or proxy settings.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(SessionError::TransportReceive(e.to_string())));
                }
                // End of stream without a close frame is not a clean close,
                // unless we closed it ourselves.
                None if self.closed => return None,
                None => return Some(Err(SessionError::TransportClosed)),
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "hub sent close frame");
                    return None;
                }
                Message::Ping(_) => {
                    // tungstenite queues the pong.
                    tracing::trace!("hub ping");
                }
                Message::Pong(_) => {
                    tracing::trace!("hub pong");
                }
                Message::Binary(_) => {
                    tracing::warn!("unexpected binary frame from hub, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("raw frame from hub, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketConnector.connect("not-a-valid-url").await.unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }

    #[tokio::test]
    async fn connect_fails_with_unreachable_host() {
        let err = WebSocketConnector.connect("ws://127.0.0.1:1").await.unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }

    /// Start a local WebSocket hub that runs `handler` on the accepted
    /// connection and returns the address to connect to.
    async fn start_mock_hub<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn recv_receives_text_messages() {
        let url = start_mock_hub(|mut ws| async move {
            ws.send(Message::Text(
                r#"{"type":"connected_users","members":["alice"]}"#.into(),
            ))
            .await
            .unwrap();
            ws.send(Message::Text(r#"{"type":"member_left","memberName":"bob"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector.connect(&url).await.unwrap();

        let first = transport.recv().await.unwrap().unwrap();
        assert!(first.contains("connected_users"));
        let second = transport.recv().await.unwrap().unwrap();
        assert!(second.contains("member_left"));
    }

    #[tokio::test]
    async fn recv_returns_none_on_close_frame() {
        let url = start_mock_hub(|mut ws| async move {
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector.connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_reports_error_when_hub_vanishes() {
        let url = start_mock_hub(|ws| async move {
            // Drop the socket without a close handshake.
            drop(ws);
        })
        .await;

        let mut transport = WebSocketConnector.connect(&url).await.unwrap();
        assert!(matches!(transport.recv().await, Some(Err(_))));
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_hub(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text("after_binary".into())).await.unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector.connect(&url).await.unwrap();
        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, "after_binary");
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url =
            start_mock_hub(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketConnector.connect(&url).await.unwrap();
        transport.close().await.unwrap();

        let err = transport
            .send(r#"{"type":"set_ready","ready":true}"#.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::TransportClosed));
    }

    #[tokio::test]
    async fn double_close_is_idempotent() {
        let url =
            start_mock_hub(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketConnector.connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn hub_receives_set_ready_frame() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel::<String>();
        let url = start_mock_hub(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = seen_tx.send(text.to_string());
            }
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector.connect(&url).await.unwrap();
        transport
            .send(r#"{"type":"set_ready","ready":true}"#.to_string())
            .await
            .unwrap();

        assert_eq!(seen_rx.await.unwrap(), r#"{"type":"set_ready","ready":true}"#);
    }
}
