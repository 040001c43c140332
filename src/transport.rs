//! Transport abstraction for the Consensus session hub.
//!
//! The [`Transport`] trait is a bidirectional text message channel: one JSON
//! object per message. The [`Connector`] trait opens a fresh transport for a
//! hub endpoint, which lets a [`SessionConnection`](crate::SessionConnection)
//! re-establish the connection on its own after an unexpected drop.
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use consensus_client::error::SessionError;
//! use consensus_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), SessionError> {
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, SessionError>> {
//!         // None only after a clean close handshake
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), SessionError> {
//!         todo!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn connect(&self, url: &str) -> Result<MyTransport, SessionError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SessionError;

/// A bidirectional text message transport to the hub.
///
/// # Close semantics
///
/// [`recv`](Transport::recv) distinguishes the two ways a connection ends,
/// because only one of them is retried:
///
/// - `None`: the close handshake completed (a clean close). No reconnection.
/// - `Some(Err(_))`: the connection broke or ended without a handshake.
///   Treated as an unexpected drop and retried.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe because it is polled
/// inside `tokio::select!`. Channel-based implementations are naturally
/// cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one JSON text message to the hub.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::TransportSend`] if the message could not be
    /// written, or [`SessionError::TransportClosed`] after [`close`](Transport::close).
    async fn send(&mut self, message: String) -> Result<(), SessionError>;

    /// Receive the next JSON text message from the hub.
    async fn recv(&mut self) -> Option<Result<String, SessionError>>;

    /// Close the connection gracefully. Must be idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Implementations should
    /// still release resources in that case.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Opens transports to a hub endpoint.
///
/// A connector is shared by every connection attempt of one
/// [`SessionConnection`](crate::SessionConnection), including reconnects.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport produced by a successful [`connect`](Connector::connect).
    type Transport: Transport;

    /// Open a connection to `url`.
    ///
    /// # Errors
    ///
    /// Any error means the connection never opened; the caller treats it as an
    /// unexpected drop and schedules a retry.
    async fn connect(&self, url: &str) -> Result<Self::Transport, SessionError>;
}
