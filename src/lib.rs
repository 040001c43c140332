//! # Consensus Client
//!
//! Realtime session synchronization client for the Consensus group
//! decision hub.
//!
//! A Consensus session is identified by a short join code. Members wait in a
//! lobby until everyone is ready, then the hub moves the session into voting.
//! This crate keeps a client in step with the hub:
//!
//! - [`SessionConnection`] owns the hub connection for one (session, member)
//!   pair, delivers typed [`SessionEvent`]s, sends readiness intents, and
//!   reconnects after unexpected drops.
//! - [`SessionView`] is the local membership/readiness/phase view, updated
//!   only from hub events.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn example() {
//! use consensus_client::{
//!     SessionCode, SessionConfig, SessionConnection, SessionView, WebSocketConnector,
//! };
//!
//! let code = SessionCode::new("AB12CD");
//! let (mut conn, mut events) =
//!     SessionConnection::new(WebSocketConnector, SessionConfig::new(), code.clone(), "alice");
//! conn.connect();
//!
//! let mut view = SessionView::new(code, "alice", Some("alice".into()), ["alice".to_string()]);
//! while let Some(event) = events.recv().await {
//!     view.apply(&event);
//!     if view.phase() == consensus_client::Phase::Voting {
//!         break;
//!     }
//! }
//! conn.disconnect().await;
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use connection::{ConnectionState, ConnectionStatus, SessionConfig, SessionConnection};
pub use error::SessionError;
pub use event::{SessionEvent, SessionHandler};
pub use protocol::{ClientMessage, Phase, ServerMessage, SessionCode};
pub use session::{RosterEntry, SessionView};
pub use transport::{Connector, Transport};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
