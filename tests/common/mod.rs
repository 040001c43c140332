#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Consensus client integration tests.
//!
//! Provides a [`MockConnector`] whose connection attempts are answered by the
//! test through [`HubLink`]s, plus helpers for building hub frames.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use consensus_client::protocol::{Phase, ServerMessage};
use consensus_client::{Connector, SessionError, Transport};
use tokio::sync::mpsc;

type Frame = Option<Result<String, SessionError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// Transport whose inbound frames are pushed by a [`HubLink`].
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Frame>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        match self.incoming.recv().await {
            Some(frame) => frame,
            // Link dropped by the test: stay open until shut down.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

/// The hub's side of one accepted connection.
pub struct HubLink {
    tx: mpsc::UnboundedSender<Frame>,
    /// Frames the client sent on this connection.
    pub sent: Arc<StdMutex<Vec<String>>>,
    /// Whether the client closed this connection.
    pub closed: Arc<AtomicBool>,
}

impl HubLink {
    fn pair() -> (HubLink, MockTransport) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = MockTransport {
            incoming: rx,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (HubLink { tx, sent, closed }, transport)
    }

    /// Deliver a text frame to the client.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.tx.send(Some(Ok(text.into())));
    }

    /// Break the connection without a close handshake.
    pub fn drop_unclean(&self) {
        let _ = self
            .tx
            .send(Some(Err(SessionError::TransportReceive("connection reset".into()))));
    }

    /// Complete a close handshake.
    pub fn close_clean(&self) {
        let _ = self.tx.send(None);
    }

    /// Frames the client sent, decoded as JSON values.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }
}

// ── MockConnector ───────────────────────────────────────────────────

enum Answer {
    Accept(MockTransport),
    Refuse,
}

/// Connector that answers attempts in order with prepared outcomes.
///
/// Attempts with no prepared outcome hang until the supervisor gives up on
/// them, which simulates a connection that is still being established.
#[derive(Clone, Default)]
pub struct MockConnector {
    answers: Arc<StdMutex<VecDeque<Answer>>>,
    attempts: Arc<AtomicUsize>,
    urls: Arc<StdMutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare the next attempt to succeed; returns the hub side of it.
    pub fn accept_next(&self) -> HubLink {
        let (link, transport) = HubLink::pair();
        self.answers
            .lock()
            .unwrap()
            .push_back(Answer::Accept(transport));
        link
    }

    /// Prepare the next attempt to fail with a refused connection.
    pub fn refuse_next(&self) {
        self.answers.lock().unwrap().push_back(Answer::Refuse);
    }

    /// Number of connection attempts so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// URLs of every attempt so far.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, url: &str) -> Result<MockTransport, SessionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_owned());
        let answer = self.answers.lock().unwrap().pop_front();
        match answer {
            Some(Answer::Accept(transport)) => Ok(transport),
            Some(Answer::Refuse) => Err(SessionError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            None => std::future::pending().await,
        }
    }
}

// ── JSON helper functions ───────────────────────────────────────────

pub fn member_joined_json(name: &str, host: bool) -> String {
    serde_json::to_string(&ServerMessage::MemberJoined {
        member_name: name.into(),
        host,
    })
    .expect("member_joined_json serialization")
}

pub fn member_left_json(name: &str) -> String {
    serde_json::to_string(&ServerMessage::MemberLeft {
        member_name: name.into(),
    })
    .expect("member_left_json serialization")
}

pub fn member_ready_json(name: &str, ready: bool) -> String {
    serde_json::to_string(&ServerMessage::MemberReady {
        member_name: name.into(),
        ready,
    })
    .expect("member_ready_json serialization")
}

pub fn phase_changed_json(phase: Phase, ready: &[(&str, bool)]) -> String {
    serde_json::to_string(&ServerMessage::PhaseChanged {
        phase,
        ready: ready_map(ready),
    })
    .expect("phase_changed_json serialization")
}

pub fn connected_users_json(members: &[&str]) -> String {
    serde_json::to_string(&ServerMessage::ConnectedUsers {
        members: members.iter().map(|m| (*m).to_owned()).collect(),
    })
    .expect("connected_users_json serialization")
}

pub fn ready_map(entries: &[(&str, bool)]) -> HashMap<String, bool> {
    entries
        .iter()
        .map(|(name, ready)| ((*name).to_owned(), *ready))
        .collect()
}
