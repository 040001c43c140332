//! Connection manager for one (session code, member) pair.
//!
//! [`SessionConnection`] is a handle that owns a background supervisor task.
//! The supervisor opens the hub connection through a [`Connector`], pumps
//! inbound frames onto a bounded event channel, forwards outbound intents from
//! an unbounded command channel, and re-opens the connection after an
//! unexpected drop. Connectivity is published on a [`watch`] channel.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = SessionConfig::new().with_hub_url("wss://consensus.example.com/api");
//! let (mut conn, mut events) =
//!     SessionConnection::new(WebSocketConnector, config, SessionCode::new("AB12CD"), "alice");
//! conn.connect();
//!
//! let mut view = SessionView::new(conn.session_code().clone(), "alice", None, []);
//! while let Some(event) = events.recv().await {
//!     view.apply(&event);
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SessionError};
use crate::event::SessionEvent;
use crate::protocol::{decode_server_message, hub_endpoint, ClientMessage, SessionCode};
use crate::transport::{Connector, Transport};

/// Default hub base URL.
const DEFAULT_HUB_URL: &str = "ws://localhost:8080/api";

/// Default delay between an unexpected drop and the next connection attempt.
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default limit on how long a single connection attempt may take.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`SessionConnection`].
///
/// # Example
///
/// ```
/// use consensus_client::connection::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::new()
///     .with_hub_url("wss://consensus.example.com/api")
///     .with_reconnect_delay(Duration::from_millis(500));
/// assert_eq!(config.event_channel_capacity, 256);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the hub; `/session/{code}/ws` is appended to it.
    pub hub_url: String,
    /// Fixed delay before re-opening the connection after an unexpected drop.
    ///
    /// Defaults to **2 seconds**. There is no backoff and no attempt limit.
    pub reconnect_delay: Duration,
    /// Capacity of the bounded event channel.
    ///
    /// Hub events are never dropped: when the consumer falls behind, the
    /// supervisor stops reading from the hub until there is room.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// How long [`SessionConnection::disconnect`] waits for the supervisor to
    /// close the transport before aborting it.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Limit on a single connection attempt. An attempt that times out counts
    /// as an unexpected drop. `None` waits indefinitely.
    ///
    /// Defaults to **10 seconds**.
    pub connect_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }

    /// Set the hub base URL (`ws://` or `wss://`).
    #[must_use]
    pub fn with_hub_url(mut self, hub_url: impl Into<String>) -> Self {
        self.hub_url = hub_url.into();
        self
    }

    /// Set the fixed reconnection delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the capacity of the bounded event channel. Values below 1 are
    /// clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set (or remove, with `None`) the per-attempt connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Connection state ────────────────────────────────────────────────

/// Connectivity of a [`SessionConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No connection and no attempt in progress.
    #[default]
    Disconnected,
    /// An attempt is in flight or a reconnection is about to start.
    Connecting,
    /// The hub connection is open.
    Connected,
}

/// Snapshot published on the connection's [`watch`] channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionState {
    /// Current connectivity.
    pub status: ConnectionStatus,
    /// Most recent connection problem. Cleared when a connection opens.
    pub last_error: Option<String>,
}

impl ConnectionState {
    /// Returns `true` while the hub connection is open.
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

/// State shared between the handle and its supervisor.
struct Shared {
    state_tx: watch::Sender<ConnectionState>,
    /// Cleared by an intentional disconnect; a drop is only retried while set.
    reconnect: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::default());
        Self {
            state_tx,
            reconnect: AtomicBool::new(false),
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.state_tx.send_if_modified(|state| {
            let changed = state.status != status;
            state.status = status;
            changed
        });
    }

    fn set_connected(&self) {
        self.state_tx.send_modify(|state| {
            state.status = ConnectionStatus::Connected;
            state.last_error = None;
        });
    }

    fn record_error(&self, message: String) {
        self.state_tx
            .send_modify(|state| state.last_error = Some(message));
    }

    fn should_reconnect(&self) -> bool {
        self.reconnect.load(Ordering::Acquire)
    }
}

// ── Connection handle ───────────────────────────────────────────────

/// Connection manager for exactly one (session code, member) pair.
///
/// At most one supervisor task, and therefore at most one live transport,
/// exists per handle. Dropping the handle aborts the supervisor.
pub struct SessionConnection<C: Connector> {
    connector: Arc<C>,
    config: SessionConfig,
    session_code: SessionCode,
    member_name: String,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<SessionEvent>,
    /// Sender half of the command channel to the live supervisor.
    cmd_tx: Option<mpsc::UnboundedSender<ClientMessage>>,
    /// Handle to the live supervisor task.
    task: Option<JoinHandle<()>>,
    /// Oneshot sender to stop the live supervisor gracefully.
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl<C: Connector> SessionConnection<C> {
    /// Create a disconnected handle and the receiver for its events.
    ///
    /// The receiver stays valid across reconnects and yields `None` once the
    /// handle is dropped and the supervisor has exited.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn new(
        connector: C,
        config: SessionConfig,
        session_code: SessionCode,
        member_name: impl Into<String>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let conn = Self {
            connector: Arc::new(connector),
            config,
            session_code,
            member_name: member_name.into(),
            shared: Arc::new(Shared::new()),
            event_tx,
            cmd_tx: None,
            task: None,
            shutdown_tx: None,
        };
        (conn, event_rx)
    }

    /// Start connecting to the hub.
    ///
    /// Returns immediately; progress is observable through the state channel
    /// and the [`Connected`](SessionEvent::Connected) event. Does nothing if
    /// the session code or member name is empty, or if a supervisor is
    /// already connecting, connected or waiting to retry. Must be called from
    /// within a Tokio runtime.
    ///
    /// If the hub endpoint cannot be built, the problem is recorded in
    /// [`last_error`](ConnectionState::last_error) and no retry is scheduled.
    pub fn connect(&mut self) {
        if self.session_code.is_empty() || self.member_name.is_empty() {
            debug!("connect skipped: session code or member name missing");
            return;
        }
        if self.task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!(session = %self.session_code, "connect skipped: supervisor already running");
            return;
        }

        let url = match hub_endpoint(&self.config.hub_url, &self.session_code, &self.member_name)
        {
            Ok(url) => url,
            Err(e) => {
                error!(session = %self.session_code, "failed to build hub endpoint: {e}");
                self.shared.state_tx.send_modify(|state| {
                    state.status = ConnectionStatus::Disconnected;
                    state.last_error = Some(format!("failed to create connection: {e}"));
                });
                return;
            }
        };

        self.shared.reconnect.store(true, Ordering::Release);
        self.shared.set_status(ConnectionStatus::Connecting);

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let supervisor = Supervisor {
            connector: Arc::clone(&self.connector),
            url: url.as_str().to_owned(),
            reconnect_delay: self.config.reconnect_delay,
            connect_timeout: self.config.connect_timeout,
            shared: Arc::clone(&self.shared),
            event_tx: self.event_tx.clone(),
            cmd_rx,
            shutdown_rx,
        };

        info!(session = %self.session_code, member = %self.member_name, "connecting to hub");
        self.task = Some(tokio::spawn(supervisor.run()));
        self.cmd_tx = Some(cmd_tx);
        self.shutdown_tx = Some(shutdown_tx);
    }

    /// Permanently end connectivity for this session.
    ///
    /// Cancels a pending reconnection, stops a connection attempt in flight,
    /// and closes the live transport. Safe to call any number of times; a
    /// later [`connect`](Self::connect) starts afresh.
    pub async fn disconnect(&mut self) {
        debug!(session = %self.session_code, "disconnect requested");
        self.shared.reconnect.store(false, Ordering::Release);

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.cmd_tx = None;

        // Await the supervisor with a timeout; abort it if it does not exit
        // in time so it cannot outlive the disconnect.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("supervisor terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("supervisor did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("supervisor aborted: {join_err}");
                    }
                }
            }
        }

        self.shared.set_status(ConnectionStatus::Disconnected);
    }

    /// Ask the hub to set the local member's readiness.
    ///
    /// Best effort: returns `false` and sends nothing while not connected.
    /// The readiness shown locally only changes when the hub echoes a
    /// `member_ready` event.
    pub fn set_ready(&self, ready: bool) -> bool {
        if !self.is_connected() {
            debug!(ready, "set_ready dropped while not connected");
            return false;
        }
        self.send(ClientMessage::SetReady { ready })
    }

    // ── State accessors ─────────────────────────────────────────────

    pub fn session_code(&self) -> &SessionCode {
        &self.session_code
    }

    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    /// Current connectivity snapshot.
    pub fn state(&self) -> ConnectionState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.state_tx.borrow().status
    }

    /// Returns `true` while a hub connection is open.
    pub fn is_connected(&self) -> bool {
        self.shared.state_tx.borrow().is_connected()
    }

    /// Most recent connection problem, if any.
    pub fn last_error(&self) -> Option<String> {
        self.shared.state_tx.borrow().last_error.clone()
    }

    /// Subscribe to connectivity changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn send(&self, msg: ClientMessage) -> bool {
        match &self.cmd_tx {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }
}

impl<C: Connector> std::fmt::Debug for SessionConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConnection")
            .field("session_code", &self.session_code)
            .field("member_name", &self.member_name)
            .field("state", &self.state())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl<C: Connector> Drop for SessionConnection<C> {
    fn drop(&mut self) {
        // No executor context to await a graceful close here; abort instead.
        self.shared.reconnect.store(false, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.shared.set_status(ConnectionStatus::Disconnected);
    }
}

// ── Supervisor ──────────────────────────────────────────────────────

/// How one connection ended.
enum Closure {
    /// The hub completed a close handshake.
    Clean,
    /// The connection broke or never opened.
    Dropped(String),
    /// The handle asked us to stop.
    Shutdown,
}

/// Background task owning the live transport and the retry timer.
struct Supervisor<C: Connector> {
    connector: Arc<C>,
    url: String,
    reconnect_delay: Duration,
    connect_timeout: Option<Duration>,
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<SessionEvent>,
    cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl<C: Connector> Supervisor<C> {
    /// Connect, pump, and reconnect after unexpected drops.
    ///
    /// Exits on a clean close, on shutdown, or when a drop happens after the
    /// reconnect intent was cleared.
    async fn run(mut self) {
        debug!(url = %self.url, "supervisor started");

        loop {
            self.shared.set_status(ConnectionStatus::Connecting);

            let opened = tokio::select! {
                _ = &mut self.shutdown_rx => None,
                opened = open_transport(&*self.connector, &self.url, self.connect_timeout) => Some(opened),
            };

            let closure = match opened {
                None => Closure::Shutdown,
                Some(Ok(transport)) => {
                    self.shared.set_connected();
                    info!(url = %self.url, "connected to hub");
                    emit(&self.event_tx, SessionEvent::Connected).await;
                    self.pump(transport).await
                }
                Some(Err(e)) => {
                    warn!(url = %self.url, "hub connection failed: {e}");
                    self.shared.record_error(format!("connection error: {e}"));
                    Closure::Dropped(e.to_string())
                }
            };

            self.shared.set_status(ConnectionStatus::Disconnected);

            match closure {
                Closure::Shutdown => {
                    emit(
                        &self.event_tx,
                        SessionEvent::Disconnected {
                            reason: Some("client disconnected".into()),
                            will_retry: false,
                        },
                    )
                    .await;
                    break;
                }
                Closure::Clean => {
                    info!(url = %self.url, "hub closed the connection");
                    emit(
                        &self.event_tx,
                        SessionEvent::Disconnected {
                            reason: None,
                            will_retry: false,
                        },
                    )
                    .await;
                    break;
                }
                Closure::Dropped(reason) => {
                    let will_retry = self.shared.should_reconnect();
                    emit(
                        &self.event_tx,
                        SessionEvent::Disconnected {
                            reason: Some(reason),
                            will_retry,
                        },
                    )
                    .await;
                    if !will_retry {
                        break;
                    }

                    self.discard_pending_commands();
                    debug!(delay = ?self.reconnect_delay, "scheduling reconnection");
                    tokio::select! {
                        _ = &mut self.shutdown_rx => break,
                        () = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                    if !self.shared.should_reconnect() {
                        break;
                    }
                    info!(url = %self.url, "reconnecting to hub");
                }
            }
        }

        debug!(url = %self.url, "supervisor exited");
    }

    /// Multiplex outbound intents and inbound frames over one transport until
    /// it closes.
    async fn pump(&mut self, mut transport: C::Transport) -> Closure {
        loop {
            tokio::select! {
                _ = &mut self.shutdown_rx => {
                    if let Err(e) = transport.close().await {
                        debug!("close handshake failed: {e}");
                    }
                    return Closure::Shutdown;
                }

                cmd = self.cmd_rx.recv() => {
                    let Some(msg) = cmd else {
                        // Handle released the command channel.
                        let _ = transport.close().await;
                        return Closure::Shutdown;
                    };
                    match serde_json::to_string(&msg) {
                        Ok(json) => {
                            if let Err(e) = transport.send(json).await {
                                error!("hub send error: {e}");
                                self.shared.record_error(format!("send error: {e}"));
                                return Closure::Dropped(e.to_string());
                            }
                        }
                        Err(e) => error!("failed to serialize client message: {e}"),
                    }
                }

                incoming = transport.recv() => {
                    match incoming {
                        Some(Ok(text)) => deliver(&self.event_tx, &text).await,
                        Some(Err(e)) => {
                            warn!("hub connection dropped: {e}");
                            self.shared.record_error(format!("connection error: {e}"));
                            return Closure::Dropped(e.to_string());
                        }
                        None => return Closure::Clean,
                    }
                }
            }
        }
    }

    /// Intents queued for a connection that has since dropped are not
    /// replayed on the next one.
    fn discard_pending_commands(&mut self) {
        while let Ok(msg) = self.cmd_rx.try_recv() {
            debug!(?msg, "discarding intent queued before the drop");
        }
    }
}

async fn open_transport<C: Connector>(
    connector: &C,
    url: &str,
    timeout: Option<Duration>,
) -> Result<C::Transport> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, connector.connect(url))
            .await
            .map_err(|_| SessionError::Timeout)?,
        None => connector.connect(url).await,
    }
}

/// Decode one inbound frame and forward it. Malformed frames and unknown
/// message types are logged and discarded.
async fn deliver(event_tx: &mpsc::Sender<SessionEvent>, text: &str) {
    match decode_server_message(text) {
        Ok(msg) => emit(event_tx, SessionEvent::from(msg)).await,
        Err(SessionError::UnknownMessageType(kind)) => {
            warn!(kind = %kind, "ignoring unknown hub message type");
        }
        Err(e) => {
            warn!(len = text.len(), "discarding malformed hub message: {e}");
            debug!(raw = %truncate_frame(text), "malformed hub message");
        }
    }
}

/// Longest prefix of a raw frame that is written to the logs.
const LOGGED_FRAME_PREFIX: usize = 256;

/// Cut `text` to at most [`LOGGED_FRAME_PREFIX`] bytes on a char boundary.
fn truncate_frame(text: &str) -> &str {
    if text.len() <= LOGGED_FRAME_PREFIX {
        return text;
    }
    let mut end = LOGGED_FRAME_PREFIX;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.get(..end).unwrap_or_default()
}

/// Forward an event, waiting for room in the channel.
async fn emit(event_tx: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
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
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Replays scripted frames, then hangs until shut down.
    struct MockTransport {
        incoming: VecDeque<Option<Result<String>>>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> Result<()> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            if let Some(item) = self.incoming.pop_front() {
                item
            } else {
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    /// Hands out one scripted transport per attempt and counts attempts.
    struct MockConnector {
        scripts: StdMutex<VecDeque<Vec<Option<Result<String>>>>>,
        attempts: Arc<AtomicUsize>,
        sent: Arc<StdMutex<Vec<String>>>,
    }

    impl MockConnector {
        fn new(scripts: Vec<Vec<Option<Result<String>>>>) -> Self {
            Self {
                scripts: StdMutex::new(VecDeque::from(scripts)),
                attempts: Arc::new(AtomicUsize::new(0)),
                sent: Arc::new(StdMutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Transport = MockTransport;

        async fn connect(&self, _url: &str) -> Result<MockTransport> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let script = self.scripts.lock().unwrap().pop_front();
            match script {
                Some(incoming) => Ok(MockTransport {
                    incoming: VecDeque::from(incoming),
                    sent: Arc::clone(&self.sent),
                }),
                None => std::future::pending().await,
            }
        }
    }

    fn users_json(members: &[&str]) -> String {
        serde_json::json!({ "type": "connected_users", "members": members }).to_string()
    }

    #[test]
    fn config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.hub_url, "ws://localhost:8080/api");
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn config_clamps_channel_capacity() {
        let config = SessionConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[tokio::test]
    async fn connect_without_member_name_is_noop() {
        let connector = MockConnector::new(vec![]);
        let attempts = Arc::clone(&connector.attempts);
        let (mut conn, _events) =
            SessionConnection::new(connector, SessionConfig::new(), SessionCode::new("ab12cd"), "");

        conn.connect();
        tokio::task::yield_now().await;

        assert_eq!(conn.status(), ConnectionStatus::Disconnected);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connect_without_session_code_is_noop() {
        let connector = MockConnector::new(vec![]);
        let attempts = Arc::clone(&connector.attempts);
        let (mut conn, _events) =
            SessionConnection::new(connector, SessionConfig::new(), SessionCode::new(" "), "bob");

        conn.connect();
        tokio::task::yield_now().await;

        assert_eq!(conn.status(), ConnectionStatus::Disconnected);
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_hub_url_records_error_without_retry() {
        let connector = MockConnector::new(vec![]);
        let attempts = Arc::clone(&connector.attempts);
        let config = SessionConfig::new().with_hub_url("https://not-a-websocket");
        let (mut conn, _events) =
            SessionConnection::new(connector, config, SessionCode::new("ab12cd"), "bob");

        conn.connect();
        tokio::task::yield_now().await;

        assert_eq!(conn.status(), ConnectionStatus::Disconnected);
        assert!(conn
            .last_error()
            .unwrap()
            .starts_with("failed to create connection"));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn set_ready_while_disconnected_is_dropped() {
        let connector = MockConnector::new(vec![]);
        let sent = Arc::clone(&connector.sent);
        let (conn, _events) = SessionConnection::new(
            connector,
            SessionConfig::new(),
            SessionCode::new("ab12cd"),
            "bob",
        );

        assert!(!conn.set_ready(true));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connected_user_snapshot_is_forwarded() {
        let connector = MockConnector::new(vec![vec![Some(Ok(users_json(&["alice", "bob"])))]]);
        let (mut conn, mut events) = SessionConnection::new(
            connector,
            SessionConfig::new(),
            SessionCode::new("ab12cd"),
            "bob",
        );
        conn.connect();

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
        assert!(conn.is_connected());
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::ConnectedUsers {
                members: vec!["alice".into(), "bob".into()]
            }
        );

        conn.disconnect().await;
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn set_ready_reaches_transport_when_connected() {
        let connector = MockConnector::new(vec![vec![]]);
        let sent = Arc::clone(&connector.sent);
        let (mut conn, mut events) = SessionConnection::new(
            connector,
            SessionConfig::new(),
            SessionCode::new("ab12cd"),
            "bob",
        );
        conn.connect();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);

        assert!(conn.set_ready(true));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            sent.lock().unwrap().as_slice(),
            [r#"{"type":"set_ready","ready":true}"#]
        );

        conn.disconnect().await;
    }

    #[tokio::test]
    async fn clean_close_does_not_retry() {
        let connector = MockConnector::new(vec![vec![None], vec![]]);
        let attempts = Arc::clone(&connector.attempts);
        let config = SessionConfig::new().with_reconnect_delay(Duration::from_millis(10));
        let (mut conn, mut events) =
            SessionConnection::new(connector, config, SessionCode::new("ab12cd"), "bob");
        conn.connect();

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::Disconnected {
                reason: None,
                will_retry: false
            }
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(conn.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let connector = MockConnector::new(vec![vec![]]);
        let (mut conn, mut events) = SessionConnection::new(
            connector,
            SessionConfig::new(),
            SessionCode::new("ab12cd"),
            "bob",
        );
        conn.connect();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);

        conn.disconnect().await;
        conn.disconnect().await;
        assert_eq!(conn.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn logged_frames_are_cut_on_a_char_boundary() {
        let short = "{\"type\":\"member_ready\"}";
        assert_eq!(truncate_frame(short), short);

        let long = format!("a{}", "é".repeat(400));
        let cut = truncate_frame(&long);
        assert!(cut.len() <= LOGGED_FRAME_PREFIX);
        assert!(cut.len() >= LOGGED_FRAME_PREFIX - 1);
        assert!(long.starts_with(cut));
    }
}
