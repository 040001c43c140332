#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! End-to-end lobby scenarios.
//!
//! Each test wires one or more `SessionConnection`s to a `SessionView` and
//! plays the hub's part by hand through `HubLink`s.

mod common;

use std::time::Duration;

use consensus_client::{
    Phase, SessionCode, SessionConfig, SessionConnection, SessionEvent, SessionView,
};
use tokio::sync::mpsc;

use common::{
    connected_users_json, member_joined_json, member_ready_json, phase_changed_json, ready_map,
    HubLink, MockConnector,
};

/// A member's client: connection, event stream and local view.
struct Member {
    conn: SessionConnection<MockConnector>,
    events: mpsc::Receiver<SessionEvent>,
    view: SessionView,
}

impl Member {
    fn new(connector: &MockConnector, name: &str, host: &str, members: &[&str]) -> Self {
        let code = SessionCode::new("ab12cd");
        let (conn, events) =
            SessionConnection::new(connector.clone(), SessionConfig::new(), code.clone(), name);
        let view = SessionView::new(
            code,
            name,
            Some(host.to_owned()),
            members.iter().map(|m| (*m).to_owned()),
        );
        Self { conn, events, view }
    }

    /// Apply events until `done` holds for the view.
    async fn settle(&mut self, done: impl Fn(&SessionView) -> bool) {
        let result = tokio::time::timeout(Duration::from_secs(30), async {
            while !done(&self.view) {
                let event = self.events.recv().await.expect("event channel closed");
                self.view.apply(&event);
            }
        })
        .await;
        assert!(result.is_ok(), "view never settled: {:?}", self.view);
    }

    /// Apply events until the next event of the given shape has been applied.
    async fn settle_on(&mut self, wanted: impl Fn(&SessionEvent) -> bool) {
        let result = tokio::time::timeout(Duration::from_secs(30), async {
            loop {
                let event = self.events.recv().await.expect("event channel closed");
                self.view.apply(&event);
                if wanted(&event) {
                    break;
                }
            }
        })
        .await;
        assert!(result.is_ok(), "expected event never arrived: {:?}", self.view);
    }
}

fn broadcast(links: &[&HubLink], frame: &str) {
    for link in links {
        link.push(frame);
    }
}

#[tokio::test]
async fn host_and_joiner_reach_voting() {
    let alice_connector = MockConnector::new();
    let bob_connector = MockConnector::new();
    let alice_link = alice_connector.accept_next();
    let bob_link = bob_connector.accept_next();

    // alice hosted "ab12cd"; bob joined through the REST collaborator.
    let mut alice = Member::new(&alice_connector, "alice", "alice", &["alice"]);
    let mut bob = Member::new(&bob_connector, "bob", "alice", &["alice", "bob"]);

    alice.conn.connect();
    alice_link.push(connected_users_json(&["alice"]));
    alice
        .settle_on(|e| matches!(e, SessionEvent::ConnectedUsers { .. }))
        .await;

    bob.conn.connect();
    bob_link.push(connected_users_json(&["alice", "bob"]));
    alice_link.push(member_joined_json("bob", false));

    alice.settle(|v| v.is_member("bob")).await;
    assert_eq!(alice.view.members(), ["alice", "bob"]);
    assert_eq!(
        *alice.view.ready(),
        ready_map(&[("alice", false), ("bob", false)])
    );
    bob.settle_on(|e| matches!(e, SessionEvent::ConnectedUsers { .. }))
        .await;

    // bob asks to be ready; nothing changes locally until the hub echoes.
    assert!(bob.conn.set_ready(true));
    assert!(!bob.view.my_ready());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(
        bob_link.sent_json(),
        vec![serde_json::json!({"type": "set_ready", "ready": true})]
    );

    broadcast(&[&alice_link, &bob_link], &member_ready_json("bob", true));
    alice.settle(|v| v.is_ready("bob")).await;
    bob.settle(SessionView::my_ready).await;
    assert_eq!(
        *alice.view.ready(),
        ready_map(&[("alice", false), ("bob", true)])
    );

    broadcast(
        &[&alice_link, &bob_link],
        &phase_changed_json(Phase::Voting, &[("alice", false), ("bob", false)]),
    );
    alice.settle(|v| v.phase() == Phase::Voting).await;
    bob.settle(|v| v.phase() == Phase::Voting).await;
    for view in [&alice.view, &bob.view] {
        assert_eq!(
            *view.ready(),
            ready_map(&[("alice", false), ("bob", false)])
        );
    }

    assert!(bob.view.confirm_submission());
    assert_eq!(bob.view.phase(), Phase::Submitted);

    alice.conn.disconnect().await;
    bob.conn.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn snapshot_after_reconnect_repairs_missed_departure() {
    let connector = MockConnector::new();
    let first = connector.accept_next();
    let second = connector.accept_next();

    let mut bob = Member::new(&connector, "bob", "alice", &["alice", "bob"]);
    bob.conn.connect();
    first.push(connected_users_json(&["alice", "bob", "carol"]));
    first.push(member_ready_json("alice", true));
    bob.settle(|v| v.is_ready("alice")).await;
    assert_eq!(bob.view.members(), ["alice", "bob", "carol"]);

    // The connection breaks; carol leaves while bob is away and the
    // `member_left` broadcast never reaches him.
    first.drop_unclean();
    bob.settle_on(|e| {
        matches!(
            e,
            SessionEvent::Disconnected {
                will_retry: true,
                ..
            }
        )
    })
    .await;
    assert!(!bob.conn.is_connected());

    bob.settle_on(|e| matches!(e, SessionEvent::Connected))
        .await;
    assert_eq!(connector.attempts(), 2);

    second.push(connected_users_json(&["alice", "bob"]));
    bob.settle_on(|e| matches!(e, SessionEvent::ConnectedUsers { .. }))
        .await;

    assert_eq!(bob.view.members(), ["alice", "bob"]);
    assert_eq!(
        *bob.view.ready(),
        ready_map(&[("alice", true), ("bob", false)])
    );

    bob.conn.disconnect().await;
}
