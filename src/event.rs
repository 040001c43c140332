//! Events delivered by a [`SessionConnection`](crate::SessionConnection).
//!
//! Hub messages arrive as [`SessionEvent`]s on the event channel, interleaved
//! with the synthetic [`Connected`](SessionEvent::Connected) and
//! [`Disconnected`](SessionEvent::Disconnected) lifecycle events. Consumers
//! either `match` on the event directly or route it into a
//! [`SessionHandler`] with [`SessionEvent::dispatch`].

use std::collections::HashMap;

use crate::protocol::{Phase, ServerMessage};

/// An event observed on a session connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A connection to the hub was established (first connect or reconnect).
    Connected,
    /// The connection ended.
    ///
    /// `will_retry` is `true` when the drop was unexpected and a reconnection
    /// attempt has been scheduled.
    Disconnected {
        reason: Option<String>,
        will_retry: bool,
    },
    /// A member connected to the session.
    MemberJoined { member_name: String, host: bool },
    /// A member left the session.
    MemberLeft { member_name: String },
    /// A member's readiness changed.
    MemberReady { member_name: String, ready: bool },
    /// The session entered `phase`; `ready` is the full readiness snapshot.
    PhaseChanged {
        phase: Phase,
        ready: HashMap<String, bool>,
    },
    /// Authoritative membership snapshot.
    ConnectedUsers { members: Vec<String> },
}

impl From<ServerMessage> for SessionEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::MemberJoined { member_name, host } => {
                Self::MemberJoined { member_name, host }
            }
            ServerMessage::MemberLeft { member_name } => Self::MemberLeft { member_name },
            ServerMessage::MemberReady { member_name, ready } => {
                Self::MemberReady { member_name, ready }
            }
            ServerMessage::PhaseChanged { phase, ready } => Self::PhaseChanged { phase, ready },
            ServerMessage::ConnectedUsers { members } => Self::ConnectedUsers { members },
        }
    }
}

impl SessionEvent {
    /// Route this event to the matching slot of `handler`.
    pub fn dispatch<H: SessionHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            Self::Connected => handler.on_connected(),
            Self::Disconnected { reason, will_retry } => {
                handler.on_disconnected(reason.as_deref(), *will_retry);
            }
            Self::MemberJoined { member_name, host } => handler.on_member_joined(member_name, *host),
            Self::MemberLeft { member_name } => handler.on_member_left(member_name),
            Self::MemberReady { member_name, ready } => {
                handler.on_member_ready(member_name, *ready);
            }
            Self::PhaseChanged { phase, ready } => handler.on_phase_changed(*phase, ready),
            Self::ConnectedUsers { members } => handler.on_connected_users(members),
        }
    }
}

/// Fixed set of optional handler slots, one per event kind.
///
/// Every method defaults to a no-op, so implementors override only the slots
/// they care about.
pub trait SessionHandler {
    fn on_connected(&mut self) {}

    fn on_disconnected(&mut self, _reason: Option<&str>, _will_retry: bool) {}

    fn on_member_joined(&mut self, _member_name: &str, _host: bool) {}

    fn on_member_left(&mut self, _member_name: &str) {}

    fn on_member_ready(&mut self, _member_name: &str, _ready: bool) {}

    fn on_phase_changed(&mut self, _phase: Phase, _ready: &HashMap<String, bool>) {}

    fn on_connected_users(&mut self, _members: &[String]) {}
}

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

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl SessionHandler for Recorder {
        fn on_member_left(&mut self, member_name: &str) {
            self.calls.push(format!("left:{member_name}"));
        }

        fn on_connected_users(&mut self, members: &[String]) {
            self.calls.push(format!("users:{}", members.join(",")));
        }
    }

    #[test]
    fn dispatch_reaches_overridden_slots_only() {
        let mut recorder = Recorder::default();
        SessionEvent::Connected.dispatch(&mut recorder);
        SessionEvent::MemberLeft {
            member_name: "carol".into(),
        }
        .dispatch(&mut recorder);
        SessionEvent::MemberReady {
            member_name: "bob".into(),
            ready: true,
        }
        .dispatch(&mut recorder);
        SessionEvent::ConnectedUsers {
            members: vec!["alice".into(), "bob".into()],
        }
        .dispatch(&mut recorder);

        assert_eq!(recorder.calls, vec!["left:carol", "users:alice,bob"]);
    }

    #[test]
    fn server_message_converts_to_event() {
        let event = SessionEvent::from(ServerMessage::MemberJoined {
            member_name: "bob".into(),
            host: false,
        });
        assert_eq!(
            event,
            SessionEvent::MemberJoined {
                member_name: "bob".into(),
                host: false
            }
        );
    }
}
