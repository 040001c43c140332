//! Client-local view of a session, reconciled from hub events.
//!
//! [`SessionView`] is the single owner of membership, readiness and phase.
//! It changes only through [`SessionView::apply`] (or the equivalent
//! [`SessionHandler`] slots) and the local
//! [`confirm_submission`](SessionView::confirm_submission) affordance. Every
//! rule is idempotent so that replays and reconnect snapshots converge on the
//! same view.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::event::{SessionEvent, SessionHandler};
use crate::protocol::{Phase, SessionCode};

/// One line of the lobby roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RosterEntry<'a> {
    pub name: &'a str,
    pub ready: bool,
    pub host: bool,
    pub me: bool,
}

/// The canonical in-memory view of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    code: SessionCode,
    me: String,
    host: Option<String>,
    members: Vec<String>,
    ready: HashMap<String, bool>,
    phase: Phase,
}

impl SessionView {
    /// Bootstrap a view from the session state returned when hosting or
    /// joining. Every member starts not ready and the phase is lobby.
    pub fn new(
        code: SessionCode,
        me: impl Into<String>,
        host: Option<String>,
        members: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut view = Self {
            code,
            me: me.into(),
            host,
            members: Vec::new(),
            ready: HashMap::new(),
            phase: Phase::Lobby,
        };
        for name in members {
            view.add_member(&name);
        }
        view
    }

    /// Apply one hub event. Lifecycle events leave the view untouched.
    pub fn apply(&mut self, event: &SessionEvent) {
        event.dispatch(self);
    }

    /// Advance `voting → submitted` after the local member confirmed their
    /// choices. Returns `false` (and changes nothing) from any other phase.
    pub fn confirm_submission(&mut self) -> bool {
        if self.phase != Phase::Voting {
            debug!(phase = %self.phase, "submission confirmed outside voting, ignoring");
            return false;
        }
        self.phase = Phase::Submitted;
        true
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// The local member's identity.
    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Members in the order they were first seen.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn ready(&self) -> &HashMap<String, bool> {
        &self.ready
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Readiness of `name`; unknown members are not ready.
    pub fn is_ready(&self, name: &str) -> bool {
        self.ready.get(name).copied().unwrap_or(false)
    }

    /// Readiness of the local member.
    pub fn my_ready(&self) -> bool {
        self.is_ready(&self.me)
    }

    pub fn ready_count(&self) -> usize {
        self.members.iter().filter(|m| self.is_ready(m)).count()
    }

    /// `true` when the session has members and every one of them is ready,
    /// which is the condition under which the hub opens voting.
    pub fn all_ready(&self) -> bool {
        !self.members.is_empty() && self.members.iter().all(|m| self.is_ready(m))
    }

    pub fn is_host(&self, name: &str) -> bool {
        self.host.as_deref() == Some(name)
    }

    pub fn is_me(&self, name: &str) -> bool {
        self.me == name
    }

    pub fn is_member(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    /// Members with their readiness and role flags, in display order.
    pub fn roster(&self) -> Vec<RosterEntry<'_>> {
        self.members
            .iter()
            .map(|name| RosterEntry {
                name,
                ready: self.is_ready(name),
                host: self.is_host(name),
                me: self.is_me(name),
            })
            .collect()
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn add_member(&mut self, name: &str) {
        if !self.is_member(name) {
            self.members.push(name.to_owned());
        }
        self.ready.entry(name.to_owned()).or_insert(false);
    }
}

impl SessionHandler for SessionView {
    fn on_member_joined(&mut self, member_name: &str, host: bool) {
        self.add_member(member_name);
        if host {
            self.host = Some(member_name.to_owned());
        }
    }

    fn on_member_left(&mut self, member_name: &str) {
        self.members.retain(|m| m != member_name);
        self.ready.remove(member_name);
    }

    fn on_member_ready(&mut self, member_name: &str, ready: bool) {
        if !self.is_member(member_name) {
            debug!(member = member_name, "readiness for non-member ignored");
            return;
        }
        self.ready.insert(member_name.to_owned(), ready);
    }

    fn on_phase_changed(&mut self, phase: Phase, ready: &HashMap<String, bool>) {
        if phase < self.phase {
            warn!(current = %self.phase, requested = %phase, "ignoring backwards phase change");
            return;
        }
        self.phase = phase;
        self.ready = ready.clone();
    }

    fn on_connected_users(&mut self, members: &[String]) {
        let mut ready = HashMap::with_capacity(members.len());
        let mut next = Vec::with_capacity(members.len());
        for name in members {
            if ready.contains_key(name) {
                continue;
            }
            ready.insert(name.clone(), self.is_ready(name));
            next.push(name.clone());
        }
        self.members = next;
        self.ready = ready;
    }
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

    fn lobby(members: &[&str]) -> SessionView {
        SessionView::new(
            SessionCode::new("ab12cd"),
            "alice",
            Some("alice".into()),
            members.iter().map(|m| (*m).to_owned()),
        )
    }

    #[test]
    fn new_view_starts_in_lobby_with_nobody_ready() {
        let view = lobby(&["alice", "bob", "alice"]);
        assert_eq!(view.phase(), Phase::Lobby);
        assert_eq!(view.members(), ["alice", "bob"]);
        assert_eq!(view.ready().len(), 2);
        assert_eq!(view.ready_count(), 0);
        assert!(!view.all_ready());
    }

    #[test]
    fn confirm_submission_only_from_voting() {
        let mut view = lobby(&["alice"]);
        assert!(!view.confirm_submission());
        assert_eq!(view.phase(), Phase::Lobby);

        view.on_phase_changed(Phase::Voting, &HashMap::new());
        assert!(view.confirm_submission());
        assert_eq!(view.phase(), Phase::Submitted);
        assert!(!view.confirm_submission());
    }

    #[test]
    fn roster_flags_host_and_self() {
        let mut view = lobby(&["alice", "bob"]);
        view.on_member_ready("bob", true);
        let roster = view.roster();
        assert_eq!(
            roster,
            vec![
                RosterEntry {
                    name: "alice",
                    ready: false,
                    host: true,
                    me: true
                },
                RosterEntry {
                    name: "bob",
                    ready: true,
                    host: false,
                    me: false
                },
            ]
        );
    }

    #[test]
    fn all_ready_requires_members() {
        let mut view = lobby(&[]);
        assert!(!view.all_ready());
        view.on_member_joined("alice", true);
        view.on_member_ready("alice", true);
        assert!(view.all_ready());
        assert!(view.my_ready());
    }
}
