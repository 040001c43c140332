//! Wire-compatible protocol types for the Consensus session hub.
//!
//! Every frame is a single JSON object tagged by its `type` field. Payload
//! fields use the hub's camelCase spelling (`memberName`). The hub serializes
//! empty lists and maps as `null`, so collection fields decode `null` as empty.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::error::{Result, SessionError};

// ── Session code ────────────────────────────────────────────────────

/// Case-insensitive join code identifying a session.
///
/// Stored in its transport form (trimmed, lowercase). [`Display`](fmt::Display)
/// renders the uppercase form shown to users.
///
/// ```
/// use consensus_client::protocol::SessionCode;
///
/// let code = SessionCode::new(" Ab12Cd ");
/// assert_eq!(code.as_str(), "ab12cd");
/// assert_eq!(code.to_string(), "AB12CD");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SessionCode(String);

impl SessionCode {
    /// Normalize a raw code as typed or pasted by a user.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// The lowercase form used on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no code was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_uppercase())
    }
}

impl From<&str> for SessionCode {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for SessionCode {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

// ── Phase ───────────────────────────────────────────────────────────

/// Session phase. Ordered: a session only ever moves forward.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Members gather and mark themselves ready.
    #[default]
    Lobby,
    /// Every member was ready; choices are being made.
    Voting,
    /// Terminal label once the local member has confirmed their choices.
    Submitted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Lobby => "lobby",
            Self::Voting => "voting",
            Self::Submitted => "submitted",
        };
        f.write_str(label)
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Request a readiness change for the connected member.
    SetReady { ready: bool },
}

/// Message types sent from hub to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A member connected to the session.
    #[serde(rename_all = "camelCase")]
    MemberJoined {
        member_name: String,
        #[serde(default)]
        host: bool,
    },
    /// A member disconnected from the session.
    #[serde(rename_all = "camelCase")]
    MemberLeft { member_name: String },
    /// A member's readiness changed.
    #[serde(rename_all = "camelCase")]
    MemberReady { member_name: String, ready: bool },
    /// The session moved to a new phase; `ready` is the full readiness snapshot.
    PhaseChanged {
        phase: Phase,
        #[serde(default, deserialize_with = "null_as_default")]
        ready: HashMap<String, bool>,
    },
    /// Authoritative list of connected members, sent on every (re)connection.
    ConnectedUsers {
        #[serde(default, deserialize_with = "null_as_default")]
        members: Vec<String>,
    },
}

impl ServerMessage {
    /// Every `type` tag the hub may send.
    pub const KNOWN_TYPES: [&'static str; 5] = [
        "member_joined",
        "member_left",
        "member_ready",
        "phase_changed",
        "connected_users",
    ];
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns [`SessionError::UnknownMessageType`] when the frame is a JSON object
/// with an unrecognized `type` tag, and [`SessionError::Serialization`] for
/// anything else that does not match the contract.
pub fn decode_server_message(text: &str) -> Result<ServerMessage> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);

    match serde_json::from_value::<ServerMessage>(value) {
        Ok(msg) => Ok(msg),
        Err(e) => match kind {
            Some(kind) if !ServerMessage::KNOWN_TYPES.contains(&kind.as_str()) => {
                Err(SessionError::UnknownMessageType(kind))
            }
            _ => Err(e.into()),
        },
    }
}

// ── Endpoint ────────────────────────────────────────────────────────

/// Build the hub endpoint for a session:
/// `{hub_url}/session/{code}/ws?name={member}`.
///
/// The member name travels as a percent-encoded query parameter, never in a
/// frame payload.
///
/// ```
/// use consensus_client::protocol::{hub_endpoint, SessionCode};
///
/// let url = hub_endpoint("ws://localhost:8080/api", &SessionCode::new("AB12CD"), "Bob & Co")
///     .unwrap();
/// assert_eq!(url.as_str(), "ws://localhost:8080/api/session/ab12cd/ws?name=Bob%20%26%20Co");
/// ```
///
/// # Errors
///
/// Returns [`SessionError::InvalidEndpoint`] if `hub_url` does not parse and
/// [`SessionError::UnsupportedScheme`] if it is not `ws://` or `wss://`.
pub fn hub_endpoint(hub_url: &str, code: &SessionCode, member_name: &str) -> Result<Url> {
    let mut url = Url::parse(hub_url)?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => return Err(SessionError::UnsupportedScheme(other.to_owned())),
    }

    let base = url.path().trim_end_matches('/').to_owned();
    url.set_path(&format!(
        "{base}/session/{}/ws",
        urlencoding::encode(code.as_str())
    ));
    url.set_query(Some(&format!("name={}", urlencoding::encode(member_name))));
    Ok(url)
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

    #[test]
    fn session_code_normalizes_case_and_whitespace() {
        let code = SessionCode::new("  XyZ9  ");
        assert_eq!(code.as_str(), "xyz9");
        assert_eq!(code.to_string(), "XYZ9");
        assert_eq!(code, SessionCode::from("xyz9"));
    }

    #[test]
    fn empty_session_code_is_empty() {
        assert!(SessionCode::new("   ").is_empty());
        assert!(SessionCode::default().is_empty());
    }

    #[test]
    fn phases_are_ordered() {
        assert!(Phase::Lobby < Phase::Voting);
        assert!(Phase::Voting < Phase::Submitted);
        assert_eq!(Phase::default(), Phase::Lobby);
    }

    #[test]
    fn set_ready_wire_format() {
        let json = serde_json::to_string(&ClientMessage::SetReady { ready: true }).unwrap();
        assert_eq!(json, r#"{"type":"set_ready","ready":true}"#);
    }

    #[test]
    fn endpoint_encodes_reserved_characters() {
        let url = hub_endpoint(
            "wss://hub.example.com/api/",
            &SessionCode::new("QQ77"),
            "a/b?c=d#e",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "wss://hub.example.com/api/session/qq77/ws?name=a%2Fb%3Fc%3Dd%23e"
        );
    }

    #[test]
    fn endpoint_rejects_http_scheme() {
        let err = hub_endpoint("http://localhost:8080/api", &SessionCode::new("x"), "bob")
            .unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedScheme(s) if s == "http"));
    }

    #[test]
    fn endpoint_rejects_unparseable_url() {
        let err = hub_endpoint("not a url", &SessionCode::new("x"), "bob").unwrap_err();
        assert!(matches!(err, SessionError::InvalidEndpoint(_)));
    }

    #[test]
    fn decode_reports_unknown_type() {
        let err = decode_server_message(r#"{"type":"confetti","amount":3}"#).unwrap_err();
        assert!(matches!(err, SessionError::UnknownMessageType(k) if k == "confetti"));
    }

    #[test]
    fn decode_reports_malformed_known_type() {
        let err = decode_server_message(r#"{"type":"member_ready","memberName":"bob"}"#)
            .unwrap_err();
        assert!(matches!(err, SessionError::Serialization(_)));
    }

    #[test]
    fn decode_reports_non_json() {
        let err = decode_server_message("hello").unwrap_err();
        assert!(matches!(err, SessionError::Serialization(_)));
    }
}
