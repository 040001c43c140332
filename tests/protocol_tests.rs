#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Protocol wire-format tests.
//!
//! Fixtures are written exactly as the hub emits them, including its `null`
//! encoding of empty collections.

use std::collections::HashMap;

use consensus_client::protocol::{
    decode_server_message, hub_endpoint, ClientMessage, Phase, ServerMessage, SessionCode,
};
use consensus_client::SessionError;

// ════════════════════════════════════════════════════════════════════
// Inbound fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn member_joined_fixture() {
    let msg = decode_server_message(r#"{"type":"member_joined","memberName":"bob","host":false}"#)
        .unwrap();
    assert_eq!(
        msg,
        ServerMessage::MemberJoined {
            member_name: "bob".into(),
            host: false
        }
    );
}

#[test]
fn member_joined_without_host_field_defaults_false() {
    let msg = decode_server_message(r#"{"type":"member_joined","memberName":"bob"}"#).unwrap();
    assert!(matches!(msg, ServerMessage::MemberJoined { host: false, .. }));
}

#[test]
fn member_left_fixture() {
    let msg = decode_server_message(r#"{"type":"member_left","memberName":"carol"}"#).unwrap();
    assert_eq!(
        msg,
        ServerMessage::MemberLeft {
            member_name: "carol".into()
        }
    );
}

#[test]
fn member_ready_fixture() {
    let msg =
        decode_server_message(r#"{"type":"member_ready","memberName":"bob","ready":true}"#)
            .unwrap();
    assert_eq!(
        msg,
        ServerMessage::MemberReady {
            member_name: "bob".into(),
            ready: true
        }
    );
}

#[test]
fn phase_changed_fixture() {
    let msg = decode_server_message(
        r#"{"type":"phase_changed","phase":"voting","ready":{"alice":true,"bob":true}}"#,
    )
    .unwrap();
    let expected: HashMap<String, bool> =
        [("alice".to_string(), true), ("bob".to_string(), true)].into();
    assert_eq!(
        msg,
        ServerMessage::PhaseChanged {
            phase: Phase::Voting,
            ready: expected
        }
    );
}

#[test]
fn phase_changed_with_null_map_decodes_empty() {
    let msg =
        decode_server_message(r#"{"type":"phase_changed","phase":"voting","ready":null}"#).unwrap();
    assert!(matches!(msg, ServerMessage::PhaseChanged { ready, .. } if ready.is_empty()));
}

#[test]
fn phase_changed_with_unknown_phase_is_rejected() {
    let err = decode_server_message(r#"{"type":"phase_changed","phase":"results","ready":{}}"#)
        .unwrap_err();
    assert!(matches!(err, SessionError::Serialization(_)));
}

#[test]
fn connected_users_fixture() {
    let msg =
        decode_server_message(r#"{"type":"connected_users","members":["alice","bob"]}"#).unwrap();
    assert_eq!(
        msg,
        ServerMessage::ConnectedUsers {
            members: vec!["alice".into(), "bob".into()]
        }
    );
}

#[test]
fn connected_users_with_null_list_decodes_empty() {
    let msg = decode_server_message(r#"{"type":"connected_users","members":null}"#).unwrap();
    assert_eq!(msg, ServerMessage::ConnectedUsers { members: vec![] });
}

#[test]
fn extra_fields_are_ignored() {
    let msg = decode_server_message(
        r#"{"type":"member_left","memberName":"carol","at":"2026-01-01T00:00:00Z"}"#,
    )
    .unwrap();
    assert!(matches!(msg, ServerMessage::MemberLeft { .. }));
}

#[test]
fn outbound_tag_is_not_accepted_inbound() {
    let err = decode_server_message(r#"{"type":"set_ready","ready":true}"#).unwrap_err();
    assert!(matches!(err, SessionError::UnknownMessageType(k) if k == "set_ready"));
}

#[test]
fn missing_type_is_malformed() {
    let err = decode_server_message(r#"{"memberName":"bob"}"#).unwrap_err();
    assert!(matches!(err, SessionError::Serialization(_)));
}

#[test]
fn known_types_cover_every_variant() {
    let samples = [
        ServerMessage::MemberJoined {
            member_name: "a".into(),
            host: true,
        },
        ServerMessage::MemberLeft {
            member_name: "a".into(),
        },
        ServerMessage::MemberReady {
            member_name: "a".into(),
            ready: true,
        },
        ServerMessage::PhaseChanged {
            phase: Phase::Lobby,
            ready: HashMap::new(),
        },
        ServerMessage::ConnectedUsers { members: vec![] },
    ];
    for (msg, tag) in samples.iter().zip(ServerMessage::KNOWN_TYPES) {
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(value["type"], tag);
    }
}

// ════════════════════════════════════════════════════════════════════
// Outbound
// ════════════════════════════════════════════════════════════════════

#[test]
fn set_ready_false_serializes_explicitly() {
    let value = serde_json::to_value(ClientMessage::SetReady { ready: false }).unwrap();
    assert_eq!(value, serde_json::json!({"type": "set_ready", "ready": false}));
}

// ════════════════════════════════════════════════════════════════════
// Endpoint
// ════════════════════════════════════════════════════════════════════

#[test]
fn endpoint_lowercases_code_and_encodes_name() {
    let url = hub_endpoint(
        "ws://localhost:8080/api",
        &SessionCode::new("AB12CD"),
        "José María",
    )
    .unwrap();
    assert_eq!(
        url.as_str(),
        "ws://localhost:8080/api/session/ab12cd/ws?name=Jos%C3%A9%20Mar%C3%ADa"
    );
}

#[test]
fn endpoint_on_host_root() {
    let url = hub_endpoint("wss://hub.example.com", &SessionCode::new("q1"), "bob").unwrap();
    assert_eq!(url.as_str(), "wss://hub.example.com/session/q1/ws?name=bob");
}
