#![no_main]

use consensus_client::protocol::decode_server_message;
use consensus_client::{SessionCode, SessionEvent, SessionView};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Whatever decodes must also apply cleanly and keep the view consistent.
    if let Ok(msg) = decode_server_message(text) {
        let mut view = SessionView::new(
            SessionCode::new("fuzz"),
            "me",
            None,
            ["me".to_string(), "peer".to_string()],
        );
        let event = SessionEvent::from(msg);
        view.apply(&event);
        view.apply(&event);
        if matches!(event, SessionEvent::ConnectedUsers { .. }) {
            assert_eq!(view.members().len(), view.ready().len());
            assert!(view.members().iter().all(|m| view.ready().contains_key(m)));
        }
    }
});
