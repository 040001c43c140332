//! # Lobby Demo
//!
//! Joins a Consensus session lobby and keeps a live roster:
//!
//! 1. Connect to the hub for a session code and member name
//! 2. Apply hub events to a local `SessionView` and print the roster
//! 3. Press Enter to toggle readiness
//! 4. Disconnect on Ctrl+C, when voting opens, or when the hub closes
//!
//! ## Running
//!
//! ```sh
//! # Join (or host) a session through the REST API first, then:
//! CONSENSUS_SESSION=AB12CD CONSENSUS_NAME=alice cargo run --example lobby
//!
//! # Override the hub URL:
//! CONSENSUS_HUB_URL=wss://consensus.example.com/api cargo run --example lobby
//! ```

use consensus_client::{
    Phase, SessionCode, SessionConfig, SessionConnection, SessionEvent, SessionView,
    WebSocketConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Default hub URL when `CONSENSUS_HUB_URL` is not set.
const DEFAULT_HUB_URL: &str = "ws://localhost:8080/api";

fn print_roster(view: &SessionView) {
    println!(
        "── {} · {} · {}/{} ready",
        view.code(),
        view.phase(),
        view.ready_count(),
        view.members().len()
    );
    for entry in view.roster() {
        let mark = if entry.ready { "●" } else { "○" };
        let host = if entry.host { " (host)" } else { "" };
        let me = if entry.me { " (you)" } else { "" };
        println!("   {mark} {}{host}{me}", entry.name);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let hub_url = std::env::var("CONSENSUS_HUB_URL").unwrap_or_else(|_| DEFAULT_HUB_URL.into());
    let code = SessionCode::new(std::env::var("CONSENSUS_SESSION").unwrap_or_default());
    let name = std::env::var("CONSENSUS_NAME").unwrap_or_default();
    if code.is_empty() || name.is_empty() {
        return Err("set CONSENSUS_SESSION and CONSENSUS_NAME".into());
    }

    let config = SessionConfig::new().with_hub_url(hub_url);
    let (mut conn, mut events) =
        SessionConnection::new(WebSocketConnector, config, code.clone(), name.clone());
    let mut view = SessionView::new(code, name.clone(), None, [name]);

    conn.connect();
    tracing::info!("joining session {}", view.code());

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                view.apply(&event);

                match &event {
                    SessionEvent::Connected => tracing::info!("connected to hub"),
                    SessionEvent::Disconnected { reason, will_retry: true } => {
                        tracing::warn!("connection lost ({reason:?}); retrying");
                    }
                    SessionEvent::Disconnected { reason, will_retry: false } => {
                        tracing::info!("session ended ({reason:?})");
                        break;
                    }
                    _ => print_roster(&view),
                }

                if view.phase() >= Phase::Voting {
                    println!("Everyone is ready. Voting has started!");
                    break;
                }
            }

            line = stdin.next_line() => {
                match line {
                    Ok(Some(_)) => {
                        if !conn.set_ready(!view.my_ready()) {
                            println!("not connected; try again shortly");
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, leaving session");
                break;
            }
        }
    }

    conn.disconnect().await;
    Ok(())
}
