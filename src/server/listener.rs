//! Supervised relay listener.
//!
//! One long-lived task per instance subscribes to every relay channel and
//! re-broadcasts incoming notifications to this instance's sockets.
//! Frames published by this instance are skipped — its sockets already
//! received the direct broadcast. When the subscription fails, a
//! supervised loop restarts it with capped exponential backoff and an
//! explicit restart count; nothing in flight is buffered across restarts.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::observability::metrics;
use crate::protocol::ServerEvent;
use crate::relay::{EventRelay, RelayFrame, RelaySubscription};
use crate::server::{AppState, SharedState};

/// Backoff doublings before the delay pins to the cap.
const MAX_BACKOFF_DOUBLINGS: u32 = 5;

/// Runs the listener until `cancel` fires.
pub async fn run_relay_listener(state: SharedState, cancel: CancellationToken) {
    let base = Duration::from_millis(state.config.relay.restart_base_ms);
    let cap = Duration::from_millis(state.config.relay.restart_cap_ms);
    let mut restarts: u32 = 0;

    info!("relay listener starting");
    loop {
        let mut subscription = state.relay.subscribe();
        if listen(&state, &mut subscription, &cancel).await == ListenEnd::Cancelled {
            break;
        }

        restarts += 1;
        metrics::increment_relay_restart();
        let delay = backoff_delay(base, cap, restarts);
        warn!(restarts, ?delay, "relay subscription ended; restarting");

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }
    info!(restarts, "relay listener stopped");
}

#[derive(Debug, PartialEq, Eq)]
enum ListenEnd {
    Closed,
    Cancelled,
}

async fn listen(
    state: &AppState,
    subscription: &mut RelaySubscription,
    cancel: &CancellationToken,
) -> ListenEnd {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return ListenEnd::Cancelled,
            frame = subscription.recv() => match frame {
                None => return ListenEnd::Closed,
                Some(frame) => handle_frame(state, &frame),
            }
        }
    }
}

/// Fans one relayed notification out to this instance's sockets.
fn handle_frame(state: &AppState, frame: &RelayFrame) {
    if frame.origin == state.relay.origin() {
        return;
    }

    match frame.decode() {
        Err(e) => warn!(channel = %frame.channel, error = %e, "dropping malformed relay frame"),
        Ok(event) => {
            let room_id = event.room_id().to_string();
            debug!(channel = %frame.channel, room_id = %room_id, "relayed event");
            let server_event = ServerEvent::from_domain(event);
            state.sessions.broadcast_room(&room_id, &server_event);
        }
    }
}

/// Capped exponential backoff: `base * 2^(restarts-1)`, never above
/// `cap`.
fn backoff_delay(base: Duration, cap: Duration, restarts: u32) -> Duration {
    let doublings = restarts.saturating_sub(1).min(MAX_BACKOFF_DOUBLINGS);
    std::cmp::min(base * 2u32.pow(doublings), cap)
}

// ============================================================================
// Tests
// ============================================================================
