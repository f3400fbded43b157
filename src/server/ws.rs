//! WebSocket endpoint: the realtime client protocol.
//!
//! One task per direction: the reader decodes [`ClientEvent`] envelopes
//! and dispatches them sequentially (per-connection ordering), the writer
//! drains the connection's outbound channel. Disconnects run the same
//! leave path as an explicit leave.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::handlers;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::server::SharedState;

/// Upgrades `GET /ws` to the realtime protocol.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let conn = state.sessions.register(tx);
    debug!(%conn, "socket connected");

    state.sessions.send(
        conn,
        &ServerEvent::Connected {
            sid: conn.to_string(),
        },
    );

    let mut writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let reader_state = Arc::clone(&state);
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        trace!(%conn, ?event, "client event");
                        handlers::dispatch(&reader_state, conn, event).await;
                    }
                    Err(e) => {
                        reader_state.sessions.send(
                            conn,
                            &ServerEvent::Error {
                                message: format!("malformed event: {e}"),
                            },
                        );
                    }
                },
                Message::Close(_) => break,
                // Pings are answered by axum; binary frames are not part
                // of the protocol.
                _ => {}
            }
        }
    });

    // Either side ending tears the connection down.
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    handlers::room::disconnect(&state, conn).await;
    debug!(%conn, "socket closed");
}
