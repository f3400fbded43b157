//! Server runtime: shared state, routing, and lifecycle.
//!
//! [`AppState`] wires the store, catalog, game engine, relay, and session
//! registry together; everything is constructed once at startup and
//! injected — no module-level singletons. The router exposes the realtime
//! WebSocket endpoint and the thin rooms REST shell.

pub mod listener;
pub mod rest;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::catalog::WordCatalog;
use crate::config::AppConfig;
use crate::error::WordSpyError;
use crate::game::GameEngine;
use crate::relay::EventRelay;
use crate::room::store::RoomStore;
use crate::session::SessionRegistry;

/// Shared state handed to every handler, the scheduler, and the relay
/// listener.
pub struct AppState {
    /// Instance configuration.
    pub config: AppConfig,
    /// Durable room storage.
    pub store: Arc<dyn RoomStore>,
    /// Phase transition engine.
    pub engine: GameEngine,
    /// Cross-instance notification channel.
    pub relay: Arc<dyn EventRelay>,
    /// This instance's live connections.
    pub sessions: Arc<SessionRegistry>,
}

/// Cheap-to-clone handle on [`AppState`].
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Builds the shared state from its injected collaborators.
    #[must_use]
    pub fn new(
        config: AppConfig,
        store: Arc<dyn RoomStore>,
        catalog: Arc<dyn WordCatalog>,
        relay: Arc<dyn EventRelay>,
    ) -> SharedState {
        let engine = GameEngine::new(
            Arc::clone(&store),
            catalog,
            config.catalog.sample_size,
        );
        Arc::new(Self {
            config,
            store,
            engine,
            relay,
            sessions: Arc::new(SessionRegistry::new()),
        })
    }
}

/// Builds the axum router over the shared state.
#[must_use]
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/rooms", post(rest::create_room))
        .route("/rooms/public", get(rest::list_public_rooms))
        .route("/rooms/{room_id}", get(rest::get_room))
        .route("/rooms/{room_id}/join", post(rest::validate_join))
        .with_state(state)
}

/// Runs the server until `cancel` fires: binds the listener, spawns the
/// supervised relay listener, and serves connections.
///
/// # Errors
///
/// Returns [`WordSpyError::Io`] when the bind or the accept loop fails.
pub async fn run(state: SharedState, cancel: CancellationToken) -> Result<(), WordSpyError> {
    let bind = state.config.server.bind.clone();
    let tcp = tokio::net::TcpListener::bind(&bind).await?;
    let addr = tcp.local_addr()?;
    info!(%addr, "wordspy listening");

    let listener_handle = tokio::spawn(listener::run_relay_listener(
        Arc::clone(&state),
        cancel.clone(),
    ));

    let app = router(state);
    let shutdown = cancel.clone();
    axum::serve(tcp, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    cancel.cancel();
    let _ = listener_handle.await;
    info!("wordspy stopped");
    Ok(())
}
