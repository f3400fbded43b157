//! `serve` command: wire the collaborators and run the server.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::{HttpCatalog, StaticCatalog, WordCatalog};
use crate::cli::args::ServeArgs;
use crate::config::load_config;
use crate::error::WordSpyError;
use crate::observability::metrics::init_metrics;
use crate::relay::{EventRelay, InProcessRelay};
use crate::room::store::{MemoryRoomStore, RoomStore};
use crate::server::{self, AppState};

/// Runs the server until a shutdown signal arrives.
///
/// # Errors
///
/// Configuration, bind, and metrics-installation failures.
pub async fn run(args: ServeArgs) -> Result<(), WordSpyError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.metrics_port {
        config.server.metrics_port = Some(port);
    }

    init_metrics(config.server.metrics_port)?;

    let store: Arc<dyn RoomStore> = Arc::new(MemoryRoomStore::new(Duration::from_secs(
        config.rooms.ttl_secs,
    )));
    let catalog: Arc<dyn WordCatalog> = match &config.catalog.base_url {
        Some(url) => {
            info!(url = %url, "using HTTP word catalog");
            Arc::new(HttpCatalog::new(url.clone()))
        }
        None => {
            warn!("catalog.base_url not configured; serving built-in demo words");
            Arc::new(demo_catalog())
        }
    };
    let relay: Arc<dyn EventRelay> = Arc::new(InProcessRelay::default());

    let state = AppState::new(config, store, catalog, relay);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
        info!("shutdown signal received");
        signal_cancel.cancel();
    });

    server::run(state, cancel).await
}

/// Small built-in catalog so the server runs without the word service.
fn demo_catalog() -> StaticCatalog {
    StaticCatalog::from_values(
        1,
        "es",
        &[
            "gato", "perro", "playa", "montaña", "guitarra", "pizza", "fútbol", "invierno",
            "biblioteca", "astronauta",
        ],
    )
}
