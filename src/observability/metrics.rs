//! Metrics collection for `WordSpy`.
//!
//! Prometheus-compatible metrics with typed convenience functions for
//! recording measurements. Recording is a no-op until [`init_metrics`]
//! installs the global recorder.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::WordSpyError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint (metrics are recorded internally and can be read
/// programmatically).
///
/// # Errors
///
/// Returns [`WordSpyError::Io`] if the recorder or HTTP listener cannot
/// be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), WordSpyError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| WordSpyError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!("wordspy_rooms_created_total", "Rooms created");
    describe_counter!("wordspy_games_started_total", "Rounds started");
    describe_counter!(
        "wordspy_phase_transitions_total",
        "Phase transitions performed"
    );
    describe_counter!(
        "wordspy_relay_events_published_total",
        "Domain events published on the relay"
    );
    describe_counter!(
        "wordspy_relay_listener_restarts_total",
        "Relay listener supervisor restarts"
    );
    describe_gauge!(
        "wordspy_connections_active",
        "Currently open socket connections"
    );
}

/// Records a created room.
pub fn increment_rooms_created() {
    counter!("wordspy_rooms_created_total").increment(1);
}

/// Records a started round.
pub fn increment_games_started() {
    counter!("wordspy_games_started_total").increment(1);
}

/// Records a phase transition, labelled by the phase entered.
pub fn increment_phase_transition(to_phase: &'static str) {
    counter!("wordspy_phase_transitions_total", "to" => to_phase).increment(1);
}

/// Records a published relay event.
pub fn increment_relay_published() {
    counter!("wordspy_relay_events_published_total").increment(1);
}

/// Records a relay listener restart.
pub fn increment_relay_restart() {
    counter!("wordspy_relay_listener_restarts_total").increment(1);
}

/// Updates the active-connection gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_connections_active(count: usize) {
    gauge!("wordspy_connections_active").set(count as f64);
}

// ============================================================================
// Tests
// ============================================================================
