//! Metrics collection.
//!
//! Prometheus-compatible counters for session activity. Labels are limited
//! to closed enum values (phases, alignments, event tags), so there is no
//! cardinality risk from player-controlled input.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::EngineError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint and metrics are only readable programmatically.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), EngineError> {
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
    .map_err(|e| EngineError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!("nocturne_sessions_total", "Game sessions created");
    describe_counter!("nocturne_events_total", "Events appended to the log");
    describe_counter!("nocturne_phase_transitions_total", "Phase transitions");
    describe_counter!("nocturne_deaths_total", "Seats that died");
    describe_counter!("nocturne_games_ended_total", "Games that reached a winner");
}
