//! Tracing subscriber and Prometheus recorder setup.
//!
//! Both are process-wide and installed once from a binary's `main`.

use metrics::{Unit, describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Config, LogFormat};
use crate::error::RuntimeError;

/// Installs the global subscriber: `EnvFilter` from the configured level plus
/// a text or JSON fmt layer.
pub fn init_tracing(config: &Config) -> Result<(), RuntimeError> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (json, text) = match config.log_format {
        LogFormat::Json => (Some(tracing_subscriber::fmt::layer().json()), None),
        LogFormat::Text => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()
        .map_err(|e| RuntimeError::Tracing(e.to_string()))
}

/// Installs the Prometheus recorder and describes the service metrics.
pub fn install_metrics_recorder() -> Result<PrometheusHandle, RuntimeError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!("orders_placed_total", "Orders accepted at the counter");
    describe_counter!(
        "orders_fulfilled_total",
        "Orders whose last line item became ready"
    );
    describe_counter!(
        "orders_unpublished_total",
        "Orders stored without every item reaching a station"
    );
    describe_counter!(
        "order_events_published_total",
        "Events published, by message type"
    );
    describe_counter!(
        "preparations_completed_total",
        "Items prepared, by station"
    );
    describe_counter!("deliveries_total", "Deliveries settled, by outcome");
    describe_histogram!(
        "preparation_duration_seconds",
        Unit::Seconds,
        "Time a station spent on one item"
    );
}
