//! Barista and kitchen service wiring.
//!
//! A station consumes its "ordered" queue, prepares each item and publishes
//! a "ready" event to the counter.

use std::sync::Arc;

use domain::{InMemoryPreparationRepository, PreparationRepository, Station};
use lapin::Connection;
use messaging::AmqpPublisher;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{ItemOrderedHandler, Route, StationRouter};
use store::PostgresPreparationRepository;
use tracing::info;

use crate::config::Config;
use crate::error::RuntimeError;
use crate::runtime::{self, Consumers};

/// Default HTTP port of a station.
pub fn default_port(station: Station) -> u16 {
    match station {
        Station::Barista => 3001,
        Station::Kitchen => 3002,
    }
}

/// Runs `station` until shutdown or until its consumer stops.
pub async fn run(
    station: Station,
    config: Config,
    metrics_handle: PrometheusHandle,
) -> Result<(), RuntimeError> {
    let connection = runtime::connect_broker(&config).await?;

    match runtime::connect_database(&config).await? {
        Some(pool) => {
            let repository = PostgresPreparationRepository::new(pool, station);
            repository.run_migrations().await?;
            serve(station, config, connection, repository, metrics_handle).await
        }
        None => {
            let repository = InMemoryPreparationRepository::new();
            serve(station, config, connection, repository, metrics_handle).await
        }
    }
}

/// Builds the handler a station runs for every "ordered" delivery.
pub fn handler<R: PreparationRepository>(
    station: Station,
    config: &Config,
    repository: R,
    publisher: AmqpPublisher,
) -> ItemOrderedHandler<R, AmqpPublisher> {
    let handler = ItemOrderedHandler::new(station, repository, publisher)
        .with_time_scale(config.preparation_time_scale);
    match &config.made_by {
        Some(made_by) => handler.with_made_by(made_by.clone()),
        None => handler,
    }
}

async fn serve<R: PreparationRepository>(
    station: Station,
    config: Config,
    connection: Arc<Connection>,
    repository: R,
    metrics_handle: PrometheusHandle,
) -> Result<(), RuntimeError> {
    let publisher =
        AmqpPublisher::new(connection.clone()).configure(Route::ready(station).publisher_config());
    let router = Arc::new(StationRouter::new(handler(station, &config, repository, publisher)));

    let mut consumers = Consumers::new();
    let consumer_config = Route::ordered(station).consumer_config(
        config.worker_pool_size,
        config.prefetch_count,
        config.dead_letter_exchange.clone(),
    );
    consumers.spawn(connection, consumer_config, router);

    let app = crate::create_station_app(&config.service_name, metrics_handle);

    info!(
        service = %config.service_name,
        station = %station,
        workers = config.worker_pool_size,
        time_scale = config.preparation_time_scale,
        "station ready"
    );
    runtime::serve(&config.addr(), app, consumers).await
}
