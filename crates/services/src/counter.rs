//! Counter service wiring.
//!
//! Takes orders over HTTP, publishes drink and food orders, and folds the
//! stations' "ready" events back into the orders it owns.

use std::sync::Arc;

use domain::{InMemoryOrderRepository, InMemoryProductCatalog, OrderRepository, OrderService};
use lapin::Connection;
use messaging::AmqpPublisher;
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    CounterRouter, DRINK_ORDERED, DRINK_READY, FOOD_ORDERED, FOOD_READY, ItemReadyHandler,
    PlaceOrderHandler, Route,
};
use store::PostgresOrderRepository;
use tracing::info;

use crate::config::Config;
use crate::error::RuntimeError;
use crate::routes::orders::AppState;
use crate::runtime::{self, Consumers};

pub const SERVICE_NAME: &str = "counter";
pub const DEFAULT_PORT: u16 = 3000;

/// Runs the counter until shutdown or until one of its consumers stops.
pub async fn run(config: Config, metrics_handle: PrometheusHandle) -> Result<(), RuntimeError> {
    let connection = runtime::connect_broker(&config).await?;

    match runtime::connect_database(&config).await? {
        Some(pool) => {
            let repository = PostgresOrderRepository::new(pool);
            repository.run_migrations().await?;
            serve(config, connection, repository, metrics_handle).await
        }
        None => serve(config, connection, InMemoryOrderRepository::new(), metrics_handle).await,
    }
}

async fn serve<R: OrderRepository>(
    config: Config,
    connection: Arc<Connection>,
    repository: R,
    metrics_handle: PrometheusHandle,
) -> Result<(), RuntimeError> {
    let orders = Arc::new(OrderService::new(repository, InMemoryProductCatalog::new()));

    let publisher = |route: Route| {
        AmqpPublisher::new(connection.clone()).configure(route.publisher_config())
    };
    let place = PlaceOrderHandler::new(
        orders.clone(),
        publisher(DRINK_ORDERED),
        publisher(FOOD_ORDERED),
    );

    let router = Arc::new(CounterRouter::new(ItemReadyHandler::new(orders)));
    let mut consumers = Consumers::new();
    for route in [DRINK_READY, FOOD_READY] {
        let consumer_config = route.consumer_config(
            config.worker_pool_size,
            config.prefetch_count,
            config.dead_letter_exchange.clone(),
        );
        consumers.spawn(connection.clone(), consumer_config, router.clone());
    }

    let app = crate::create_counter_app(
        Arc::new(AppState::new(place)),
        &config.service_name,
        metrics_handle,
    );

    info!(service = %config.service_name, "counter ready");
    runtime::serve(&config.addr(), app, consumers).await
}
