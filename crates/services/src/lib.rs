//! The three services of the coffee shop: counter, barista and kitchen.
//!
//! Every service serves `/health` and `/metrics` over HTTP next to its
//! broker consumers. The counter also takes orders over HTTP.

pub mod config;
pub mod counter;
pub mod error;
pub mod routes;
pub mod runtime;
pub mod station;
pub mod telemetry;

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{OrderRepository, ProductCatalog};
use messaging::Publisher;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, LogFormat};
pub use error::{ApiError, RuntimeError};
use routes::orders::AppState;

/// Routes every service exposes.
fn probe_routes(service_name: &str, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::probes::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::probes::health))
        .with_state(service_name.to_string())
        .merge(metrics_router)
}

fn with_layers(router: Router) -> Router {
    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the counter's router: order endpoints plus the probes.
pub fn create_counter_app<R, C, P>(
    state: Arc<AppState<R, C, P>>,
    service_name: &str,
    metrics_handle: PrometheusHandle,
) -> Router
where
    R: OrderRepository,
    C: ProductCatalog,
    P: Publisher + 'static,
{
    let orders = Router::new()
        .route(
            "/orders",
            post(routes::orders::create::<R, C, P>).get(routes::orders::list::<R, C, P>),
        )
        .route("/orders/{id}", get(routes::orders::get::<R, C, P>))
        .route("/item-types", get(routes::orders::item_types::<R, C, P>))
        .with_state(state);

    with_layers(orders.merge(probe_routes(service_name, metrics_handle)))
}

/// Creates a barista or kitchen router, which only has the probes.
pub fn create_station_app(service_name: &str, metrics_handle: PrometheusHandle) -> Router {
    with_layers(probe_routes(service_name, metrics_handle))
}

/// Installs tracing and metrics, then runs a service to completion.
///
/// The exit code is non-zero whenever the service stops for any reason other
/// than a shutdown signal.
pub async fn launch<F, Fut>(config: Config, run: F) -> ExitCode
where
    F: FnOnce(Config, PrometheusHandle) -> Fut,
    Fut: Future<Output = Result<(), RuntimeError>>,
{
    if let Err(e) = telemetry::init_tracing(&config) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let metrics_handle = match telemetry::install_metrics_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let service = config.service_name.clone();
    match run(config, metrics_handle).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(%service, error = %e, "service stopped");
            ExitCode::FAILURE
        }
    }
}
