//! Process plumbing shared by the three binaries: connections, consumers,
//! the HTTP server and shutdown.

use std::future::{Future, IntoFuture};
use std::sync::Arc;

use axum::Router;
use lapin::Connection;
use messaging::{AmqpConsumer, ConsumerConfig, DeliveryHandler, MessagingError};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::Config;
use crate::error::RuntimeError;

const MAX_DB_CONNECTIONS: u32 = 10;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// If a handler cannot be installed that signal is never observed; the
/// other one still works.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Dials the broker with the configured retry budget.
pub async fn connect_broker(config: &Config) -> Result<Arc<Connection>, RuntimeError> {
    let connection = messaging::connect(&config.amqp_url, &config.retry_policy()).await?;
    Ok(Arc::new(connection))
}

/// Opens the PostgreSQL pool if `DATABASE_URL` is set, with the same retry
/// budget as the broker.
pub async fn connect_database(config: &Config) -> Result<Option<PgPool>, RuntimeError> {
    let Some(url) = config.database_url.as_deref() else {
        info!("DATABASE_URL not set, keeping state in memory");
        return Ok(None);
    };

    let pool = messaging::retry_connect(
        || PgPoolOptions::new().max_connections(MAX_DB_CONNECTIONS).connect(url),
        &config.retry_policy(),
    )
    .await
    .map_err(|e| match e {
        MessagingError::CannotConnectBroker { attempts, reason } => {
            RuntimeError::Database { attempts, reason }
        }
        other => RuntimeError::Messaging(other),
    })?;

    info!("Connected to database");
    Ok(Some(pool))
}

/// Consumers of one service, each running until its channel closes.
#[derive(Default)]
pub struct Consumers {
    tasks: JoinSet<Result<(), RuntimeError>>,
}

impl Consumers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts consuming `config.queue` with `handler` on its own task.
    pub fn spawn<H: DeliveryHandler>(
        &mut self,
        connection: Arc<Connection>,
        config: ConsumerConfig,
        handler: Arc<H>,
    ) {
        self.spawn_task(config.queue.clone(), async move {
            AmqpConsumer::new(connection, config).start(handler).await
        });
    }

    /// Runs any consumer future. It is only ever expected to return an error.
    pub fn spawn_task<F>(&mut self, queue: String, consumer: F)
    where
        F: Future<Output = Result<(), MessagingError>> + Send + 'static,
    {
        self.tasks.spawn(async move {
            let source = match consumer.await {
                Ok(()) => MessagingError::ChannelClosed("consumer returned".to_string()),
                Err(e) => e,
            };
            Err(RuntimeError::ConsumerStopped { queue, source })
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Resolves with the error of the first consumer to stop.
    ///
    /// Never resolves when there are no consumers.
    pub async fn first_failure(&mut self) -> RuntimeError {
        match self.tasks.join_next().await {
            Some(Ok(Err(e))) => e,
            Some(Ok(Ok(()))) => RuntimeError::ConsumerStopped {
                queue: "unknown".to_string(),
                source: MessagingError::ChannelClosed("consumer returned".to_string()),
            },
            Some(Err(join_error)) => RuntimeError::ConsumerStopped {
                queue: "unknown".to_string(),
                source: MessagingError::ChannelClosed(join_error.to_string()),
            },
            None => std::future::pending().await,
        }
    }
}

/// Serves `app` on `addr` until a shutdown signal arrives or a consumer stops.
///
/// A stopped consumer makes the whole service stop with its error, so the
/// process exits non-zero and gets restarted.
pub async fn serve(addr: &str, app: Router, consumers: Consumers) -> Result<(), RuntimeError> {
    serve_until(addr, app, consumers, shutdown_signal()).await
}

/// Same as [`serve`] with an explicit shutdown future.
pub async fn serve_until<S>(
    addr: &str,
    app: Router,
    mut consumers: Consumers,
    shutdown: S,
) -> Result<(), RuntimeError>
where
    S: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, consumers = consumers.len(), "listening");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = shutdown => {}
                _ = stop_rx => {}
            }
        })
        .into_future();
    tokio::pin!(server);

    let outcome = tokio::select! {
        served = &mut server => served.map_err(RuntimeError::from),
        failure = consumers.first_failure() => {
            error!(error = %failure, "consumer stopped, shutting down");
            let _ = stop_tx.send(());
            if let Err(e) = server.await {
                error!(error = %e, "HTTP server failed while draining");
            }
            Err(failure)
        }
    };

    consumers.tasks.abort_all();
    if outcome.is_ok() {
        info!("shut down gracefully");
    }
    outcome
}
