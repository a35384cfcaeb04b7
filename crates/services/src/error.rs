//! HTTP error mapping and process-level errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError, RepositoryError};
use messaging::MessagingError;
use saga::SagaError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Order placement or hand-off error.
    Saga(SagaError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        DomainError::Order(OrderError::ItemNotFound { .. })
        | DomainError::Repository(RepositoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
        DomainError::Repository(RepositoryError::Conflict { .. } | RepositoryError::Duplicate { .. }) => {
            StatusCode::CONFLICT
        }
        DomainError::Catalog(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, String) {
    match err {
        SagaError::Domain(domain) => domain_error_to_response(domain),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

/// Reasons a service process stops.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),

    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error("cannot connect to database after {attempts} attempts: {reason}")]
    Database { attempts: usize, reason: String },

    #[error("database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP server error: {0}")]
    Io(#[from] std::io::Error),

    /// A consumer's delivery stream ended; the service can no longer make progress.
    #[error("consumer on {queue} stopped: {source}")]
    ConsumerStopped {
        queue: String,
        #[source]
        source: MessagingError,
    },
}
