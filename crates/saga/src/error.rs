//! Saga error types.

use common::{EventDecodeError, OrderId};
use domain::DomainError;
use messaging::MessagingError;
use thiserror::Error;

/// Errors that can occur while reacting to an event or placing an order.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The delivery body or type tag could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] EventDecodeError),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Publishing a follow-up event failed.
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// The event is valid but this handler does not react to it.
    #[error("Unexpected event {actual}, this handler expects {expected}")]
    UnexpectedEvent {
        expected: &'static str,
        actual: &'static str,
    },

    /// The order was stored but not every "ordered" event went out.
    #[error("Order {order_id} persisted but only {published} of {total} events were published: {source}")]
    Unpublished {
        order_id: OrderId,
        published: usize,
        total: usize,
        #[source]
        source: MessagingError,
    },
}

impl SagaError {
    /// Returns true if the caller sent something the domain refuses.
    pub fn is_validation(&self) -> bool {
        matches!(self, SagaError::Domain(e) if e.is_validation())
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
