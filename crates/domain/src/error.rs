//! Domain error types.

use thiserror::Error;

use crate::order::OrderError;
use crate::preparation::PreparationError;
use crate::repository::RepositoryError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred while preparing an item.
    #[error("Preparation error: {0}")]
    Preparation(#[from] PreparationError),

    /// The persistence port failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The product catalog could not be reached.
    #[error("Product catalog error: {0}")]
    Catalog(String),
}

impl DomainError {
    /// Returns true if the operation lost an optimistic concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Repository(RepositoryError::Conflict { .. }))
    }

    /// Returns true if the caller sent something the domain refuses.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::Order(
                OrderError::InvalidLoyaltyMemberId(_)
                    | OrderError::NoItems
                    | OrderError::UnknownItem { .. }
            )
        )
    }
}
