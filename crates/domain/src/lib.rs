//! Domain layer for the coffee-shop fulfillment saga.
//!
//! This crate provides:
//! - The `Order` aggregate with its line items and status convergence rule
//! - Drink and food preparation records (`PreparationOrder`) per station
//! - Ports for the product catalog and the repositories, with in-memory adapters
//! - `OrderService`, the counter's use cases over those ports

pub mod catalog;
pub mod error;
pub mod order;
pub mod preparation;
pub mod repository;

pub use catalog::{CatalogItem, InMemoryProductCatalog, ProductCatalog};
pub use error::DomainError;
pub use order::{
    LineItem, Order, OrderError, OrderParts, OrderService, PlaceOrder, UpdateOutcome,
};
pub use preparation::{PreparationError, PreparationOrder, Station};
pub use repository::{
    InMemoryOrderRepository, InMemoryPreparationRepository, OrderRepository,
    PreparationRepository, RepositoryError,
};
