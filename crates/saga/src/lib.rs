//! Fulfillment choreography between the counter, barista and kitchen.
//!
//! There is no coordinator. Each service reacts to the events it consumes:
//! 1. The counter places an order and publishes one "ordered" event per item
//! 2. The barista or kitchen prepares the item and publishes a "ready" event
//! 3. The counter marks the line item fulfilled, and the order once all are
//!
//! [`routers`] adapt the reducers in [`handlers`] to the worker pool of a
//! consumer bound to one of the [`topology`] routes.

pub mod error;
pub mod handlers;
pub mod routers;
pub mod topology;

pub use error::{Result, SagaError};
pub use handlers::{ItemOrderedHandler, ItemReadyHandler, PlaceOrderHandler};
pub use routers::{CounterRouter, StationRouter};
pub use topology::{DRINK_ORDERED, DRINK_READY, FOOD_ORDERED, FOOD_READY, Route};
