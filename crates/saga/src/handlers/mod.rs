//! Event reducers, one per kind of work a service does.

mod item_ordered;
mod item_ready;
mod place_order;

pub use item_ordered::ItemOrderedHandler;
pub use item_ready::ItemReadyHandler;
pub use place_order::PlaceOrderHandler;
