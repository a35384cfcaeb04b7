//! Order aggregate and related types.

mod aggregate;
mod commands;
mod line_item;
mod service;

pub use aggregate::{Order, OrderParts, UpdateOutcome};
pub use commands::PlaceOrder;
pub use line_item::LineItem;
pub use service::OrderService;

use common::{ItemType, LineItemId, OrderId};
use thiserror::Error;

use crate::preparation::Station;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The loyalty member id is not a UUID.
    #[error("Invalid loyalty member id: {0}")]
    InvalidLoyaltyMemberId(String),

    /// Order has no items.
    #[error("Order has no items")]
    NoItems,

    /// The item is not sold on that menu.
    #[error("{item_type} is not on the {menu} menu")]
    UnknownItem {
        item_type: ItemType,
        menu: &'static str,
    },

    /// A ready event points at a line item the order does not have.
    #[error("Line item {line_item_id} not found in order {order_id}")]
    ItemNotFound {
        order_id: OrderId,
        line_item_id: LineItemId,
    },

    /// A ready event describes something other than the line item it names.
    #[error(
        "Line item {line_item_id} is {expected} from the {expected_station}, \
         but the {station} reported {actual}"
    )]
    ItemMismatch {
        line_item_id: LineItemId,
        expected: ItemType,
        expected_station: Station,
        actual: ItemType,
        station: Station,
    },
}
