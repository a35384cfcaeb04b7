use common::{ItemOrdered, ItemType, LineItemId, Money, OrderId, Status};

use crate::preparation::Station;

/// One drink or food item within an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Also the id of the preparation record at the barista or kitchen.
    pub id: LineItemId,

    pub order_id: OrderId,

    pub item_type: ItemType,

    /// Catalog name at the time of ordering.
    pub name: String,

    /// Catalog price at the time of ordering.
    pub price: Money,

    pub status: Status,

    /// True for drinks (barista), false for food (kitchen).
    pub is_barista_line: bool,
}

impl LineItem {
    /// Creates a line item that is already in process.
    pub fn new(order_id: OrderId, item_type: ItemType, price: Money, is_barista_line: bool) -> Self {
        Self {
            id: LineItemId::new(),
            order_id,
            item_type,
            name: item_type.name().to_string(),
            price,
            status: Status::InProcess,
            is_barista_line,
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.status.is_fulfilled()
    }

    /// Where this item is prepared.
    pub fn station(&self) -> Station {
        if self.is_barista_line {
            Station::Barista
        } else {
            Station::Kitchen
        }
    }

    /// Payload of the event asking a station to prepare this item.
    pub fn ordered(&self) -> ItemOrdered {
        ItemOrdered {
            order_id: self.order_id,
            line_item_id: self.id,
            item_type: self.item_type,
        }
    }
}
