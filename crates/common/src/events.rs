//! Integration events exchanged between the counter, barista and kitchen.
//!
//! On the wire the variant is not part of the body: it travels in the AMQP
//! `type` property (see [`message_types`]) and the body is the JSON payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ItemType, LineItemId, OrderId};

/// Type tags carried in the message `type` property.
pub mod message_types {
    pub const BARISTA_ORDER_CREATED: &str = "barista-order-created";
    pub const KITCHEN_ORDER_CREATED: &str = "kitchen-order-created";
    pub const BARISTA_ORDER_UPDATED: &str = "barista-order-updated";
    pub const KITCHEN_ORDER_UPDATED: &str = "kitchen-order-updated";
}

/// Errors raised while decoding a delivery into a [`DomainEvent`].
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("malformed event body: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A line item was ordered and must be prepared by a station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOrdered {
    pub order_id: OrderId,
    #[serde(rename = "itemLineId")]
    pub line_item_id: LineItemId,
    pub item_type: ItemType,
}

/// A station finished preparing a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReady {
    pub order_id: OrderId,
    #[serde(rename = "itemLineId")]
    pub line_item_id: LineItemId,
    pub name: String,
    pub item_type: ItemType,
    pub made_by: String,
    pub time_in: DateTime<Utc>,
    pub time_up: DateTime<Utc>,
}

/// Events flowing through the fulfillment choreography.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    /// Counter asks the barista for a drink.
    ItemOrderedForDrink(ItemOrdered),

    /// Counter asks the kitchen for a food item.
    ItemOrderedForFood(ItemOrdered),

    /// Barista reports a drink as done.
    DrinkReady(ItemReady),

    /// Kitchen reports a food item as done.
    FoodReady(ItemReady),
}

impl DomainEvent {
    /// Returns the type tag this event is published with.
    pub fn message_type(&self) -> &'static str {
        match self {
            DomainEvent::ItemOrderedForDrink(_) => message_types::BARISTA_ORDER_CREATED,
            DomainEvent::ItemOrderedForFood(_) => message_types::KITCHEN_ORDER_CREATED,
            DomainEvent::DrinkReady(_) => message_types::BARISTA_ORDER_UPDATED,
            DomainEvent::FoodReady(_) => message_types::KITCHEN_ORDER_UPDATED,
        }
    }

    /// Encodes the payload as JSON.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            DomainEvent::ItemOrderedForDrink(e) | DomainEvent::ItemOrderedForFood(e) => {
                serde_json::to_vec(e)
            }
            DomainEvent::DrinkReady(e) | DomainEvent::FoodReady(e) => serde_json::to_vec(e),
        }
    }

    /// Decodes a payload given the type tag it was delivered with.
    pub fn decode(message_type: &str, body: &[u8]) -> Result<Self, EventDecodeError> {
        let event = match message_type {
            message_types::BARISTA_ORDER_CREATED => {
                DomainEvent::ItemOrderedForDrink(serde_json::from_slice(body)?)
            }
            message_types::KITCHEN_ORDER_CREATED => {
                DomainEvent::ItemOrderedForFood(serde_json::from_slice(body)?)
            }
            message_types::BARISTA_ORDER_UPDATED => {
                DomainEvent::DrinkReady(serde_json::from_slice(body)?)
            }
            message_types::KITCHEN_ORDER_UPDATED => {
                DomainEvent::FoodReady(serde_json::from_slice(body)?)
            }
            other => return Err(EventDecodeError::UnknownMessageType(other.to_string())),
        };
        Ok(event)
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            DomainEvent::ItemOrderedForDrink(e) | DomainEvent::ItemOrderedForFood(e) => e.order_id,
            DomainEvent::DrinkReady(e) | DomainEvent::FoodReady(e) => e.order_id,
        }
    }

    pub fn line_item_id(&self) -> LineItemId {
        match self {
            DomainEvent::ItemOrderedForDrink(e) | DomainEvent::ItemOrderedForFood(e) => {
                e.line_item_id
            }
            DomainEvent::DrinkReady(e) | DomainEvent::FoodReady(e) => e.line_item_id,
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            DomainEvent::ItemOrderedForDrink(e) | DomainEvent::ItemOrderedForFood(e) => e.item_type,
            DomainEvent::DrinkReady(e) | DomainEvent::FoodReady(e) => e.item_type,
        }
    }
}
