//! Preparation records kept by the barista and the kitchen.
//!
//! A record shares its id with the counter's line item, which is how the
//! three stores are correlated.

use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{DomainEvent, ItemOrdered, ItemReady, ItemType, LineItemId, OrderId};
use thiserror::Error;

/// A station that prepares line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Station {
    Barista,
    Kitchen,
}

impl Station {
    pub fn name(&self) -> &'static str {
        match self {
            Station::Barista => "barista",
            Station::Kitchen => "kitchen",
        }
    }

    /// Drinks go to the barista, food to the kitchen.
    pub fn accepts(&self, item_type: ItemType) -> bool {
        match self {
            Station::Barista => item_type.is_drink(),
            Station::Kitchen => !item_type.is_drink(),
        }
    }

    /// Unscaled time it takes to prepare an item.
    pub fn preparation_time(&self, item_type: ItemType) -> Duration {
        let secs = match (self, item_type) {
            (Station::Barista, ItemType::CoffeeBlack | ItemType::CoffeeWithRoom) => 5,
            (Station::Barista, ItemType::Espresso | ItemType::EspressoDouble) => 7,
            (Station::Barista, ItemType::Cappuccino) => 10,
            (Station::Kitchen, ItemType::Croissant | ItemType::CroissantChocolate) => 7,
            (Station::Kitchen, ItemType::CakePop) => 5,
            (Station::Kitchen, ItemType::Muffin) => 7,
            _ => 3,
        };
        Duration::from_secs(secs)
    }

    fn ready_event(&self, ready: ItemReady) -> DomainEvent {
        match self {
            Station::Barista => DomainEvent::DrinkReady(ready),
            Station::Kitchen => DomainEvent::FoodReady(ready),
        }
    }
}

impl std::fmt::Display for Station {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors that can occur while preparing an item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreparationError {
    #[error("{station} does not prepare {item_type}")]
    WrongStation { station: Station, item_type: ItemType },
}

/// A prepared item as recorded by the station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparationOrder {
    /// Same as the counter's line item id.
    pub id: LineItemId,
    pub order_id: OrderId,
    pub item_name: String,
    pub item_type: ItemType,
    pub time_up: DateTime<Utc>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl PreparationOrder {
    /// Records a finished item and builds the event that reports it.
    ///
    /// `time_in` is when preparation started, `time_up` when it finished.
    pub fn prepare(
        ordered: &ItemOrdered,
        station: Station,
        made_by: &str,
        time_in: DateTime<Utc>,
        time_up: DateTime<Utc>,
    ) -> Result<(PreparationOrder, DomainEvent), PreparationError> {
        if !station.accepts(ordered.item_type) {
            return Err(PreparationError::WrongStation {
                station,
                item_type: ordered.item_type,
            });
        }

        let now = Utc::now();
        let name = ordered.item_type.name().to_string();

        let record = PreparationOrder {
            id: ordered.line_item_id,
            order_id: ordered.order_id,
            item_name: name.clone(),
            item_type: ordered.item_type,
            time_up,
            created: now,
            updated: now,
        };

        let event = station.ready_event(ItemReady {
            order_id: ordered.order_id,
            line_item_id: ordered.line_item_id,
            name,
            item_type: ordered.item_type,
            made_by: made_by.to_string(),
            time_in,
            time_up,
        });

        Ok((record, event))
    }
}
