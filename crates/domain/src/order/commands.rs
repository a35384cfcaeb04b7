//! Order commands.

use common::{ItemType, Location, LoyaltyMemberId, OrderSource};

use super::OrderError;

/// Command to place a new order at the counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub order_source: OrderSource,

    pub location: Location,

    /// Raw member id as submitted; must parse as a UUID.
    pub loyalty_member_id: String,

    /// Items for the barista.
    pub drink_items: Vec<ItemType>,

    /// Items for the kitchen.
    pub food_items: Vec<ItemType>,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command without items.
    pub fn new(
        order_source: OrderSource,
        location: Location,
        loyalty_member_id: impl Into<String>,
    ) -> Self {
        Self {
            order_source,
            location,
            loyalty_member_id: loyalty_member_id.into(),
            drink_items: Vec::new(),
            food_items: Vec::new(),
        }
    }

    pub fn with_drink(mut self, item_type: ItemType) -> Self {
        self.drink_items.push(item_type);
        self
    }

    pub fn with_food(mut self, item_type: ItemType) -> Self {
        self.food_items.push(item_type);
        self
    }

    /// Parses the loyalty member id.
    pub fn loyalty_member_id(&self) -> Result<LoyaltyMemberId, OrderError> {
        self.loyalty_member_id
            .parse()
            .map_err(|_| OrderError::InvalidLoyaltyMemberId(self.loyalty_member_id.clone()))
    }

    /// Total number of requested items.
    pub fn item_count(&self) -> usize {
        self.drink_items.len() + self.food_items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_items_per_station() {
        let cmd = PlaceOrder::new(
            OrderSource::Counter,
            Location::Atlanta,
            "c3b2a1d0-0000-4000-8000-000000000001",
        )
        .with_drink(ItemType::Latte)
        .with_food(ItemType::Muffin)
        .with_drink(ItemType::Espresso);

        assert_eq!(cmd.drink_items, vec![ItemType::Latte, ItemType::Espresso]);
        assert_eq!(cmd.food_items, vec![ItemType::Muffin]);
        assert_eq!(cmd.item_count(), 3);
    }

    #[test]
    fn test_loyalty_member_id_must_be_uuid() {
        let cmd = PlaceOrder::new(OrderSource::Web, Location::Raleigh, "member-42");
        assert_eq!(
            cmd.loyalty_member_id(),
            Err(OrderError::InvalidLoyaltyMemberId("member-42".to_string()))
        );

        let cmd = PlaceOrder::new(
            OrderSource::Web,
            Location::Raleigh,
            "c3b2a1d0-0000-4000-8000-000000000001",
        );
        assert!(cmd.loyalty_member_id().is_ok());
    }
}
