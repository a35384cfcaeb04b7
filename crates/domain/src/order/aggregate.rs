//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{
    DomainEvent, ItemReady, ItemType, LineItemId, Location, LoyaltyMemberId, Money, OrderId,
    OrderSource, Status,
};
use crate::catalog::CatalogItem;
use crate::preparation::Station;

use super::{LineItem, OrderError, PlaceOrder};

/// Order aggregate root.
///
/// Invariant: the status is `Fulfilled` exactly when every line item is
/// `Fulfilled`, and once there it never moves back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,

    /// Current version for optimistic concurrency.
    version: i64,

    order_source: OrderSource,

    loyalty_member_id: LoyaltyMemberId,

    status: Status,

    location: Location,

    line_items: Vec<LineItem>,

    created_at: DateTime<Utc>,

    updated_at: DateTime<Utc>,
}

/// Stored state of an order, used by repositories to rebuild the aggregate.
#[derive(Debug, Clone)]
pub struct OrderParts {
    pub id: OrderId,
    pub version: i64,
    pub order_source: OrderSource,
    pub loyalty_member_id: LoyaltyMemberId,
    pub status: Status,
    pub location: Location,
    pub line_items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What applying a ready event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing to do: the item was already fulfilled or the order is empty.
    Unchanged,
    /// The line item is done, others are still being prepared.
    LineItemFulfilled,
    /// The last outstanding line item is done.
    OrderFulfilled,
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Sets the version. Repositories call this after a successful write.
    pub fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    pub fn order_source(&self) -> OrderSource {
        self.order_source
    }

    pub fn loyalty_member_id(&self) -> LoyaltyMemberId {
        self.loyalty_member_id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Line items in the order they were requested, drinks first.
    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn line_item(&self, id: LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|item| item.id == id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sum of the line item prices.
    pub fn total(&self) -> Money {
        self.line_items.iter().map(|item| item.price).sum()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.status.is_fulfilled()
    }
}

// Command methods
impl Order {
    /// Places a new order.
    ///
    /// Prices come from the catalog answers for the drink and food menus.
    /// Returns the order in status `InProcess` together with one "ordered"
    /// event per line item. Nothing is built if any item fails validation.
    pub fn place(
        cmd: &PlaceOrder,
        drink_menu: &[CatalogItem],
        food_menu: &[CatalogItem],
    ) -> Result<(Order, Vec<DomainEvent>), OrderError> {
        let loyalty_member_id = cmd.loyalty_member_id()?;

        if cmd.item_count() == 0 {
            return Err(OrderError::NoItems);
        }

        let now = Utc::now();
        let mut order = Order {
            id: OrderId::new(),
            version: 0,
            order_source: cmd.order_source,
            loyalty_member_id,
            status: Status::InProcess,
            location: cmd.location,
            line_items: Vec::with_capacity(cmd.item_count()),
            created_at: now,
            updated_at: now,
        };

        let mut events = Vec::with_capacity(cmd.item_count());

        for item_type in &cmd.drink_items {
            let ordered = order.add_line_item(*item_type, drink_menu, true)?;
            events.push(DomainEvent::ItemOrderedForDrink(ordered));
        }

        for item_type in &cmd.food_items {
            let ordered = order.add_line_item(*item_type, food_menu, false)?;
            events.push(DomainEvent::ItemOrderedForFood(ordered));
        }

        Ok((order, events))
    }

    fn add_line_item(
        &mut self,
        item_type: ItemType,
        menu: &[CatalogItem],
        is_barista_line: bool,
    ) -> Result<common::ItemOrdered, OrderError> {
        let unknown = OrderError::UnknownItem {
            item_type,
            menu: if is_barista_line { "drink" } else { "food" },
        };

        if item_type.is_drink() != is_barista_line {
            return Err(unknown);
        }

        let price = menu
            .iter()
            .find(|entry| entry.item_type == item_type)
            .map(|entry| entry.price)
            .ok_or(unknown)?;

        let line_item = LineItem::new(self.id, item_type, price, is_barista_line);
        let ordered = line_item.ordered();
        self.line_items.push(line_item);
        Ok(ordered)
    }

    /// Marks the line item named by a ready event from `station` as fulfilled.
    ///
    /// The line item is matched by id, and must have been ordered from
    /// `station` with the item type the event reports. Applying the same
    /// event again changes nothing. An order without line items ignores the
    /// event.
    pub fn apply_update(
        &mut self,
        ready: &ItemReady,
        station: Station,
    ) -> Result<UpdateOutcome, OrderError> {
        if self.line_items.is_empty() {
            return Ok(UpdateOutcome::Unchanged);
        }

        let order_id = self.id;
        let item = self
            .line_items
            .iter_mut()
            .find(|item| item.id == ready.line_item_id)
            .ok_or(OrderError::ItemNotFound {
                order_id,
                line_item_id: ready.line_item_id,
            })?;

        if item.item_type != ready.item_type || item.station() != station {
            return Err(OrderError::ItemMismatch {
                line_item_id: item.id,
                expected: item.item_type,
                expected_station: item.station(),
                actual: ready.item_type,
                station,
            });
        }

        if item.is_fulfilled() {
            return Ok(UpdateOutcome::Unchanged);
        }

        item.status = Status::Fulfilled;
        self.updated_at = Utc::now();

        if self.line_items.iter().all(LineItem::is_fulfilled) {
            self.status = Status::Fulfilled;
            return Ok(UpdateOutcome::OrderFulfilled);
        }

        Ok(UpdateOutcome::LineItemFulfilled)
    }

    /// Rebuilds an order from stored state.
    pub fn restore(parts: OrderParts) -> Self {
        Self {
            id: parts.id,
            version: parts.version,
            order_source: parts.order_source,
            loyalty_member_id: parts.loyalty_member_id,
            status: parts.status,
            location: parts.location,
            line_items: parts.line_items,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryProductCatalog;

    const MEMBER: &str = "6f0d2b4e-58a5-4a1e-9c36-3b1f6e0c7d21";

    fn menus() -> (Vec<CatalogItem>, Vec<CatalogItem>) {
        let catalog = InMemoryProductCatalog::new();
        (catalog.menu(true), catalog.menu(false))
    }

    fn place(cmd: PlaceOrder) -> Result<(Order, Vec<DomainEvent>), OrderError> {
        let (drinks, food) = menus();
        Order::place(&cmd, &drinks, &food)
    }

    fn ready_for(order: &Order, line_item_id: LineItemId) -> ItemReady {
        let item = order.line_item(line_item_id).unwrap();
        let now = Utc::now();
        ItemReady {
            order_id: order.id(),
            line_item_id,
            name: item.name.clone(),
            item_type: item.item_type,
            made_by: "station".to_string(),
            time_in: now,
            time_up: now,
        }
    }

    #[test]
    fn test_place_emits_one_event_per_line_item() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
            .with_drink(ItemType::Espresso)
            .with_drink(ItemType::Latte)
            .with_food(ItemType::Croissant);

        let (order, events) = place(cmd).unwrap();

        assert_eq!(order.status(), Status::InProcess);
        assert_eq!(order.line_items().len(), 3);
        assert_eq!(events.len(), 3);
        assert_eq!(order.version(), 0);

        for (item, event) in order.line_items().iter().zip(&events) {
            assert_eq!(event.line_item_id(), item.id);
            assert_eq!(event.item_type(), item.item_type);
            assert_eq!(event.order_id(), order.id());
            assert_eq!(item.status, Status::InProcess);
        }
        assert!(matches!(events[0], DomainEvent::ItemOrderedForDrink(_)));
        assert!(matches!(events[2], DomainEvent::ItemOrderedForFood(_)));
    }

    #[test]
    fn test_place_uses_catalog_prices() {
        let cmd = PlaceOrder::new(OrderSource::Web, Location::Charlotte, MEMBER)
            .with_drink(ItemType::Cappuccino)
            .with_food(ItemType::Croissant);

        let (order, _) = place(cmd).unwrap();

        assert_eq!(order.line_items()[0].price, Money::from_cents(450));
        assert_eq!(order.line_items()[0].name, "CAPPUCCINO");
        assert!(order.line_items()[0].is_barista_line);
        assert_eq!(order.line_items()[1].price, Money::from_cents(325));
        assert!(!order.line_items()[1].is_barista_line);
        assert_eq!(order.total(), Money::from_cents(775));
    }

    #[test]
    fn test_place_rejects_invalid_member() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, "not-a-uuid")
            .with_drink(ItemType::Latte);
        assert!(matches!(place(cmd), Err(OrderError::InvalidLoyaltyMemberId(_))));
    }

    #[test]
    fn test_place_rejects_empty_order() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER);
        assert_eq!(place(cmd).unwrap_err(), OrderError::NoItems);
    }

    #[test]
    fn test_place_rejects_food_on_drink_menu() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
            .with_drink(ItemType::Muffin);
        assert_eq!(
            place(cmd).unwrap_err(),
            OrderError::UnknownItem {
                item_type: ItemType::Muffin,
                menu: "drink"
            }
        );
    }

    #[test]
    fn test_place_rejects_item_missing_from_catalog() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
            .with_food(ItemType::CakePop);
        let result = Order::place(&cmd, &[], &[]);
        assert!(matches!(result, Err(OrderError::UnknownItem { .. })));
    }

    #[test]
    fn test_single_item_fulfills_order() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
            .with_drink(ItemType::Espresso);
        let (mut order, events) = place(cmd).unwrap();

        let ready = ready_for(&order, events[0].line_item_id());
        assert_eq!(
            order.apply_update(&ready, Station::Barista),
            Ok(UpdateOutcome::OrderFulfilled)
        );

        assert_eq!(order.status(), Status::Fulfilled);
        assert!(order.line_items()[0].is_fulfilled());
    }

    #[test]
    fn test_order_waits_for_every_item_in_any_order() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Raleigh, MEMBER)
            .with_drink(ItemType::Latte)
            .with_food(ItemType::Muffin)
            .with_food(ItemType::CakePop);
        let (order, _) = place(cmd).unwrap();
        let ids: Vec<_> = order.line_items().iter().map(|item| item.id).collect();

        for sequence in [[0, 1, 2], [2, 0, 1], [1, 2, 0]] {
            let mut order = order.clone();
            for (step, index) in sequence.iter().enumerate() {
                let ready = ready_for(&order, ids[*index]);
                let station = order.line_item(ids[*index]).unwrap().station();
                let outcome = order.apply_update(&ready, station).unwrap();
                if step < 2 {
                    assert_eq!(outcome, UpdateOutcome::LineItemFulfilled);
                    assert_eq!(order.status(), Status::InProcess);
                } else {
                    assert_eq!(outcome, UpdateOutcome::OrderFulfilled);
                    assert_eq!(order.status(), Status::Fulfilled);
                }
            }
        }
    }

    #[test]
    fn test_repeated_update_changes_nothing() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
            .with_drink(ItemType::Latte);
        let (mut order, events) = place(cmd).unwrap();
        let ready = ready_for(&order, events[0].line_item_id());

        order.apply_update(&ready, Station::Barista).unwrap();
        let snapshot = order.clone();

        assert_eq!(order.apply_update(&ready, Station::Barista), Ok(UpdateOutcome::Unchanged));
        assert_eq!(order, snapshot);
        assert_eq!(order.status(), Status::Fulfilled);
    }

    #[test]
    fn test_same_type_items_are_told_apart_by_id() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
            .with_drink(ItemType::Latte)
            .with_drink(ItemType::Latte);
        let (mut order, events) = place(cmd).unwrap();
        let second = events[1].line_item_id();

        order.apply_update(&ready_for(&order, second), Station::Barista).unwrap();

        assert!(!order.line_items()[0].is_fulfilled());
        assert!(order.line_items()[1].is_fulfilled());
        assert_eq!(order.status(), Status::InProcess);
    }

    #[test]
    fn test_unknown_line_item_is_reported() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
            .with_drink(ItemType::Latte);
        let (mut order, events) = place(cmd).unwrap();
        let mut ready = ready_for(&order, events[0].line_item_id());
        ready.line_item_id = LineItemId::new();

        assert!(matches!(
            order.apply_update(&ready, Station::Barista),
            Err(OrderError::ItemNotFound { .. })
        ));
        assert_eq!(order.status(), Status::InProcess);
    }

    #[test]
    fn test_empty_order_ignores_updates() {
        let now = Utc::now();
        let mut order = Order::restore(OrderParts {
            id: OrderId::new(),
            version: 3,
            order_source: OrderSource::Web,
            loyalty_member_id: LoyaltyMemberId::new(),
            status: Status::InProcess,
            location: Location::Atlanta,
            line_items: vec![],
            created_at: now,
            updated_at: now,
        });
        let ready = ItemReady {
            order_id: order.id(),
            line_item_id: LineItemId::new(),
            name: "LATTE".to_string(),
            item_type: ItemType::Latte,
            made_by: "station".to_string(),
            time_in: now,
            time_up: now,
        };

        assert_eq!(order.apply_update(&ready, Station::Barista), Ok(UpdateOutcome::Unchanged));
        assert_eq!(order.version(), 3);
    }

    #[test]
    fn test_update_from_the_wrong_station_is_refused() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
            .with_food(ItemType::Muffin);
        let (mut order, events) = place(cmd).unwrap();
        let ready = ready_for(&order, events[0].line_item_id());

        let err = order.apply_update(&ready, Station::Barista).unwrap_err();

        assert_eq!(
            err,
            OrderError::ItemMismatch {
                line_item_id: events[0].line_item_id(),
                expected: ItemType::Muffin,
                expected_station: Station::Kitchen,
                actual: ItemType::Muffin,
                station: Station::Barista,
            }
        );
        assert_eq!(order.status(), Status::InProcess);
        assert!(!order.line_items()[0].is_fulfilled());
    }

    #[test]
    fn test_update_with_another_item_type_is_refused() {
        let cmd = PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
            .with_food(ItemType::Muffin)
            .with_food(ItemType::CakePop);
        let (mut order, events) = place(cmd).unwrap();
        let mut ready = ready_for(&order, events[0].line_item_id());
        ready.item_type = ItemType::CakePop;
        let snapshot = order.clone();

        assert!(matches!(
            order.apply_update(&ready, Station::Kitchen),
            Err(OrderError::ItemMismatch {
                expected: ItemType::Muffin,
                actual: ItemType::CakePop,
                ..
            })
        ));
        assert_eq!(order, snapshot);
    }
}
