//! Integration tests for the counter's order service.
//!
//! These tests drive `OrderService` over the in-memory ports: placing orders,
//! folding "ready" events back in, and the failure paths around the catalog
//! and the repository.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use common::{DomainEvent, ItemReady, ItemType, Location, OrderId, OrderSource, Status};
use domain::{
    DomainError, InMemoryOrderRepository, InMemoryProductCatalog, Order, OrderError,
    OrderRepository, OrderService, PlaceOrder, RepositoryError, Station,
};

const MEMBER: &str = "6f0d2b4e-58a5-4a1e-9c36-3b1f6e0c7d21";

/// Helper to create a test order service
fn create_service() -> OrderService<InMemoryOrderRepository, InMemoryProductCatalog> {
    OrderService::new(InMemoryOrderRepository::new(), InMemoryProductCatalog::new())
}

fn command() -> PlaceOrder {
    PlaceOrder::new(OrderSource::Counter, Location::Atlanta, MEMBER)
}

fn ready_for(order: &Order, index: usize) -> ItemReady {
    let line = &order.line_items()[index];
    let now = Utc::now();
    ItemReady {
        order_id: order.id(),
        line_item_id: line.id,
        name: line.name.clone(),
        item_type: line.item_type,
        made_by: "barista".to_string(),
        time_in: now,
        time_up: now,
    }
}

fn station_of(order: &Order, index: usize) -> Station {
    order.line_items()[index].station()
}

mod placing_orders {
    use super::*;

    #[tokio::test]
    async fn drink_and_food_order_is_persisted_with_one_event_per_item() {
        let service = create_service();

        let (order, events) = service
            .place_order(
                command()
                    .with_drink(ItemType::Cappuccino)
                    .with_food(ItemType::CakePop),
            )
            .await
            .unwrap();

        assert_eq!(order.status(), Status::InProcess);
        assert_eq!(order.line_items().len(), 2);
        assert_eq!(order.total().cents(), 700);

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DomainEvent::ItemOrderedForDrink(_)));
        assert!(matches!(events[1], DomainEvent::ItemOrderedForFood(_)));
        for (event, line) in events.iter().zip(order.line_items()) {
            assert_eq!(event.order_id(), order.id());
            assert_eq!(event.line_item_id(), line.id);
        }

        let stored = service.get_order(order.id()).await.unwrap();
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn bad_member_id_is_rejected_before_anything_is_stored() {
        let service = create_service();
        let cmd = PlaceOrder::new(OrderSource::Web, Location::Raleigh, "not-a-uuid")
            .with_drink(ItemType::Latte);

        let err = service.place_order(cmd).await.unwrap_err();

        assert!(err.is_validation());
        assert!(matches!(
            err,
            DomainError::Order(OrderError::InvalidLoyaltyMemberId(_))
        ));
        assert_eq!(service.repository().order_count().await, 0);
    }

    #[tokio::test]
    async fn empty_order_is_rejected() {
        let service = create_service();

        let err = service.place_order(command()).await.unwrap_err();

        assert!(matches!(err, DomainError::Order(OrderError::NoItems)));
        assert_eq!(service.repository().order_count().await, 0);
    }

    #[tokio::test]
    async fn food_sent_as_drink_is_rejected() {
        let service = create_service();

        let err = service
            .place_order(command().with_drink(ItemType::Muffin))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Order(OrderError::UnknownItem {
                item_type: ItemType::Muffin,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn catalog_outage_fails_the_order() {
        let service = create_service();
        service.catalog().set_fail_on_lookup(true).await;

        let err = service
            .place_order(command().with_drink(ItemType::Latte))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Catalog(_)));
        assert_eq!(service.repository().order_count().await, 0);
    }

    #[tokio::test]
    async fn storage_outage_fails_the_order() {
        let service = create_service();
        service.repository().set_fail_on_write(true).await;

        let err = service
            .place_order(command().with_food(ItemType::Croissant))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Repository(RepositoryError::Backend(_))
        ));
        assert!(!err.is_validation());
    }

    #[tokio::test]
    async fn orders_are_listed_oldest_first() {
        let service = create_service();

        let (first, _) = service
            .place_order(command().with_drink(ItemType::Espresso))
            .await
            .unwrap();
        let (second, _) = service
            .place_order(command().with_food(ItemType::Muffin))
            .await
            .unwrap();

        let ids: Vec<OrderId> = service
            .list_orders()
            .await
            .unwrap()
            .iter()
            .map(Order::id)
            .collect();
        assert_eq!(ids, vec![first.id(), second.id()]);
    }
}

mod fulfillment {
    use super::*;

    #[tokio::test]
    async fn order_is_fulfilled_once_every_item_is_ready() {
        let service = create_service();
        let (order, _) = service
            .place_order(
                command()
                    .with_drink(ItemType::Latte)
                    .with_food(ItemType::Muffin),
            )
            .await
            .unwrap();

        let after_first = service
            .apply_ready(&ready_for(&order, 0), station_of(&order, 0))
            .await
            .unwrap();
        assert_eq!(after_first.status(), Status::InProcess);
        assert_eq!(after_first.version(), 1);

        let after_second = service
            .apply_ready(&ready_for(&order, 1), station_of(&order, 1))
            .await
            .unwrap();
        assert_eq!(after_second.status(), Status::Fulfilled);
        assert!(after_second.line_items().iter().all(|l| l.is_fulfilled()));
        assert_eq!(after_second.version(), 2);
    }

    #[tokio::test]
    async fn duplicate_ready_event_does_not_write() {
        let service = create_service();
        let (order, _) = service
            .place_order(command().with_drink(ItemType::Latte))
            .await
            .unwrap();
        let ready = ready_for(&order, 0);

        service.apply_ready(&ready, Station::Barista).await.unwrap();
        let again = service.apply_ready(&ready, Station::Barista).await.unwrap();

        assert_eq!(again.status(), Status::Fulfilled);
        assert_eq!(again.version(), 1);
    }

    #[tokio::test]
    async fn ready_event_for_unknown_order_is_not_found() {
        let service = create_service();
        let (order, _) = service
            .place_order(command().with_drink(ItemType::Latte))
            .await
            .unwrap();
        let mut ready = ready_for(&order, 0);
        ready.order_id = OrderId::new();

        let err = service.apply_ready(&ready, Station::Barista).await.unwrap_err();

        assert!(matches!(
            err,
            DomainError::Repository(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn ready_event_for_another_item_is_refused_without_writing() {
        let service = create_service();
        let (order, _) = service
            .place_order(command().with_food(ItemType::Muffin))
            .await
            .unwrap();
        let mut ready = ready_for(&order, 0);
        ready.item_type = ItemType::Latte;

        let err = service
            .apply_ready(&ready, Station::Barista)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::Order(OrderError::ItemMismatch { .. })
        ));
        assert!(!err.is_conflict());
        let stored = service.get_order(order.id()).await.unwrap();
        assert_eq!(stored.status(), Status::InProcess);
        assert_eq!(stored.version(), 0);
    }

    #[tokio::test]
    async fn concurrent_ready_events_are_not_lost() {
        let service = Arc::new(create_service());
        let (order, _) = service
            .place_order(
                command()
                    .with_drink(ItemType::Latte)
                    .with_drink(ItemType::Espresso)
                    .with_food(ItemType::Muffin)
                    .with_food(ItemType::CakePop),
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for index in 0..order.line_items().len() {
            let service = Arc::clone(&service);
            let ready = ready_for(&order, index);
            let station = station_of(&order, index);
            handles.push(tokio::spawn(async move {
                service.apply_ready(&ready, station).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = service.get_order(order.id()).await.unwrap();
        assert_eq!(stored.status(), Status::Fulfilled);
        assert_eq!(stored.version(), 4);
    }
}

/// Repository that loses the version race on its first few updates.
#[derive(Clone)]
struct RacingRepository {
    inner: InMemoryOrderRepository,
    races_left: Arc<AtomicUsize>,
    updates: Arc<AtomicUsize>,
}

impl RacingRepository {
    fn new(races: usize) -> Self {
        Self {
            inner: InMemoryOrderRepository::new(),
            races_left: Arc::new(AtomicUsize::new(races)),
            updates: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl OrderRepository for RacingRepository {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        self.inner.create(order).await
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Order, RepositoryError> {
        self.inner.get_by_id(id).await
    }

    async fn update(&self, order: &Order) -> Result<Order, RepositoryError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let race = self
            .races_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if race {
            // Another writer gets in first with the same snapshot.
            let winner = self.inner.get_by_id(order.id()).await?;
            self.inner.update(&winner).await?;
        }
        self.inner.update(order).await
    }

    async fn get_all(&self) -> Result<Vec<Order>, RepositoryError> {
        self.inner.get_all().await
    }
}

mod concurrency {
    use super::*;

    #[tokio::test]
    async fn lost_race_is_retried_from_a_fresh_load() {
        let repo = RacingRepository::new(2);
        let service = OrderService::new(repo.clone(), InMemoryProductCatalog::new());
        let (order, _) = service
            .place_order(command().with_drink(ItemType::Latte))
            .await
            .unwrap();

        let updated = service
            .apply_ready(&ready_for(&order, 0), station_of(&order, 0))
            .await
            .unwrap();

        assert_eq!(updated.status(), Status::Fulfilled);
        assert_eq!(repo.updates.load(Ordering::SeqCst), 3);
        // Two racing writers plus our own update.
        assert_eq!(updated.version(), 3);
    }

    #[tokio::test]
    async fn conflict_surfaces_once_retries_are_exhausted() {
        let repo = RacingRepository::new(usize::MAX);
        let service = OrderService::new(repo.clone(), InMemoryProductCatalog::new())
            .with_conflict_retries(2);
        let (order, _) = service
            .place_order(command().with_food(ItemType::Croissant))
            .await
            .unwrap();

        let err = service
            .apply_ready(&ready_for(&order, 0), station_of(&order, 0))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(repo.updates.load(Ordering::SeqCst), 3);
    }
}
