//! Persistence ports and in-memory adapters.
//!
//! Order updates use optimistic concurrency: `update` only succeeds if the
//! stored version still equals the version the order was loaded with, and
//! bumps it by one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{LineItemId, OrderId};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{Order, PreparationOrder};

/// Errors raised by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} already exists: {id}")]
    Duplicate { entity: &'static str, id: String },

    /// The order changed since it was loaded.
    #[error("Concurrency conflict for order {order_id}: expected version {expected}, found {actual}")]
    Conflict {
        order_id: OrderId,
        expected: i64,
        actual: i64,
    },

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    pub fn order_not_found(id: OrderId) -> Self {
        RepositoryError::NotFound {
            entity: "order",
            id: id.to_string(),
        }
    }
}

/// Counter-side order storage.
#[async_trait]
pub trait OrderRepository: Send + Sync + 'static {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: OrderId) -> Result<Order, RepositoryError>;

    /// Persists the order and its line items, returning it with its new version.
    async fn update(&self, order: &Order) -> Result<Order, RepositoryError>;

    async fn get_all(&self) -> Result<Vec<Order>, RepositoryError>;
}

/// Barista or kitchen preparation storage.
#[async_trait]
pub trait PreparationRepository: Send + Sync + 'static {
    async fn create(&self, order: &PreparationOrder) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, id: LineItemId) -> Result<PreparationOrder, RepositoryError>;

    async fn get_all(&self) -> Result<Vec<PreparationOrder>, RepositoryError>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, Order>,
    fail_on_write: bool,
}

/// In-memory order repository for testing and broker-only deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail until reset.
    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

fn unavailable() -> RepositoryError {
    RepositoryError::Backend("storage unavailable".into())
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;

        if state.fail_on_write {
            return Err(unavailable());
        }
        if state.orders.contains_key(&order.id()) {
            return Err(RepositoryError::Duplicate {
                entity: "order",
                id: order.id().to_string(),
            });
        }

        state.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: OrderId) -> Result<Order, RepositoryError> {
        self.state
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::order_not_found(id))
    }

    async fn update(&self, order: &Order) -> Result<Order, RepositoryError> {
        let mut state = self.state.write().await;

        if state.fail_on_write {
            return Err(unavailable());
        }

        let stored = state
            .orders
            .get_mut(&order.id())
            .ok_or_else(|| RepositoryError::order_not_found(order.id()))?;

        if stored.version() != order.version() {
            return Err(RepositoryError::Conflict {
                order_id: order.id(),
                expected: order.version(),
                actual: stored.version(),
            });
        }

        let mut updated = order.clone();
        updated.set_version(order.version() + 1);
        *stored = updated.clone();
        Ok(updated)
    }

    async fn get_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self.state.read().await.orders.values().cloned().collect();
        orders.sort_by_key(|order| order.created_at());
        Ok(orders)
    }
}

#[derive(Debug, Default)]
struct InMemoryPreparationState {
    orders: HashMap<LineItemId, PreparationOrder>,
    fail_on_write: bool,
}

/// In-memory preparation repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPreparationRepository {
    state: Arc<RwLock<InMemoryPreparationState>>,
}

impl InMemoryPreparationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_write(&self, fail: bool) {
        self.state.write().await.fail_on_write = fail;
    }

    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl PreparationRepository for InMemoryPreparationRepository {
    async fn create(&self, order: &PreparationOrder) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;

        if state.fail_on_write {
            return Err(unavailable());
        }
        if state.orders.contains_key(&order.id) {
            return Err(RepositoryError::Duplicate {
                entity: "preparation order",
                id: order.id.to_string(),
            });
        }

        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: LineItemId) -> Result<PreparationOrder, RepositoryError> {
        self.state
            .read()
            .await
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "preparation order",
                id: id.to_string(),
            })
    }

    async fn get_all(&self) -> Result<Vec<PreparationOrder>, RepositoryError> {
        let mut orders: Vec<_> = self.state.read().await.orders.values().cloned().collect();
        orders.sort_by_key(|order| order.created);
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{ItemOrdered, ItemType, Location, OrderSource};

    use super::*;
    use crate::{InMemoryProductCatalog, PlaceOrder, Station};

    fn new_order() -> Order {
        let catalog = InMemoryProductCatalog::new();
        let cmd = PlaceOrder::new(
            OrderSource::Counter,
            Location::Atlanta,
            "6f0d2b4e-58a5-4a1e-9c36-3b1f6e0c7d21",
        )
        .with_drink(ItemType::Latte);
        Order::place(&cmd, &catalog.menu(true), &catalog.menu(false))
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = InMemoryOrderRepository::new();
        let order = new_order();

        repo.create(&order).await.unwrap();

        assert_eq!(repo.get_by_id(order.id()).await.unwrap(), order);
        assert_eq!(repo.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_twice_is_duplicate() {
        let repo = InMemoryOrderRepository::new();
        let order = new_order();

        repo.create(&order).await.unwrap();
        let result = repo.create(&order).await;

        assert!(matches!(result, Err(RepositoryError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_get_missing_order() {
        let repo = InMemoryOrderRepository::new();
        let result = repo.get_by_id(OrderId::new()).await;
        assert!(matches!(result, Err(RepositoryError::NotFound { entity: "order", .. })));
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = InMemoryOrderRepository::new();
        let order = new_order();
        repo.create(&order).await.unwrap();

        let updated = repo.update(&order).await.unwrap();
        assert_eq!(updated.version(), 1);
        assert_eq!(repo.get_by_id(order.id()).await.unwrap().version(), 1);
    }

    #[tokio::test]
    async fn test_stale_update_conflicts() {
        let repo = InMemoryOrderRepository::new();
        let order = new_order();
        repo.create(&order).await.unwrap();

        let first = repo.get_by_id(order.id()).await.unwrap();
        let second = repo.get_by_id(order.id()).await.unwrap();

        repo.update(&first).await.unwrap();
        let result = repo.update(&second).await;

        match result {
            Err(RepositoryError::Conflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fail_on_write() {
        let repo = InMemoryOrderRepository::new();
        repo.set_fail_on_write(true).await;

        let result = repo.create(&new_order()).await;

        assert!(matches!(result, Err(RepositoryError::Backend(_))));
        assert_eq!(repo.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_preparation_rows_are_keyed_by_line_item() {
        let repo = InMemoryPreparationRepository::new();
        let now = Utc::now();
        let ordered = ItemOrdered {
            order_id: OrderId::new(),
            line_item_id: LineItemId::new(),
            item_type: ItemType::Muffin,
        };
        let (record, _) =
            PreparationOrder::prepare(&ordered, Station::Kitchen, "kitchen", now, now).unwrap();

        repo.create(&record).await.unwrap();

        assert_eq!(repo.get_by_id(ordered.line_item_id).await.unwrap(), record);
        assert!(matches!(
            repo.create(&record).await,
            Err(RepositoryError::Duplicate { .. })
        ));
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }
}
