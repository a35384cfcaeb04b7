//! Order service: the counter's use cases over the catalog and repository.

use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use common::{DomainEvent, ItemReady, OrderId};
use tracing::{debug, info};

use crate::catalog::{CatalogItem, ProductCatalog};
use crate::error::DomainError;
use crate::preparation::Station;
use crate::repository::OrderRepository;

use super::{Order, PlaceOrder, UpdateOutcome};

const DEFAULT_CONFLICT_RETRIES: usize = 5;

/// Service for managing orders at the counter.
pub struct OrderService<R, C> {
    repository: R,
    catalog: C,
    conflict_retries: usize,
}

impl<R: OrderRepository, C: ProductCatalog> OrderService<R, C> {
    /// Creates a new order service.
    pub fn new(repository: R, catalog: C) -> Self {
        Self {
            repository,
            catalog,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Sets how often a lost update race is retried before giving up.
    pub fn with_conflict_retries(mut self, retries: usize) -> Self {
        self.conflict_retries = retries;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Validates and prices the order, then persists it.
    ///
    /// Returns the stored order and the events the caller must publish. On
    /// any failure nothing is persisted.
    #[tracing::instrument(skip(self, cmd), fields(items = cmd.item_count()))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<(Order, Vec<DomainEvent>), DomainError> {
        // Fail on a bad member id before calling out to the catalog.
        cmd.loyalty_member_id()?;

        let drink_menu = self.lookup(&cmd, true).await?;
        let food_menu = self.lookup(&cmd, false).await?;

        let (order, events) = Order::place(&cmd, &drink_menu, &food_menu)?;
        self.repository.create(&order).await?;

        metrics::counter!("orders_placed_total").increment(1);
        info!(order_id = %order.id(), line_items = order.line_items().len(), "Order placed");

        Ok((order, events))
    }

    async fn lookup(&self, cmd: &PlaceOrder, is_barista: bool) -> Result<Vec<CatalogItem>, DomainError> {
        let items = if is_barista { &cmd.drink_items } else { &cmd.food_items };
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.catalog.get_items_by_type(items, is_barista).await
    }

    /// Applies a "ready" event reported by `station` to its order.
    ///
    /// Load, apply and update run again from scratch when another update to
    /// the same order won the race.
    #[tracing::instrument(skip(self, ready), fields(order_id = %ready.order_id, line_item_id = %ready.line_item_id, %station))]
    pub async fn apply_ready(&self, ready: &ItemReady, station: Station) -> Result<Order, DomainError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(500))
            .with_max_times(self.conflict_retries)
            .with_jitter();

        let (order, outcome) = (|| self.try_apply(ready, station))
            .retry(backoff)
            .when(DomainError::is_conflict)
            .notify(|err: &DomainError, delay: Duration| {
                debug!(error = %err, delay = ?delay, "Order changed concurrently, retrying");
            })
            .await?;

        match outcome {
            UpdateOutcome::OrderFulfilled => {
                metrics::counter!("orders_fulfilled_total").increment(1);
                info!(order_id = %order.id(), "Order fulfilled");
            }
            UpdateOutcome::LineItemFulfilled => {
                debug!(order_id = %order.id(), "Line item fulfilled");
            }
            UpdateOutcome::Unchanged => {
                debug!(order_id = %order.id(), "Ready event already applied");
            }
        }

        Ok(order)
    }

    async fn try_apply(
        &self,
        ready: &ItemReady,
        station: Station,
    ) -> Result<(Order, UpdateOutcome), DomainError> {
        let mut order = self.repository.get_by_id(ready.order_id).await?;
        let outcome = order.apply_update(ready, station)?;
        if outcome == UpdateOutcome::Unchanged {
            return Ok((order, outcome));
        }
        let order = self.repository.update(&order).await?;
        Ok((order, outcome))
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        Ok(self.repository.get_by_id(order_id).await?)
    }

    /// Lists every order with its fulfillment state, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        Ok(self.repository.get_all().await?)
    }

    /// Lists the sellable item types and their prices.
    pub async fn item_types(&self) -> Result<Vec<CatalogItem>, DomainError> {
        self.catalog.get_all().await
    }
}
