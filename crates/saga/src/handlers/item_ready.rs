use std::sync::Arc;

use common::DomainEvent;
use domain::{Order, OrderRepository, OrderService, ProductCatalog, Station};

use crate::{Result, SagaError};

/// Folds a drink or food "ready" event into its order at the counter.
///
/// A `DrinkReady` may only close a drink line and a `FoodReady` a food line.
pub struct ItemReadyHandler<R, C> {
    orders: Arc<OrderService<R, C>>,
}

impl<R: OrderRepository, C: ProductCatalog> ItemReadyHandler<R, C> {
    pub fn new(orders: Arc<OrderService<R, C>>) -> Self {
        Self { orders }
    }

    #[tracing::instrument(skip(self, event), fields(message_type = event.message_type(), order_id = %event.order_id()))]
    pub async fn handle(&self, event: &DomainEvent) -> Result<Order> {
        match event {
            DomainEvent::DrinkReady(ready) => {
                Ok(self.orders.apply_ready(ready, Station::Barista).await?)
            }
            DomainEvent::FoodReady(ready) => {
                Ok(self.orders.apply_ready(ready, Station::Kitchen).await?)
            }
            other => Err(SagaError::UnexpectedEvent {
                expected: "a drink or food ready event",
                actual: other.message_type(),
            }),
        }
    }
}

