use std::sync::Arc;

use common::DomainEvent;
use domain::{Order, OrderRepository, OrderService, PlaceOrder, ProductCatalog};
use messaging::Publisher;
use tracing::{error, info};

use crate::{Result, SagaError};

/// Places an order at the counter and hands its items to the stations.
///
/// The order is persisted before anything is published. There is no outbox:
/// if a publish fails the order stays stored with some items never sent, and
/// the error names how many went out.
pub struct PlaceOrderHandler<R, C, P> {
    orders: Arc<OrderService<R, C>>,
    drink_publisher: P,
    food_publisher: P,
}

impl<R, C, P> PlaceOrderHandler<R, C, P>
where
    R: OrderRepository,
    C: ProductCatalog,
    P: Publisher,
{
    pub fn new(orders: Arc<OrderService<R, C>>, drink_publisher: P, food_publisher: P) -> Self {
        Self {
            orders,
            drink_publisher,
            food_publisher,
        }
    }

    pub fn orders(&self) -> &Arc<OrderService<R, C>> {
        &self.orders
    }

    #[tracing::instrument(skip(self, cmd), fields(location = %cmd.location, items = cmd.item_count()))]
    pub async fn handle(&self, cmd: PlaceOrder) -> Result<Order> {
        let (order, events) = self.orders.place_order(cmd).await?;

        let total = events.len();
        for (published, event) in events.iter().enumerate() {
            let publisher = match event {
                DomainEvent::ItemOrderedForDrink(_) => &self.drink_publisher,
                _ => &self.food_publisher,
            };

            if let Err(source) = publisher.publish_event(event).await {
                error!(
                    order_id = %order.id(),
                    published,
                    total,
                    error = %source,
                    "Order persisted but not fully published, it will not be fulfilled"
                );
                metrics::counter!("orders_unpublished_total").increment(1);
                return Err(SagaError::Unpublished {
                    order_id: order.id(),
                    published,
                    total,
                    source,
                });
            }

            metrics::counter!("order_events_published_total", "message_type" => event.message_type())
                .increment(1);
        }

        info!(order_id = %order.id(), events = total, "Order handed to stations");
        Ok(order)
    }
}
