//! Delivery handlers that decode by type tag and dispatch to a reducer.
//!
//! A type tag nobody here understands is an error like any other, so the
//! worker pool rejects the delivery instead of leaving it unsettled.

use async_trait::async_trait;
use common::DomainEvent;
use domain::{OrderRepository, PreparationRepository, ProductCatalog};
use messaging::{Delivery, DeliveryHandler, Publisher};
use tracing::warn;

use crate::SagaError;
use crate::handlers::{ItemOrderedHandler, ItemReadyHandler};

fn decode(delivery: &Delivery) -> Result<DomainEvent, SagaError> {
    DomainEvent::decode(delivery.message_type(), &delivery.body).map_err(|e| {
        warn!(
            message_type = delivery.message_type(),
            message_id = delivery.message_id.as_deref().unwrap_or_default(),
            error = %e,
            "Undecodable delivery"
        );
        SagaError::from(e)
    })
}

/// Consumes the drink-ready and food-ready queues at the counter.
pub struct CounterRouter<R, C> {
    ready: ItemReadyHandler<R, C>,
}

impl<R, C> CounterRouter<R, C> {
    pub fn new(ready: ItemReadyHandler<R, C>) -> Self {
        Self { ready }
    }
}

#[async_trait]
impl<R: OrderRepository, C: ProductCatalog> DeliveryHandler for CounterRouter<R, C> {
    type Error = SagaError;

    async fn handle(&self, delivery: &Delivery) -> Result<(), SagaError> {
        let event = decode(delivery)?;
        self.ready.handle(&event).await.map(|_| ())
    }
}

/// Consumes a station's "ordered" queue at the barista or kitchen.
pub struct StationRouter<R, P> {
    ordered: ItemOrderedHandler<R, P>,
}

impl<R, P> StationRouter<R, P> {
    pub fn new(ordered: ItemOrderedHandler<R, P>) -> Self {
        Self { ordered }
    }
}

#[async_trait]
impl<R, P> DeliveryHandler for StationRouter<R, P>
where
    R: PreparationRepository,
    P: Publisher + 'static,
{
    type Error = SagaError;

    async fn handle(&self, delivery: &Delivery) -> Result<(), SagaError> {
        let event = decode(delivery)?;
        self.ordered.handle(&event).await.map(|_| ())
    }
}
