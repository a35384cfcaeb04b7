//! Exchanges, queues and type tags of the four event directions.
//!
//! Every direction has its own direct exchange, durable queue and binding
//! key. Drinks and food are ordered through separate exchanges; both "ready"
//! directions go to the counter's exchange, each with its own queue.

use common::message_types;
use domain::Station;
use messaging::{ConsumerConfig, PublisherConfig};

/// One exchange/queue/binding triple plus the type tag sent over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub exchange: &'static str,
    pub queue: &'static str,
    pub routing_key: &'static str,
    pub message_type: &'static str,
    pub consumer_tag: &'static str,
}

/// Counter to barista.
pub const DRINK_ORDERED: Route = Route {
    exchange: "barista-order-exchange",
    queue: "barista-order-queue",
    routing_key: "barista-order-routing-key",
    message_type: message_types::BARISTA_ORDER_CREATED,
    consumer_tag: "barista-order-consumer",
};

/// Counter to kitchen.
pub const FOOD_ORDERED: Route = Route {
    exchange: "kitchen-order-exchange",
    queue: "kitchen-order-queue",
    routing_key: "kitchen-order-routing-key",
    message_type: message_types::KITCHEN_ORDER_CREATED,
    consumer_tag: "kitchen-order-consumer",
};

/// Barista to counter.
pub const DRINK_READY: Route = Route {
    exchange: "counter-order-exchange",
    queue: "counter-barista-order-queue",
    routing_key: "counter-barista-order-routing-key",
    message_type: message_types::BARISTA_ORDER_UPDATED,
    consumer_tag: "counter-barista-order-consumer",
};

/// Kitchen to counter.
pub const FOOD_READY: Route = Route {
    exchange: "counter-order-exchange",
    queue: "counter-kitchen-order-queue",
    routing_key: "counter-kitchen-order-routing-key",
    message_type: message_types::KITCHEN_ORDER_UPDATED,
    consumer_tag: "counter-kitchen-order-consumer",
};

impl Route {
    /// Route on which `station` receives its work.
    pub fn ordered(station: Station) -> Route {
        match station {
            Station::Barista => DRINK_ORDERED,
            Station::Kitchen => FOOD_ORDERED,
        }
    }

    /// Route on which `station` reports finished items.
    pub fn ready(station: Station) -> Route {
        match station {
            Station::Barista => DRINK_READY,
            Station::Kitchen => FOOD_READY,
        }
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig::default()
            .exchange(self.exchange)
            .routing_key(self.routing_key)
            .message_type(self.message_type)
    }

    pub fn consumer_config(
        &self,
        worker_pool_size: usize,
        prefetch_count: u16,
        dead_letter_exchange: Option<String>,
    ) -> ConsumerConfig {
        ConsumerConfig::default()
            .exchange(self.exchange)
            .queue(self.queue)
            .binding_key(self.routing_key)
            .consumer_tag(self.consumer_tag)
            .worker_pool_size(worker_pool_size)
            .prefetch_count(prefetch_count)
            .dead_letter_exchange(dead_letter_exchange)
    }
}
