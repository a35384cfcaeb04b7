//! Messaging fabric for the fulfillment choreography.
//!
//! - [`connection`]: broker connection with bounded retry
//! - [`publisher`]: one message per call, persistent, fire-and-forget
//! - [`consumer`]: durable topology, QoS and a bounded [`worker::WorkerPool`]
//! - [`memory`]: broker-less doubles used by tests and local wiring

pub mod connection;
pub mod consumer;
pub mod delivery;
pub mod envelope;
pub mod error;
pub mod memory;
pub mod publisher;
pub mod worker;

pub use connection::{RetryPolicy, connect, retry_connect};
pub use consumer::{AmqpConsumer, ConsumerConfig};
pub use delivery::{AckOutcome, Acknowledge, Delivery};
pub use envelope::{Envelope, EnvelopeBuilder};
pub use error::{MessagingError, Result};
pub use memory::{AckProbe, InMemoryPublisher};
pub use publisher::{AmqpPublisher, Publisher, PublisherConfig};
pub use worker::{DeliveryHandler, WorkerPool};

/// Content type used for JSON event bodies.
pub const EVENT_CONTENT_TYPE: &str = "text/plain";
