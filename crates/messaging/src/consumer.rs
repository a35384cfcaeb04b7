//! Consuming side of the fabric.

use std::sync::Arc;

use futures_util::StreamExt;
use lapin::{
    Channel, Connection, ExchangeKind,
    options::{
        BasicConsumeOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    types::{AMQPValue, FieldTable},
};
use tracing::info;

use crate::{Delivery, DeliveryHandler, MessagingError, Result, WorkerPool};

const DEAD_LETTER_EXCHANGE_ARG: &str = "x-dead-letter-exchange";

/// Queue, binding and concurrency settings for one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    pub exchange: String,
    pub queue: String,
    pub binding_key: String,
    pub consumer_tag: String,
    pub worker_pool_size: usize,
    /// Per-consumer prefetch; never global.
    pub prefetch_count: u16,
    /// When set, rejected deliveries are dead-lettered here instead of dropped.
    pub dead_letter_exchange: Option<String>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            exchange: "orders-exchange".to_string(),
            queue: "orders-queue".to_string(),
            binding_key: "orders-routing-key".to_string(),
            consumer_tag: "orders-consumer".to_string(),
            worker_pool_size: 24,
            prefetch_count: 5,
            dead_letter_exchange: None,
        }
    }
}

impl ConsumerConfig {
    pub fn exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn binding_key(mut self, binding_key: impl Into<String>) -> Self {
        self.binding_key = binding_key.into();
        self
    }

    pub fn consumer_tag(mut self, consumer_tag: impl Into<String>) -> Self {
        self.consumer_tag = consumer_tag.into();
        self
    }

    pub fn worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = size;
        self
    }

    pub fn prefetch_count(mut self, prefetch: u16) -> Self {
        self.prefetch_count = prefetch;
        self
    }

    pub fn dead_letter_exchange(mut self, exchange: Option<String>) -> Self {
        self.dead_letter_exchange = exchange;
        self
    }

    /// Arguments for the queue declaration.
    pub fn queue_arguments(&self) -> FieldTable {
        let mut args = FieldTable::default();
        if let Some(dlx) = &self.dead_letter_exchange {
            args.insert(
                DEAD_LETTER_EXCHANGE_ARG.into(),
                AMQPValue::LongString(dlx.as_str().into()),
            );
        }
        args
    }
}

/// Consumes one queue with a bounded worker pool.
pub struct AmqpConsumer {
    connection: Arc<Connection>,
    config: ConsumerConfig,
}

impl AmqpConsumer {
    pub fn new(connection: Arc<Connection>, config: ConsumerConfig) -> Self {
        Self { connection, config }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Declares the direct exchange and the durable queue, then binds them.
    async fn declare_topology(&self, channel: &Channel) -> Result<()> {
        let config = &self.config;

        channel
            .exchange_declare(
                &config.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let queue = channel
            .queue_declare(
                &config.queue,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    ..Default::default()
                },
                config.queue_arguments(),
            )
            .await?;

        info!(
            queue = %config.queue,
            messages = queue.message_count(),
            consumers = queue.consumer_count(),
            exchange = %config.exchange,
            binding_key = %config.binding_key,
            "Declared queue, binding it to exchange"
        );

        channel
            .queue_bind(
                &config.queue,
                &config.exchange,
                &config.binding_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    /// Declares topology, applies QoS and processes deliveries until the
    /// channel closes.
    ///
    /// Only returns with an error: [`MessagingError::ChannelClosed`] once the
    /// stream ends, or the AMQP error that prevented setup.
    pub async fn start<H: DeliveryHandler>(&self, handler: Arc<H>) -> Result<()> {
        let config = &self.config;
        let channel = self.connection.create_channel().await?;

        self.declare_topology(&channel).await?;

        channel
            .basic_qos(config.prefetch_count, BasicQosOptions { global: false })
            .await?;

        let consumer = channel
            .basic_consume(
                &config.queue,
                &config.consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    exclusive: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        info!(
            queue = %config.queue,
            consumer_tag = %config.consumer_tag,
            workers = config.worker_pool_size,
            prefetch = config.prefetch_count,
            "Starting consumer"
        );

        let deliveries = consumer.map(|delivery| {
            delivery
                .map(Delivery::from)
                .map_err(MessagingError::from)
        });

        WorkerPool::new(config.worker_pool_size)
            .run(deliveries, handler)
            .await
    }
}
