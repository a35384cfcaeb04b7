//! Publishing side of the fabric.

use std::sync::Arc;

use async_trait::async_trait;
use common::DomainEvent;
use lapin::{BasicProperties, Connection, options::BasicPublishOptions};
use tracing::{debug, warn};

use crate::{EVENT_CONTENT_TYPE, Envelope, MessagingError, Result};

const DEFAULT_EXCHANGE: &str = "orders-exchange";
const DEFAULT_ROUTING_KEY: &str = "orders-routing-key";
const DEFAULT_MESSAGE_TYPE: &str = "ordered";

/// Where a publisher sends its messages and how it tags them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    pub exchange: String,
    pub routing_key: String,
    pub message_type: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            message_type: DEFAULT_MESSAGE_TYPE.to_string(),
        }
    }
}

impl PublisherConfig {
    pub fn exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    pub fn message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = message_type.into();
        self
    }

    /// Wraps a body into an envelope addressed by this configuration.
    pub fn envelope(&self, body: Vec<u8>, content_type: &str) -> Result<Envelope> {
        Envelope::builder()
            .exchange(&self.exchange)
            .routing_key(&self.routing_key)
            .message_type(&self.message_type)
            .content_type(content_type)
            .body(body)
            .build()
    }
}

/// Sends messages to one exchange with one routing key and one type tag.
#[async_trait]
pub trait Publisher: Send + Sync {
    fn config(&self) -> &PublisherConfig;

    /// Publishes one message. Does not wait for a broker confirmation.
    async fn publish(&self, body: Vec<u8>, content_type: &str) -> Result<()>;

    /// Encodes and publishes an event.
    ///
    /// The event must carry the type tag this publisher is configured with.
    async fn publish_event(&self, event: &DomainEvent) -> Result<()> {
        let expected = &self.config().message_type;
        if event.message_type() != expected.as_str() {
            return Err(MessagingError::Publish(format!(
                "publisher for '{expected}' cannot send '{}'",
                event.message_type()
            )));
        }

        let body = event.encode()?;
        self.publish(body, EVENT_CONTENT_TYPE).await
    }
}

/// RabbitMQ publisher sharing the process-wide connection.
#[derive(Clone)]
pub struct AmqpPublisher {
    connection: Arc<Connection>,
    config: PublisherConfig,
}

impl AmqpPublisher {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self {
            connection,
            config: PublisherConfig::default(),
        }
    }

    /// Replaces the destination. Meant to be called once, before first use.
    pub fn configure(mut self, config: PublisherConfig) -> Self {
        self.config = config;
        self
    }
}

fn properties(envelope: &Envelope) -> BasicProperties {
    BasicProperties::default()
        .with_content_type(envelope.content_type.clone().into())
        .with_delivery_mode(2) // persistent
        .with_message_id(envelope.message_id.to_string().into())
        .with_timestamp(envelope.timestamp.timestamp().max(0) as u64)
        .with_type(envelope.message_type.clone().into())
}

#[async_trait]
impl Publisher for AmqpPublisher {
    fn config(&self) -> &PublisherConfig {
        &self.config
    }

    #[tracing::instrument(name = "bus.publish", skip_all, fields(exchange = %self.config.exchange, message_type = %self.config.message_type))]
    async fn publish(&self, body: Vec<u8>, content_type: &str) -> Result<()> {
        let envelope = self.config.envelope(body, content_type)?;

        // One channel per publish; channels are not shared across tasks.
        let channel = self.connection.create_channel().await?;

        let published = channel
            .basic_publish(
                &envelope.exchange,
                &envelope.routing_key,
                BasicPublishOptions::default(),
                &envelope.body,
                properties(&envelope),
            )
            .await;

        if let Err(e) = channel.close(200, "publish done").await {
            warn!(error = %e, "Failed to close publish channel");
        }

        published.map_err(|e| MessagingError::Publish(e.to_string()))?;

        debug!(
            message_id = %envelope.message_id,
            routing_key = %envelope.routing_key,
            "Published message"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PublisherConfig::default();
        assert_eq!(config.exchange, "orders-exchange");
        assert_eq!(config.routing_key, "orders-routing-key");
        assert_eq!(config.message_type, "ordered");
    }

    #[test]
    fn test_config_overrides() {
        let config = PublisherConfig::default()
            .exchange("kitchen-order-exchange")
            .routing_key("kitchen-order-routing-key")
            .message_type("kitchen-order-created");

        let envelope = config.envelope(b"{}".to_vec(), "text/plain").unwrap();
        assert_eq!(envelope.exchange, "kitchen-order-exchange");
        assert_eq!(envelope.routing_key, "kitchen-order-routing-key");
        assert_eq!(envelope.message_type, "kitchen-order-created");
    }

    #[test]
    fn test_properties_are_persistent_and_typed() {
        let envelope = PublisherConfig::default()
            .message_type("barista-order-updated")
            .envelope(b"{}".to_vec(), "text/plain")
            .unwrap();

        let props = properties(&envelope);
        assert_eq!(*props.delivery_mode(), Some(2));
        assert_eq!(
            props.kind().as_ref().map(|k| k.as_str()),
            Some("barista-order-updated")
        );
        assert_eq!(
            props.message_id().as_ref().map(|id| id.as_str().to_string()),
            Some(envelope.message_id.to_string())
        );
        assert_eq!(
            props.content_type().as_ref().map(|c| c.as_str()),
            Some("text/plain")
        );
        assert!(props.timestamp().is_some());
    }
}
